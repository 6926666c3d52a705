//! # Chunk Matrix
//!
//! A 3x3 window of chunk handles centred on one chunk. Lighting and meshing
//! read through it so that queries a few voxels past the centre chunk's border
//! land in the right neighbour.
//!
//! Queries use centre-chunk-local coordinates: `x` and `z` in
//! `-CHUNK_DIMENSION..2 * CHUNK_DIMENSION` address the window, anything else is
//! outside it. Outside the window, or in a slot with no chunk, a block reads as
//! air and a light level as 0. Above or below the world a block reads as air
//! and a light level as `MAX_LIGHT_LEVEL`.

use std::sync::RwLockReadGuard;

use super::{Chunk, CHUNK_DIMENSION, CHUNK_HEIGHT, MAX_LIGHT_LEVEL};
use crate::core::MtResource;
use crate::engine_state::voxels::block::{BlockTypeSize, AIR_ID};

/// Converts a window offset in `{-1, 0, 1}²` to a slot index.
fn slot_index(dx: i32, dz: i32) -> Option<usize> {
    if !(-1..=1).contains(&dx) || !(-1..=1).contains(&dz) {
        return None;
    }
    Some(((dx + 1) + (dz + 1) * 3) as usize)
}

/// A 3x3 grid of optional chunk handles. Offset (0, 0) is the centre.
///
/// Two matrices are equal when every slot refers to the same chunk
/// allocation (or both are empty); chunk contents are not compared.
#[derive(Clone, Default, Debug)]
pub struct ChunkMatrix {
    chunks: [Option<MtResource<Chunk>>; 9],
}

impl ChunkMatrix {
    /// Creates a matrix holding only `center`.
    pub fn new(center: MtResource<Chunk>) -> Self {
        let mut matrix = ChunkMatrix::default();
        matrix.set(0, 0, Some(center));
        matrix
    }

    /// Stores a chunk handle at a window offset.
    ///
    /// # Arguments
    /// * `dx`, `dz` - Offset in `{-1, 0, 1}`
    /// * `chunk` - The handle, or `None` to clear the slot
    ///
    /// # Returns
    /// `false` if the offset is outside the window.
    pub fn set(&mut self, dx: i32, dz: i32, chunk: Option<MtResource<Chunk>>) -> bool {
        match slot_index(dx, dz) {
            Some(index) => {
                self.chunks[index] = chunk;
                true
            }
            None => false,
        }
    }

    /// Returns the handle at a window offset.
    pub fn get(&self, dx: i32, dz: i32) -> Option<&MtResource<Chunk>> {
        slot_index(dx, dz).and_then(|index| self.chunks[index].as_ref())
    }

    /// Returns the centre chunk handle.
    pub fn center(&self) -> Option<&MtResource<Chunk>> {
        self.get(0, 0)
    }

    /// Deep-copies every present chunk into fresh, unshared handles.
    ///
    /// Background jobs work on the result so that edits made on the control
    /// thread never race with them.
    pub fn snapshot(&self) -> ChunkMatrix {
        let mut copy = ChunkMatrix::default();
        for (slot, chunk) in copy.chunks.iter_mut().zip(&self.chunks) {
            *slot = chunk.as_ref().map(|chunk| MtResource::new(chunk.get().snapshot()));
        }
        copy
    }

    /// Locks every present chunk for reading.
    pub fn read(&self) -> MatrixView<'_> {
        MatrixView {
            guards: std::array::from_fn(|index| self.chunks[index].as_ref().map(MtResource::get)),
        }
    }
}

impl PartialEq for ChunkMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.chunks
            .iter()
            .zip(&other.chunks)
            .all(|(a, b)| match (a, b) {
                (Some(a), Some(b)) => MtResource::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            })
    }
}

/// Read access to every chunk of a [`ChunkMatrix`] at once.
pub struct MatrixView<'a> {
    guards: [Option<RwLockReadGuard<'a, Chunk>>; 9],
}

impl MatrixView<'_> {
    /// Returns the chunk at a window offset.
    pub fn chunk(&self, dx: i32, dz: i32) -> Option<&Chunk> {
        slot_index(dx, dz).and_then(|index| self.guards[index].as_deref())
    }

    /// Returns the centre chunk.
    pub fn center(&self) -> Option<&Chunk> {
        self.chunk(0, 0)
    }

    /// Returns the window offset of the chunk containing a centre-relative block column.
    pub fn chunk_offset_from_block(x: i32, z: i32) -> (i32, i32) {
        (x.div_euclid(CHUNK_DIMENSION), z.div_euclid(CHUNK_DIMENSION))
    }

    /// Returns the chunk containing a centre-relative block column, if it is in the window.
    pub fn chunk_from_block(&self, x: i32, z: i32) -> Option<&Chunk> {
        let (dx, dz) = Self::chunk_offset_from_block(x, z);
        self.chunk(dx, dz)
    }

    /// Reads a block id at centre-relative coordinates.
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> BlockTypeSize {
        if !(0..CHUNK_HEIGHT).contains(&y) {
            return AIR_ID;
        }
        self.chunk_from_block(x, z).map_or(AIR_ID, |chunk| {
            chunk.get_block(
                x.rem_euclid(CHUNK_DIMENSION),
                y,
                z.rem_euclid(CHUNK_DIMENSION),
            )
        })
    }

    /// Reads a light level at centre-relative coordinates.
    pub fn get_light_level(&self, x: i32, y: i32, z: i32) -> u8 {
        if !(0..CHUNK_HEIGHT).contains(&y) {
            return MAX_LIGHT_LEVEL;
        }
        self.chunk_from_block(x, z).map_or(0, |chunk| {
            chunk.get_light_level(
                x.rem_euclid(CHUNK_DIMENSION),
                y,
                z.rem_euclid(CHUNK_DIMENSION),
            )
        })
    }
}
