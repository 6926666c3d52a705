//! # Chunk Module
//!
//! This module provides the `Chunk` struct: a 16x128x16 column of voxels that
//! is the unit of storage, generation, lighting and meshing.
//!
//! ## Memory Layout
//!
//! Every chunk owns three dense byte arrays:
//! - `blocks`: one block id per voxel (`0` is air)
//! - `data`: one auxiliary byte per voxel, re-derived from the block kind on every write
//! - `lighting`: one light level per voxel of the chunk *plus* a one voxel halo on
//!   every side, so the mesh builder can read the light just outside a border face
//!   without touching the neighbouring chunk
//!
//! Voxel arrays are indexed `x + y * CHUNK_PLANE_SIZE + z * CHUNK_DIMENSION`; the
//! lighting array uses the same order on the wrapped dimensions with every
//! coordinate shifted by one.

use cgmath::Point2;

use super::block::{BlockRegistry, BlockTypeSize, AIR_ID};
use crate::core::SlotKey;

pub mod chunk_matrix;

/// The horizontal dimension (width and depth) of a chunk in blocks.
pub const CHUNK_DIMENSION: i32 = 16;
/// The vertical dimension of a chunk in blocks.
pub const CHUNK_HEIGHT: i32 = 128;
/// The number of blocks in a single horizontal plane of a chunk.
pub const CHUNK_PLANE_SIZE: usize = (CHUNK_DIMENSION * CHUNK_DIMENSION) as usize;
/// The total number of blocks in a chunk.
pub const CHUNK_SIZE: usize = CHUNK_PLANE_SIZE * CHUNK_HEIGHT as usize;
/// The horizontal dimension of the lighting buffer including the halo.
pub const CHUNK_DIMENSION_WRAPPED: usize = (CHUNK_DIMENSION + 2) as usize;
/// The vertical dimension of the lighting buffer including the halo.
pub const CHUNK_HEIGHT_WRAPPED: usize = (CHUNK_HEIGHT + 2) as usize;
/// The number of entries in a wrapped horizontal lighting plane.
pub const CHUNK_PLANE_SIZE_WRAPPED: usize = CHUNK_DIMENSION_WRAPPED * CHUNK_DIMENSION_WRAPPED;
/// The total number of entries in the lighting buffer.
pub const CHUNK_SIZE_WRAPPED: usize = CHUNK_PLANE_SIZE_WRAPPED * CHUNK_HEIGHT_WRAPPED;

/// The brightest light level. Light sources emit it and open sky carries it.
pub const MAX_LIGHT_LEVEL: u8 = 16;

/// Represents one 16x128x16 column of voxels.
///
/// A chunk is created empty (all air, fully lit), filled once by the
/// generator and then edited in place. Background jobs never see a live chunk;
/// they work on a [`Chunk::snapshot`].
pub struct Chunk {
    /// The position of this chunk in chunk coordinates, `x` and `z`.
    pub position: Point2<i32>,

    blocks: Box<[BlockTypeSize]>,
    data: Box<[u8]>,
    lighting: Box<[u8]>,

    /// The streaming slot currently showing this chunk, if any.
    ///
    /// This is a lookup key, not an owner: it is only used to tell the streamer
    /// that the chunk became dirty.
    pub watcher: Option<SlotKey>,
}

impl Chunk {
    /// Creates a new chunk filled with air and lit at the maximum level.
    ///
    /// # Arguments
    /// * `chunk_x` - X chunk coordinate
    /// * `chunk_z` - Z chunk coordinate
    ///
    /// # Returns
    /// A new, empty `Chunk`.
    pub fn new(chunk_x: i32, chunk_z: i32) -> Self {
        Chunk {
            position: Point2::new(chunk_x, chunk_z),
            blocks: vec![AIR_ID; CHUNK_SIZE].into_boxed_slice(),
            data: vec![0; CHUNK_SIZE].into_boxed_slice(),
            lighting: vec![MAX_LIGHT_LEVEL; CHUNK_SIZE_WRAPPED].into_boxed_slice(),
            watcher: None,
        }
    }

    /// Returns a deep copy of the chunk without its watcher.
    pub fn snapshot(&self) -> Self {
        Chunk {
            position: self.position,
            blocks: self.blocks.clone(),
            data: self.data.clone(),
            lighting: self.lighting.clone(),
            watcher: None,
        }
    }

    /// X chunk coordinate.
    pub fn chunk_x(&self) -> i32 {
        self.position.x
    }

    /// Z chunk coordinate.
    pub fn chunk_z(&self) -> i32 {
        self.position.y
    }

    /// Converts in-chunk coordinates to a voxel array index.
    ///
    /// # Returns
    /// `None` if the coordinates are outside the chunk.
    fn index(x: i32, y: i32, z: i32) -> Option<usize> {
        if !(0..CHUNK_DIMENSION).contains(&x)
            || !(0..CHUNK_HEIGHT).contains(&y)
            || !(0..CHUNK_DIMENSION).contains(&z)
        {
            return None;
        }
        Some(x as usize + y as usize * CHUNK_PLANE_SIZE + z as usize * CHUNK_DIMENSION as usize)
    }

    /// Converts halo-inclusive coordinates to a lighting array index.
    fn light_index(x: i32, y: i32, z: i32) -> Option<usize> {
        if !(-1..=CHUNK_DIMENSION).contains(&x)
            || !(-1..=CHUNK_HEIGHT).contains(&y)
            || !(-1..=CHUNK_DIMENSION).contains(&z)
        {
            return None;
        }
        Some(
            (x + 1) as usize
                + (y + 1) as usize * CHUNK_PLANE_SIZE_WRAPPED
                + (z + 1) as usize * CHUNK_DIMENSION_WRAPPED,
        )
    }

    /// Gets the block id at the specified chunk-relative coordinates.
    ///
    /// # Arguments
    /// * `x` - X coordinate within the chunk (0..CHUNK_DIMENSION)
    /// * `y` - Y coordinate within the chunk (0..CHUNK_HEIGHT)
    /// * `z` - Z coordinate within the chunk (0..CHUNK_DIMENSION)
    ///
    /// # Returns
    /// The stored id, or air for coordinates outside the chunk.
    pub fn get_block(&self, x: i32, y: i32, z: i32) -> BlockTypeSize {
        Self::index(x, y, z).map_or(AIR_ID, |index| self.blocks[index])
    }

    /// Writes a block and resets its auxiliary byte to the kind's default.
    ///
    /// # Arguments
    /// * `x`, `y`, `z` - Chunk-relative coordinates
    /// * `id` - The block id to store, `AIR_ID` to clear
    /// * `registry` - Catalog providing the default data of `id`
    ///
    /// # Returns
    /// `false` if the coordinates are outside the chunk and nothing was written.
    pub fn set_block(
        &mut self,
        x: i32,
        y: i32,
        z: i32,
        id: BlockTypeSize,
        registry: &BlockRegistry,
    ) -> bool {
        match Self::index(x, y, z) {
            Some(index) => {
                self.blocks[index] = id;
                self.data[index] = registry.default_data(id);
                true
            }
            None => false,
        }
    }

    /// Gets the auxiliary byte at the specified coordinates, 0 outside the chunk.
    pub fn get_data(&self, x: i32, y: i32, z: i32) -> u8 {
        Self::index(x, y, z).map_or(0, |index| self.data[index])
    }

    /// Overwrites the auxiliary byte at the specified coordinates.
    pub fn set_data(&mut self, x: i32, y: i32, z: i32, data: u8) -> bool {
        match Self::index(x, y, z) {
            Some(index) => {
                self.data[index] = data;
                true
            }
            None => false,
        }
    }

    /// Reads the light level at halo-inclusive coordinates.
    ///
    /// Coordinates in `-1..=CHUNK_DIMENSION` horizontally and `-1..=CHUNK_HEIGHT`
    /// vertically are stored. Beyond that, positions above or below the column
    /// read as fully lit and positions beside it read as dark.
    pub fn get_light_level(&self, x: i32, y: i32, z: i32) -> u8 {
        match Self::light_index(x, y, z) {
            Some(index) => self.lighting[index],
            None if !(-1..=CHUNK_HEIGHT).contains(&y) => MAX_LIGHT_LEVEL,
            None => 0,
        }
    }

    /// Writes a light level at halo-inclusive coordinates, clamped to `MAX_LIGHT_LEVEL`.
    ///
    /// # Returns
    /// `false` if the coordinates are outside the padded buffer.
    pub fn set_light_level(&mut self, x: i32, y: i32, z: i32, level: u8) -> bool {
        match Self::light_index(x, y, z) {
            Some(index) => {
                self.lighting[index] = level.min(MAX_LIGHT_LEVEL);
                true
            }
            None => false,
        }
    }

    /// Returns the light level as a shading factor, `(level / MAX_LIGHT_LEVEL)²`.
    pub fn light_level_for_rendering(&self, x: i32, y: i32, z: i32) -> f32 {
        let normalized = self.get_light_level(x, y, z) as f32 / MAX_LIGHT_LEVEL as f32;
        normalized * normalized
    }

    /// Replaces this chunk's lighting buffer with another chunk's.
    pub fn copy_lighting_from(&mut self, other: &Chunk) {
        self.lighting.copy_from_slice(&other.lighting);
    }

    /// Raw block ids in voxel index order.
    pub fn blocks(&self) -> &[BlockTypeSize] {
        &self.blocks
    }

    /// Raw auxiliary bytes in voxel index order.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Raw lighting buffer including the halo.
    pub fn lighting(&self) -> &[u8] {
        &self.lighting
    }
}

impl std::fmt::Debug for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chunk")
            .field("position", &self.position)
            .field("watcher", &self.watcher)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::rendering::atlas::Atlas;
    use crate::engine_state::voxels::block::block_type::BlockType;

    #[test]
    fn fresh_chunk_is_air_and_fully_lit() {
        let chunk = Chunk::new(3, -2);
        assert_eq!(chunk.chunk_x(), 3);
        assert_eq!(chunk.chunk_z(), -2);
        assert!(chunk.blocks().iter().all(|id| *id == AIR_ID));
        assert!(chunk.lighting().iter().all(|level| *level == MAX_LIGHT_LEVEL));
        assert_eq!(chunk.light_level_for_rendering(0, 0, 0), 1.0);
    }

    #[test]
    fn out_of_range_queries_return_sentinels() {
        let registry = BlockRegistry::standard(&Atlas::standard()).unwrap();
        let mut chunk = Chunk::new(0, 0);
        assert!(chunk.set_block(0, 0, 0, BlockType::STONE.id(), &registry));
        assert!(!chunk.set_block(0, CHUNK_HEIGHT, 0, BlockType::STONE.id(), &registry));

        assert_eq!(chunk.get_block(0, -1, 0), AIR_ID);
        assert_eq!(chunk.get_block(0, CHUNK_HEIGHT, 0), AIR_ID);
        assert_eq!(chunk.get_light_level(0, CHUNK_HEIGHT + 5, 0), MAX_LIGHT_LEVEL);
        assert_eq!(chunk.get_light_level(CHUNK_DIMENSION + 1, 5, 0), 0);
    }

    #[test]
    fn halo_light_is_addressable_and_clamped() {
        let mut chunk = Chunk::new(0, 0);
        assert!(chunk.set_light_level(-1, -1, -1, 3));
        assert!(chunk.set_light_level(CHUNK_DIMENSION, CHUNK_HEIGHT, CHUNK_DIMENSION, 200));
        assert!(!chunk.set_light_level(-2, 0, 0, 1));

        assert_eq!(chunk.get_light_level(-1, -1, -1), 3);
        assert_eq!(
            chunk.get_light_level(CHUNK_DIMENSION, CHUNK_HEIGHT, CHUNK_DIMENSION),
            MAX_LIGHT_LEVEL
        );
        assert_eq!(chunk.lighting()[0], 3);
    }

    #[test]
    fn set_block_rederives_data() {
        let registry = BlockRegistry::standard(&Atlas::standard()).unwrap();
        let mut chunk = Chunk::new(0, 0);
        chunk.set_block(4, 10, 7, BlockType::WOOD.id(), &registry);
        chunk.set_data(4, 10, 7, 9);
        assert_eq!(chunk.get_data(4, 10, 7), 9);

        chunk.set_block(4, 10, 7, AIR_ID, &registry);
        assert_eq!(chunk.get_block(4, 10, 7), AIR_ID);
        assert_eq!(chunk.get_data(4, 10, 7), 0);
    }

    #[test]
    fn snapshot_is_deep_and_unwatched() {
        let registry = BlockRegistry::standard(&Atlas::standard()).unwrap();
        let mut chunk = Chunk::new(1, 1);
        chunk.watcher = Some(SlotKey::new(Point2::new(1, 1), 7));

        let copy = chunk.snapshot();
        chunk.set_block(0, 0, 0, BlockType::DIRT.id(), &registry);

        assert!(copy.watcher.is_none());
        assert_eq!(copy.get_block(0, 0, 0), AIR_ID);
        assert_eq!(copy.position, chunk.position);
    }
}
