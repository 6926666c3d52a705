//! # Lighting Solver
//!
//! Flood-fill light propagation over the 3x3 chunk window around a chunk.
//!
//! The solver copies the whole window into a working volume of
//! `3 * CHUNK_DIMENSION` x `CHUNK_HEIGHT` x `3 * CHUNK_DIMENSION` voxels and seeds
//! it: open sky down to the first solid voxel is fully lit, columns of chunks
//! that are not loaded yet are lit as open sky from top to bottom, and every
//! other voxel starts at its block's light emission.
//!
//! Propagation is a fixed number of relaxation sweeps (`MAX_LIGHT_LEVEL`), each
//! reading one buffer and writing the other. A non-solid voxel takes the
//! brightest of its own level and each of its six neighbours minus one. Layers
//! with nothing left to update are skipped on later sweeps.
//!
//! Only the centre chunk's lighting (including its one voxel halo) is written
//! back; neighbours are read but never modified.

use bitvec::prelude::BitVec;

use super::block::BlockRegistry;
use super::chunk::chunk_matrix::{ChunkMatrix, MatrixView};
use super::chunk::{Chunk, CHUNK_DIMENSION, CHUNK_HEIGHT, MAX_LIGHT_LEVEL};

/// Horizontal dimension of the working volume.
pub const WORK_DIMENSION: i32 = CHUNK_DIMENSION * 3;
const WORK_PLANE_SIZE: usize = (WORK_DIMENSION * WORK_DIMENSION) as usize;
const WORK_SIZE: usize = WORK_PLANE_SIZE * CHUNK_HEIGHT as usize;

/// Converts centre-relative coordinates to a working volume index.
///
/// `x` and `z` must lie in `-CHUNK_DIMENSION..2 * CHUNK_DIMENSION` and `y` in
/// `0..CHUNK_HEIGHT`.
fn work_index(x: i32, y: i32, z: i32) -> usize {
    let x = (x + CHUNK_DIMENSION) as usize;
    let z = (z + CHUNK_DIMENSION) as usize;
    x + y as usize * WORK_PLANE_SIZE + z * WORK_DIMENSION as usize
}

/// Reads a working volume buffer with the solver's boundary conditions.
///
/// Above and below the volume is open sky; beyond its sides is darkness.
fn light_at(buffer: &[u8], x: i32, y: i32, z: i32) -> u8 {
    if !(0..CHUNK_HEIGHT).contains(&y) {
        return MAX_LIGHT_LEVEL;
    }
    let range = -CHUNK_DIMENSION..2 * CHUNK_DIMENSION;
    if !range.contains(&x) || !range.contains(&z) {
        return 0;
    }
    buffer[work_index(x, y, z)]
}

/// Two working volumes; one is read while the other is written.
pub struct LightBuffers {
    buffers: [Vec<u8>; 2],
    read: usize,
}

impl LightBuffers {
    fn new() -> Self {
        LightBuffers {
            buffers: [vec![0; WORK_SIZE], vec![0; WORK_SIZE]],
            read: 0,
        }
    }

    /// The buffer holding the latest complete sweep.
    pub fn read(&self) -> &[u8] {
        &self.buffers[self.read]
    }

    fn write(&mut self) -> &mut [u8] {
        &mut self.buffers[1 - self.read]
    }

    /// Borrows the read buffer and the write buffer at the same time.
    fn split(&mut self) -> (&[u8], &mut [u8]) {
        let [first, second] = &mut self.buffers;
        if self.read == 0 {
            (first.as_slice(), second.as_mut_slice())
        } else {
            (second.as_slice(), first.as_mut_slice())
        }
    }

    /// Swaps the roles of the two buffers.
    fn flip(&mut self) {
        self.read = 1 - self.read;
    }
}

/// Lighting state for one 3x3 window.
pub struct LightingSolver {
    buffers: LightBuffers,
    solid: BitVec,
    no_work_done: [bool; CHUNK_HEIGHT as usize],
}

impl LightingSolver {
    /// Builds the working volume and solidity mask from a locked window.
    ///
    /// # Arguments
    /// * `view` - Read access to the 3x3 window
    /// * `registry` - Catalog used for transparency and emission
    ///
    /// # Returns
    /// A solver ready for [`LightingSolver::solve`]
    pub fn prepare(view: &MatrixView<'_>, registry: &BlockRegistry) -> Self {
        let mut buffers = LightBuffers::new();
        let mut solid = BitVec::repeat(false, WORK_SIZE);

        let write = buffers.write();
        for z in -CHUNK_DIMENSION..2 * CHUNK_DIMENSION {
            for x in -CHUNK_DIMENSION..2 * CHUNK_DIMENSION {
                let known = view.chunk_from_block(x, z).is_some();
                let mut found_ground = false;

                for y in (0..CHUNK_HEIGHT).rev() {
                    let index = work_index(x, y, z);
                    let id = view.get_block(x, y, z);
                    let is_solid = registry.is_opaque(id);
                    solid.set(index, is_solid);
                    if is_solid {
                        found_ground = true;
                    }

                    write[index] = if !known || !found_ground {
                        MAX_LIGHT_LEVEL
                    } else {
                        registry.light_emission(id)
                    };
                }
            }
        }

        buffers.flip();

        LightingSolver {
            buffers,
            solid,
            no_work_done: [false; CHUNK_HEIGHT as usize],
        }
    }

    /// Runs every relaxation sweep.
    pub fn solve(&mut self) {
        for _ in 0..MAX_LIGHT_LEVEL {
            self.sweep();
            self.buffers.flip();
        }
    }

    fn sweep(&mut self) {
        let (read, write) = self.buffers.split();
        write.copy_from_slice(read);

        for y in 0..CHUNK_HEIGHT {
            if self.no_work_done[y as usize] {
                continue;
            }

            let mut no_work_done = true;
            for z in -CHUNK_DIMENSION..2 * CHUNK_DIMENSION {
                for x in -CHUNK_DIMENSION..2 * CHUNK_DIMENSION {
                    let index = work_index(x, y, z);
                    let current = read[index];
                    if current >= MAX_LIGHT_LEVEL - 1 || self.solid[index] {
                        continue;
                    }
                    no_work_done = false;

                    let brightest_neighbour = [
                        light_at(read, x - 1, y, z),
                        light_at(read, x + 1, y, z),
                        light_at(read, x, y - 1, z),
                        light_at(read, x, y + 1, z),
                        light_at(read, x, y, z - 1),
                        light_at(read, x, y, z + 1),
                    ]
                    .into_iter()
                    .max()
                    .unwrap_or(0);

                    write[index] = current.max(brightest_neighbour.saturating_sub(1));
                }
            }
            self.no_work_done[y as usize] = no_work_done;
        }
    }

    /// Reads the solved light level at centre-relative coordinates.
    pub fn light_level(&self, x: i32, y: i32, z: i32) -> u8 {
        light_at(self.buffers.read(), x, y, z)
    }

    /// Copies the solved levels of the centre chunk and its halo into `chunk`.
    pub fn output(&self, chunk: &mut Chunk) {
        for y in -1..=CHUNK_HEIGHT {
            for z in -1..=CHUNK_DIMENSION {
                for x in -1..=CHUNK_DIMENSION {
                    chunk.set_light_level(x, y, z, self.light_level(x, y, z));
                }
            }
        }
    }
}

/// Recomputes the lighting of the centre chunk of `matrix`.
///
/// Does nothing if the matrix has no centre chunk.
///
/// # Arguments
/// * `matrix` - The 3x3 window; only the centre chunk is written
/// * `registry` - Catalog used for transparency and emission
pub fn compute_lighting(matrix: &ChunkMatrix, registry: &BlockRegistry) {
    let Some(center) = matrix.center() else {
        return;
    };

    let mut solver = {
        let view = matrix.read();
        LightingSolver::prepare(&view, registry)
    };
    solver.solve();
    solver.output(&mut center.get_mut());
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::MtResource;
    use crate::engine_state::rendering::atlas::Atlas;
    use crate::engine_state::voxels::block::block_type::BlockType;
    use crate::engine_state::voxels::block::AIR_ID;

    fn registry() -> Arc<BlockRegistry> {
        BlockRegistry::standard(&Atlas::standard()).unwrap()
    }

    fn stone_chunk(registry: &BlockRegistry, x: i32, z: i32) -> MtResource<Chunk> {
        let mut chunk = Chunk::new(x, z);
        for y in 0..CHUNK_HEIGHT {
            for lz in 0..CHUNK_DIMENSION {
                for lx in 0..CHUNK_DIMENSION {
                    chunk.set_block(lx, y, lz, BlockType::STONE.id(), registry);
                }
            }
        }
        MtResource::new(chunk)
    }

    fn buried_matrix(registry: &BlockRegistry) -> ChunkMatrix {
        let mut matrix = ChunkMatrix::default();
        for dz in -1..=1 {
            for dx in -1..=1 {
                matrix.set(dx, dz, Some(stone_chunk(registry, dx, dz)));
            }
        }
        matrix
    }

    #[test]
    fn open_sky_is_fully_lit() {
        let registry = registry();
        let matrix = ChunkMatrix::new(MtResource::new(Chunk::new(0, 0)));
        compute_lighting(&matrix, &registry);

        let chunk = matrix.center().unwrap().get();
        assert!(chunk.lighting().iter().all(|level| *level == MAX_LIGHT_LEVEL));
    }

    #[test]
    fn emitter_light_falls_off_by_one_per_step() {
        let registry = registry();
        let matrix = buried_matrix(&registry);
        {
            let mut center = matrix.center().unwrap().get_mut();
            center.set_block(2, 50, 8, BlockType::LANTERN.id(), &registry);
            for x in 3..=12 {
                center.set_block(x, 50, 8, AIR_ID, &registry);
            }
        }

        compute_lighting(&matrix, &registry);

        let chunk = matrix.center().unwrap().get();
        for x in 3..=12 {
            assert_eq!(chunk.get_light_level(x, 50, 8), MAX_LIGHT_LEVEL - (x - 2) as u8);
        }
        // The lantern keeps its own emission and surrounding stone stays dark.
        assert_eq!(chunk.get_light_level(2, 50, 8), MAX_LIGHT_LEVEL);
        assert_eq!(chunk.get_light_level(5, 51, 8), 0);
        assert_eq!(chunk.get_light_level(13, 50, 8), 0);
    }

    #[test]
    fn levels_are_bounded_and_neighbour_relation_holds() {
        let registry = registry();
        let matrix = buried_matrix(&registry);
        {
            let mut center = matrix.center().unwrap().get_mut();
            for x in 4..12 {
                for z in 4..12 {
                    for y in 60..64 {
                        center.set_block(x, y, z, AIR_ID, &registry);
                    }
                }
            }
            center.set_block(7, 61, 7, BlockType::LANTERN.id(), &registry);
        }

        let mut solver = {
            let view = matrix.read();
            LightingSolver::prepare(&view, &registry)
        };
        solver.solve();

        let view = matrix.read();
        for x in 0..CHUNK_DIMENSION {
            for z in 0..CHUNK_DIMENSION {
                for y in 58..66 {
                    let level = solver.light_level(x, y, z);
                    assert!(level <= MAX_LIGHT_LEVEL);
                    let id = view.get_block(x, y, z);
                    if registry.is_opaque(id) {
                        assert_eq!(level, registry.light_emission(id));
                        continue;
                    }
                    for (dx, dy, dz) in [(1, 0, 0), (-1, 0, 0), (0, 1, 0), (0, -1, 0), (0, 0, 1), (0, 0, -1)] {
                        let neighbour = solver.light_level(x + dx, y + dy, z + dz);
                        assert!(level + 1 >= neighbour);
                    }
                }
            }
        }
    }

    #[test]
    fn unloaded_neighbour_columns_count_as_open_sky() {
        let registry = registry();
        let matrix = ChunkMatrix::new(stone_chunk(&registry, 0, 0));
        matrix
            .center()
            .unwrap()
            .get_mut()
            .set_block(0, 50, 5, AIR_ID, &registry);

        compute_lighting(&matrix, &registry);

        let chunk = matrix.center().unwrap().get();
        assert_eq!(chunk.get_light_level(-1, 50, 5), MAX_LIGHT_LEVEL);
        assert_eq!(chunk.get_light_level(0, 50, 5), MAX_LIGHT_LEVEL - 1);
        assert_eq!(chunk.get_light_level(1, 50, 5), 0);
    }

    #[test]
    fn halo_above_and_below_is_lit() {
        let registry = registry();
        let matrix = buried_matrix(&registry);
        compute_lighting(&matrix, &registry);

        let chunk = matrix.center().unwrap().get();
        assert_eq!(chunk.get_light_level(4, -1, 4), MAX_LIGHT_LEVEL);
        assert_eq!(chunk.get_light_level(4, CHUNK_HEIGHT, 4), MAX_LIGHT_LEVEL);
        assert_eq!(chunk.get_light_level(4, 20, 4), 0);
        assert_eq!(chunk.get_light_level(-1, 20, 4), 0);
    }

    #[test]
    fn neighbours_are_not_modified() {
        let registry = registry();
        let matrix = buried_matrix(&registry);
        compute_lighting(&matrix, &registry);

        let neighbour = matrix.get(1, 0).unwrap().get();
        assert!(neighbour.lighting().iter().all(|level| *level == MAX_LIGHT_LEVEL));
    }
}
