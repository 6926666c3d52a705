//! Task for lighting and meshing a chunk in a background thread.
//!
//! This module contains the `ChunkMeshGenerationTask`, which solves the light
//! of a chunk and then builds its geometry. Both steps work on a deep copy of
//! the chunk's 3x3 window so the control thread can keep editing live chunks
//! while the job runs.

use std::sync::Arc;

use cgmath::Point2;
use web_time::Instant;

use crate::engine_state::{
    rendering::meshing::{ChunkGeometry, MeshBuilder},
    task_management::task::Task,
    voxels::{
        block::BlockRegistry,
        chunk::{chunk_matrix::ChunkMatrix, Chunk},
        lighting::compute_lighting,
    },
};

/// A task that lights and meshes the centre chunk of a window.
pub struct ChunkMeshGenerationTask {
    /// Block catalog used for transparency, emission and textures
    registry: Arc<BlockRegistry>,
    /// Private copy of the window; the centre chunk is relit in place
    matrix: ChunkMatrix,
}

impl ChunkMeshGenerationTask {
    /// Creates a new task from a live window.
    ///
    /// # Arguments
    /// * `registry` - The shared block catalog
    /// * `matrix` - The live window; it is deep-copied here
    ///
    /// # Returns
    /// A new `ChunkMeshGenerationTask` instance
    pub fn new(registry: Arc<BlockRegistry>, matrix: &ChunkMatrix) -> Self {
        ChunkMeshGenerationTask {
            registry,
            matrix: matrix.snapshot(),
        }
    }
}

/// The output of a chunk mesh generation task.
#[derive(Debug)]
pub struct ChunkMeshOutput {
    /// Geometry of the centre chunk
    pub geometry: ChunkGeometry,
    /// The relit copy of the centre chunk; only its lighting is meant to be used
    pub lit_chunk: Option<Chunk>,
}

impl Task for ChunkMeshGenerationTask {
    type Output = ChunkMeshOutput;

    /// Solves lighting, then builds geometry against the new light.
    fn process(self) -> ChunkMeshOutput {
        let start = Instant::now();

        compute_lighting(&self.matrix, &self.registry);
        let lit = start.elapsed();

        let geometry = MeshBuilder::new(&self.registry).build(&self.matrix);
        let lit_chunk = self.matrix.center().map(|chunk| chunk.get().snapshot());

        let position = lit_chunk
            .as_ref()
            .map_or(Point2::new(0, 0), |chunk| chunk.position);
        log::debug!(
            "Meshed chunk ({}, {}): {} vertices, lighting {:?}, total {:?}",
            position.x,
            position.y,
            geometry.vertices.len(),
            lit,
            start.elapsed()
        );

        ChunkMeshOutput {
            geometry,
            lit_chunk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MtResource;
    use crate::engine_state::rendering::atlas::Atlas;
    use crate::engine_state::voxels::block::block_type::BlockType;
    use crate::engine_state::voxels::chunk::MAX_LIGHT_LEVEL;

    #[test]
    fn job_works_on_a_copy() {
        let registry = BlockRegistry::standard(&Atlas::standard()).unwrap();
        let mut chunk = Chunk::new(0, 0);
        for x in 0..16 {
            for z in 0..16 {
                chunk.set_block(x, 60, z, BlockType::STONE.id(), &registry);
            }
        }
        let live = MtResource::new(chunk);
        let matrix = ChunkMatrix::new(live.clone());

        let task = ChunkMeshGenerationTask::new(registry.clone(), &matrix);
        live.get_mut().set_block(0, 61, 0, BlockType::STONE.id(), &registry);
        let output = task.process();

        // The edit after submission is not part of the geometry.
        assert_eq!(output.geometry.vertices.len(), 6 * 4 * 256 - 4 * 4 * 15 * 16);
        // The live chunk keeps its lighting until the result is applied.
        assert_eq!(live.get().get_light_level(3, 59, 3), MAX_LIGHT_LEVEL);
        let lit = output.lit_chunk.unwrap();
        // Under the slab, light only leaks in from the unloaded columns around it.
        assert_eq!(lit.get_light_level(3, 59, 3), MAX_LIGHT_LEVEL - 4);
    }
}
