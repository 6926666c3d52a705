//! # Chunk Generation Task
//!
//! This module defines the `ChunkGenerationTask` which generates chunk data
//! on a worker thread. It is scheduled by the world store when the streamer
//! asks for a chunk that is neither resident nor already being generated.

use std::sync::Arc;

use cgmath::Point2;
use web_time::Instant;

use crate::engine_state::{
    task_management::task::Task,
    voxels::{chunk::Chunk, chunk_generator::ChunkGenerator},
};

/// A task that generates one chunk.
///
/// The task creates and owns the chunk it fills, so nothing is shared with the
/// control thread until the finished chunk is handed back.
pub struct ChunkGenerationTask {
    /// The generator for the world the chunk belongs to
    generator: Arc<ChunkGenerator>,
    /// The position of the chunk to generate (in chunk coordinates)
    position: Point2<i32>,
}

impl ChunkGenerationTask {
    /// Creates a new chunk generation task.
    ///
    /// # Arguments
    /// * `generator` - The shared world generator
    /// * `position` - The chunk coordinates of the chunk to generate
    ///
    /// # Returns
    /// A new `ChunkGenerationTask` instance
    pub fn new(generator: Arc<ChunkGenerator>, position: Point2<i32>) -> Self {
        ChunkGenerationTask {
            generator,
            position,
        }
    }
}

impl Task for ChunkGenerationTask {
    type Output = Chunk;

    /// Generates the chunk.
    ///
    /// # Returns
    /// The populated chunk
    fn process(self) -> Chunk {
        let start = Instant::now();
        let mut chunk = Chunk::new(self.position.x, self.position.y);
        self.generator.generate(&mut chunk);
        log::debug!(
            "Generated chunk ({}, {}) in {:?}",
            self.position.x,
            self.position.y,
            start.elapsed()
        );
        chunk
    }
}
