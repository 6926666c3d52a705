//! # World Module
//!
//! This module provides the `World` struct which manages the collection of
//! chunks in the voxel world. It serves as the central coordinator for chunk
//! generation, access and eviction.
//!
//! ## Architecture
//!
//! The world uses sparse storage: only chunks that have been requested are
//! kept in memory, keyed by chunk coordinate. A chunk is either resident,
//! being generated by a background job, or absent. Finished jobs are
//! harvested lazily by the next call that looks at their coordinate.
//!
//! Block coordinates in world space map to chunks by floor division, so
//! negative coordinates land in the chunk to their "left":
//! block `-1` lives in chunk `-1` at local coordinate `15`.

use std::collections::HashMap;
use std::sync::Arc;

use cgmath::Point2;

use super::block::{BlockRegistry, BlockTypeSize, AIR_ID};
use super::chunk::{Chunk, CHUNK_DIMENSION, CHUNK_HEIGHT, MAX_LIGHT_LEVEL};
use super::chunk_generator::ChunkGenerator;
use super::tasks::chunk_generation_task::ChunkGenerationTask;
use crate::core::MtResource;
use crate::engine_state::task_management::{
    task::{JobError, JobHandle},
    TaskManager,
};

/// Splits a world block coordinate into chunk coordinate and local offset.
pub fn world_to_chunk(coordinate: i32) -> (i32, i32) {
    (
        coordinate.div_euclid(CHUNK_DIMENSION),
        coordinate.rem_euclid(CHUNK_DIMENSION),
    )
}

/// Represents a voxel world composed of multiple chunks.
///
/// The world is an unbounded 2-D grid of chunk columns. Chunks are generated
/// on demand, either synchronously (`force`) or through background jobs
/// (`schedule_chunk`), and evicted by `perform_cleanup`.
pub struct World {
    /// Resident chunks keyed by chunk coordinate
    chunks: HashMap<Point2<i32>, MtResource<Chunk>>,
    /// Generation jobs not harvested yet
    jobs: HashMap<Point2<i32>, JobHandle<Chunk>>,
    /// The generator for this world's seed
    generator: Arc<ChunkGenerator>,
    /// Chunks edited while a streaming slot was watching them
    watched_edits: Vec<Point2<i32>>,
}

impl World {
    /// Creates a new, empty world.
    ///
    /// # Arguments
    /// * `generator` - The generator used for every chunk of this world
    pub fn new(generator: Arc<ChunkGenerator>) -> Self {
        World {
            chunks: HashMap::new(),
            jobs: HashMap::new(),
            generator,
            watched_edits: Vec::new(),
        }
    }

    /// The generator of this world.
    pub fn generator(&self) -> &Arc<ChunkGenerator> {
        &self.generator
    }

    /// The block catalog of this world.
    pub fn registry(&self) -> &Arc<BlockRegistry> {
        self.generator.registry()
    }

    /// Number of resident chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether no chunk is resident.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Coordinates of every resident chunk.
    pub fn positions(&self) -> impl Iterator<Item = Point2<i32>> + '_ {
        self.chunks.keys().copied()
    }

    /// Returns the chunk at `position` if it is resident, without touching jobs.
    pub fn resident_chunk(&self, position: Point2<i32>) -> Option<&MtResource<Chunk>> {
        self.chunks.get(&position)
    }

    /// Moves a finished generation job's chunk into the resident set.
    fn harvest(&mut self, position: Point2<i32>) -> Result<Option<MtResource<Chunk>>, JobError> {
        if let Some(chunk) = self.chunks.get(&position) {
            return Ok(Some(chunk.clone()));
        }

        let Some(job) = self.jobs.get_mut(&position) else {
            return Ok(None);
        };
        match job.try_take() {
            None => Ok(None),
            Some(Ok(chunk)) => {
                self.jobs.remove(&position);
                let chunk = MtResource::new(chunk);
                self.chunks.insert(position, chunk.clone());
                Ok(Some(chunk))
            }
            Some(Err(err)) => {
                self.jobs.remove(&position);
                log::error!(
                    "Generation of chunk ({}, {}) failed: {}",
                    position.x,
                    position.y,
                    err
                );
                Err(err)
            }
        }
    }

    /// Gets the chunk at the given chunk coordinates.
    ///
    /// # Arguments
    /// * `chunk_x`, `chunk_z` - Chunk coordinates
    /// * `force` - Generate the chunk synchronously if it is not available
    ///
    /// # Returns
    /// - `Ok(Some(chunk))` if the chunk is resident, was just harvested from a
    ///   finished job, or was generated because of `force`
    /// - `Ok(None)` if the chunk is absent or still generating and `force` is false
    /// - `Err` if the chunk's generation job failed; the job is forgotten
    pub fn get_chunk(
        &mut self,
        chunk_x: i32,
        chunk_z: i32,
        force: bool,
    ) -> Result<Option<MtResource<Chunk>>, JobError> {
        let position = Point2::new(chunk_x, chunk_z);
        if let Some(chunk) = self.harvest(position)? {
            return Ok(Some(chunk));
        }
        if !force {
            return Ok(None);
        }

        // A pending job for this coordinate is superseded; dropping its handle
        // discards its output.
        self.jobs.remove(&position);

        let mut chunk = Chunk::new(chunk_x, chunk_z);
        self.generator.generate(&mut chunk);
        let chunk = MtResource::new(chunk);
        self.chunks.insert(position, chunk.clone());
        Ok(Some(chunk))
    }

    /// Returns the chunk if available, otherwise makes sure it is being generated.
    ///
    /// # Arguments
    /// * `task_manager` - The pool generation jobs are published to
    /// * `chunk_x`, `chunk_z` - Chunk coordinates
    ///
    /// # Returns
    /// The chunk if it is resident or its job just finished, `Ok(None)` while
    /// generation is pending, or the failure of a finished job.
    pub fn schedule_chunk(
        &mut self,
        task_manager: &mut TaskManager,
        chunk_x: i32,
        chunk_z: i32,
    ) -> Result<Option<MtResource<Chunk>>, JobError> {
        let position = Point2::new(chunk_x, chunk_z);
        if let Some(chunk) = self.harvest(position)? {
            return Ok(Some(chunk));
        }

        if !self.jobs.contains_key(&position) {
            let task = ChunkGenerationTask::new(self.generator.clone(), position);
            self.jobs.insert(position, task_manager.publish_task(task));
        }
        Ok(None)
    }

    /// Whether a generation job for the chunk is in flight or not yet harvested.
    pub fn is_generating(&self, chunk_x: i32, chunk_z: i32) -> bool {
        self.jobs.contains_key(&Point2::new(chunk_x, chunk_z))
    }

    /// Evicts every resident chunk except the `max_retained` nearest ones.
    ///
    /// Distance is the squared Euclidean distance in chunk coordinates from
    /// `(center_x, center_z)`. Equal distances are ordered by `x`, then `z`.
    /// Chunks still referenced elsewhere (by a streaming slot or a matrix)
    /// stay alive through those references but are no longer resident.
    pub fn perform_cleanup(&mut self, center_x: i32, center_z: i32, max_retained: usize) {
        if self.chunks.len() <= max_retained {
            return;
        }

        let mut positions: Vec<Point2<i32>> = self.chunks.keys().copied().collect();
        positions.sort_by_key(|position| {
            let dx = (position.x - center_x) as i64;
            let dz = (position.y - center_z) as i64;
            (dx * dx + dz * dz, position.x, position.y)
        });

        let evicted = positions.len() - max_retained;
        for position in &positions[max_retained..] {
            self.chunks.remove(position);
        }
        log::debug!("Evicted {} chunks, {} retained", evicted, self.chunks.len());
    }

    /// Gets the block id at world coordinates.
    ///
    /// # Arguments
    /// * `x`, `y`, `z` - World block coordinates
    /// * `force` - Generate the containing chunk synchronously if needed
    ///
    /// # Returns
    /// The block id, air if the chunk is not available or `y` is outside the world.
    pub fn get_block(&mut self, x: i32, y: i32, z: i32, force: bool) -> Result<BlockTypeSize, JobError> {
        let (chunk_x, local_x) = world_to_chunk(x);
        let (chunk_z, local_z) = world_to_chunk(z);
        Ok(self
            .get_chunk(chunk_x, chunk_z, force)?
            .map_or(AIR_ID, |chunk| chunk.get().get_block(local_x, y, local_z)))
    }

    /// Writes a block at world coordinates.
    ///
    /// If a streaming slot watches the edited chunk, the edit is recorded and
    /// reported by [`World::take_watched_edits`].
    ///
    /// # Arguments
    /// * `id` - The block id to write, `AIR_ID` to clear
    /// * `x`, `y`, `z` - World block coordinates
    /// * `force` - Generate the containing chunk synchronously if needed
    ///
    /// # Returns
    /// `Ok(false)` if `y` is outside the world or the chunk is not available.
    pub fn set_block(
        &mut self,
        id: BlockTypeSize,
        x: i32,
        y: i32,
        z: i32,
        force: bool,
    ) -> Result<bool, JobError> {
        if !(0..CHUNK_HEIGHT).contains(&y) {
            return Ok(false);
        }

        let (chunk_x, local_x) = world_to_chunk(x);
        let (chunk_z, local_z) = world_to_chunk(z);
        let Some(chunk) = self.get_chunk(chunk_x, chunk_z, force)? else {
            return Ok(false);
        };

        let mut chunk = chunk.get_mut();
        chunk.set_block(local_x, y, local_z, id, self.generator.registry());
        if chunk.watcher.is_some() {
            self.watched_edits.push(chunk.position);
        }
        Ok(true)
    }

    /// Gets the light level at world coordinates from resident chunks only.
    ///
    /// # Returns
    /// `MAX_LIGHT_LEVEL` above or below the world, 0 for chunks that are not resident.
    pub fn get_light_level(&self, x: i32, y: i32, z: i32) -> u8 {
        if !(0..CHUNK_HEIGHT).contains(&y) {
            return MAX_LIGHT_LEVEL;
        }
        let (chunk_x, local_x) = world_to_chunk(x);
        let (chunk_z, local_z) = world_to_chunk(z);
        self.chunks
            .get(&Point2::new(chunk_x, chunk_z))
            .map_or(0, |chunk| chunk.get().get_light_level(local_x, y, local_z))
    }

    /// Drains the chunk coordinates of edits made to watched chunks.
    pub fn take_watched_edits(&mut self) -> Vec<Point2<i32>> {
        std::mem::take(&mut self.watched_edits)
    }
}
