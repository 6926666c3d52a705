//! One position of the streaming window and the lifecycle of its geometry.

use std::sync::Arc;

use cgmath::Point2;

use super::upload_gate::UploadGate;
use crate::core::{MtResource, SlotKey};
use crate::engine_state::{
    rendering::{
        meshing::ChunkRenderer,
        tasks::chunk_mesh_generation_task::{ChunkMeshGenerationTask, ChunkMeshOutput},
    },
    task_management::{task::JobHandle, TaskManager},
    voxels::{
        block::BlockRegistry,
        chunk::{chunk_matrix::ChunkMatrix, Chunk},
    },
};

/// Lifecycle of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Released; the slot is no longer part of the window
    Empty,
    /// Waiting for the world to provide the chunk
    AwaitingChunk,
    /// A lighting and meshing job is running or waiting to be applied
    Meshing,
    /// The latest job's result has been uploaded
    Ready,
}

/// A position of the streaming window.
#[derive(Debug)]
pub struct ChunkSlot {
    key: SlotKey,
    state: SlotState,
    chunk: Option<MtResource<Chunk>>,
    job: Option<JobHandle<ChunkMeshOutput>>,
    /// Window the running or last job was built from
    submitted: Option<ChunkMatrix>,
    dirty: bool,
    /// Whether the latest job has finished, applied or not
    job_finished: bool,
    high_priority: bool,
}

impl ChunkSlot {
    pub(crate) fn new(key: SlotKey) -> Self {
        ChunkSlot {
            key,
            state: SlotState::AwaitingChunk,
            chunk: None,
            job: None,
            submitted: None,
            dirty: false,
            job_finished: false,
            high_priority: false,
        }
    }

    /// Key of the slot.
    pub fn key(&self) -> SlotKey {
        self.key
    }

    /// Chunk coordinates of the slot.
    pub fn position(&self) -> Point2<i32> {
        self.key.position
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SlotState {
        self.state
    }

    /// The live chunk shown by the slot, once the world provided it.
    pub fn chunk(&self) -> Option<&MtResource<Chunk>> {
        self.chunk.as_ref()
    }

    /// Whether the slot's geometry must be rebuilt even if its window is unchanged.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether a job was submitted and its result not applied yet.
    pub fn has_job(&self) -> bool {
        self.job.is_some()
    }

    /// Whether the latest job has finished. Neighbours wait for this before uploading.
    pub fn is_job_finished(&self) -> bool {
        self.job_finished
    }

    /// Whether the slot is within one chunk of the viewer.
    pub fn is_high_priority(&self) -> bool {
        self.high_priority
    }

    pub(crate) fn set_high_priority(&mut self, high_priority: bool) {
        self.high_priority = high_priority;
    }

    /// Requests a rebuild on the next update.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Takes ownership of the chunk the world provided and starts watching it.
    pub(crate) fn attach(&mut self, chunk: MtResource<Chunk>) {
        chunk.get_mut().watcher = Some(self.key);
        self.chunk = Some(chunk);
        self.state = SlotState::Meshing;
    }

    /// Stops watching the chunk and tells the renderer the slot is gone.
    ///
    /// A running job is abandoned; its output is discarded.
    pub(crate) fn release(mut self, renderer: &mut dyn ChunkRenderer) {
        if let Some(chunk) = self.chunk.take() {
            let mut chunk = chunk.get_mut();
            if chunk.watcher == Some(self.key) {
                chunk.watcher = None;
            }
        }
        self.job = None;
        self.state = SlotState::Empty;
        renderer.release(self.key);
    }

    /// Advances the slot by one tick.
    ///
    /// First a finished job is applied if its neighbours are finished too and
    /// the slot may upload. A finished job that is held back is dropped when the
    /// slot is dirty. Then a new job is submitted if none is pending and either
    /// the window changed or the slot is dirty.
    ///
    /// # Arguments
    /// * `matrix` - The slot's current window, centred on its chunk
    /// * `neighbours_finished` - Whether every present neighbour slot's job has finished
    /// * `gate` - The per-tick upload gate
    /// * `registry` - Block catalog for new jobs
    /// * `task_manager` - Pool new jobs are published to
    /// * `renderer` - Receiver of finished geometry
    pub(crate) fn update(
        &mut self,
        matrix: ChunkMatrix,
        neighbours_finished: bool,
        gate: &mut UploadGate,
        registry: &Arc<BlockRegistry>,
        task_manager: &mut TaskManager,
        renderer: &mut dyn ChunkRenderer,
    ) {
        if self.chunk.is_none() {
            return;
        }

        self.apply_finished_job(neighbours_finished, gate, renderer);

        if self.job.is_none() && (self.submitted.as_ref() != Some(&matrix) || self.dirty) {
            self.job = Some(task_manager.publish_task(ChunkMeshGenerationTask::new(
                registry.clone(),
                &matrix,
            )));
            self.submitted = Some(matrix);
            self.dirty = false;
            self.job_finished = false;
            self.state = SlotState::Meshing;
        }
    }

    fn apply_finished_job(
        &mut self,
        neighbours_finished: bool,
        gate: &mut UploadGate,
        renderer: &mut dyn ChunkRenderer,
    ) {
        let Some(job) = self.job.as_mut() else {
            return;
        };
        if !job.is_done() {
            return;
        }
        self.job_finished = true;

        if !neighbours_finished || !(gate.is_open() || self.high_priority) {
            if self.dirty {
                // Held-back output predates the edit; rebuild now instead.
                self.job = None;
            }
            return;
        }

        match job.try_take() {
            Some(Ok(output)) => {
                if let (Some(chunk), Some(lit)) = (&self.chunk, &output.lit_chunk) {
                    chunk.get_mut().copy_lighting_from(lit);
                }
                renderer.upload(self.key, self.key.position, &output.geometry);
                gate.consume();
                self.state = SlotState::Ready;
            }
            Some(Err(err)) => {
                log::error!(
                    "Meshing chunk ({}, {}) failed, retrying: {}",
                    self.key.position.x,
                    self.key.position.y,
                    err
                );
                self.dirty = true;
            }
            None => {}
        }
        self.job = None;
    }
}
