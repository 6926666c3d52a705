//! # Engine State
//!
//! This module ties the chunk pipeline together. `EngineState` owns the
//! world store, the background task pool and the streaming window, and
//! advances all of them once per tick of the control loop.
//!
//! ## Key Components
//!
//! - **config**: Startup settings loaded from JSON
//! - **rendering**: Atlas catalog, vertex format, mesh builder and the renderer seam
//! - **streaming**: The window of slots kept up to date around the viewer
//! - **task_management**: Worker pool running generation and meshing jobs
//! - **voxels**: Blocks, chunks, terrain generation, lighting and the world store
//!
//! The control loop never blocks on a job: generation and meshing results are
//! picked up by later ticks once workers report them finished.

use std::sync::Arc;

use anyhow::Context;
use cgmath::Point3;

use crate::engine_state::{
    config::EngineConfig,
    rendering::{atlas::Atlas, meshing::ChunkRenderer},
    streaming::ChunkStreamer,
    task_management::{task::JobError, TaskManager},
    voxels::{
        block::{BlockRegistry, BlockTypeSize},
        chunk_generator::ChunkGenerator,
        world::World,
    },
};

pub mod config;
pub mod rendering;
pub mod streaming;
pub mod task_management;
pub mod voxels;

/// The main engine state that coordinates the chunk pipeline.
///
/// # Example
///
/// ```no_run
/// use cgmath::Point3;
/// use voxel_world::engine_state::{config::EngineConfig, rendering::LoggingRenderer, EngineState};
///
/// let mut engine = EngineState::new(&EngineConfig::default()).unwrap();
/// let mut renderer = LoggingRenderer::default();
///
/// // Main loop
/// loop {
///     engine.tick(Point3::new(8.0, 80.0, 8.0), &mut renderer);
/// }
/// ```
pub struct EngineState {
    /// Block catalog shared with every job
    registry: Arc<BlockRegistry>,
    /// The voxel world containing all resident chunks
    world: World,
    /// Task manager for background jobs
    task_manager: TaskManager,
    /// Window of chunks around the viewer
    streamer: ChunkStreamer,
    /// Ticks run so far
    ticks: u64,
}

impl EngineState {
    /// Creates a new engine state with all subsystems initialized
    ///
    /// # Arguments
    ///
    /// * `config` - Startup settings
    ///
    /// # Returns
    ///
    /// A ready engine, or an error if the settings, atlas layout or block catalog are invalid
    pub fn new(config: &EngineConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let atlas = match &config.atlas_layout {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading atlas layout {}", path.display()))?;
                Atlas::from_json(&json)
                    .with_context(|| format!("parsing atlas layout {}", path.display()))?
            }
            None => Atlas::standard(),
        };
        log::info!(
            "Atlas loaded: {} textures, {}x{} px",
            atlas.len(),
            atlas.width(),
            atlas.height()
        );

        let registry = BlockRegistry::standard(&atlas).context("building block catalog")?;
        let seed = config.resolve_seed();
        let generator = Arc::new(ChunkGenerator::new(seed, registry.clone()));
        let task_manager = TaskManager::new(config.resolve_worker_threads());
        let streamer = ChunkStreamer::new(registry.clone(), config.view_distance)
            .with_retained_factor(config.retained_factor);

        log::info!(
            "Engine initialized: seed {}, view distance {}, {} workers",
            seed,
            config.view_distance,
            task_manager.num_workers()
        );

        Ok(Self {
            registry,
            world: World::new(generator),
            task_manager,
            streamer,
            ticks: 0,
        })
    }

    /// Advances the engine by one tick.
    ///
    /// Harvests finished jobs, starts queued ones and updates the streaming
    /// window around `viewer`.
    ///
    /// # Arguments
    ///
    /// * `viewer` - Viewer position in world coordinates
    /// * `renderer` - Receiver of geometry uploads and releases
    pub fn tick(&mut self, viewer: Point3<f64>, renderer: &mut dyn ChunkRenderer) {
        self.process_tasks();
        self.streamer
            .update(viewer, &mut self.world, &mut self.task_manager, renderer);
        self.ticks += 1;
    }

    /// Processes completed and queued tasks
    ///
    /// Called by `tick`; exposed so callers can drain the pool between ticks.
    pub fn process_tasks(&mut self) {
        self.task_manager.process_completed_tasks();
        self.task_manager.process_queued_tasks();
    }

    /// Places a block at world coordinates, generating its chunk if needed.
    ///
    /// Streaming slots around the edited chunk are rebuilt on the next tick.
    ///
    /// # Returns
    ///
    /// `Ok(false)` if `y` lies outside the world.
    pub fn set_block(
        &mut self,
        id: BlockTypeSize,
        x: i32,
        y: i32,
        z: i32,
    ) -> Result<bool, JobError> {
        self.world.set_block(id, x, y, z, true)
    }

    /// Reads the block at world coordinates, generating its chunk if needed.
    pub fn get_block(&mut self, x: i32, y: i32, z: i32) -> Result<BlockTypeSize, JobError> {
        self.world.get_block(x, y, z, true)
    }

    /// Changes the streaming window radius from the next tick on.
    pub fn set_view_distance(&mut self, view_distance: u32) {
        self.streamer.set_view_distance(view_distance);
    }

    /// Releases every slot of the streaming window.
    pub fn shutdown(&mut self, renderer: &mut dyn ChunkRenderer) {
        self.streamer.release_all(renderer);
        log::info!("Engine stopped after {} ticks", self.ticks);
    }

    /// The block catalog.
    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    /// The world store.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The streaming window.
    pub fn streamer(&self) -> &ChunkStreamer {
        &self.streamer
    }

    /// The background task pool.
    pub fn task_manager(&self) -> &TaskManager {
        &self.task_manager
    }

    /// Number of ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
