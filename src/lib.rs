#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel World
//!
//! The chunk world pipeline of a voxel engine: an unbounded, chunk-partitioned
//! block grid that is generated procedurally, lit by flood fill and turned into
//! renderable geometry while a viewer moves through it and edits blocks.
//!
//! ## Key Modules
//!
//! * `core` - Shared resource handles used across threads
//! * `engine_state` - Chunks, generation, lighting, meshing, task scheduling and streaming
//!
//! ## Architecture
//!
//! The control loop owns the world store and the streaming window. Everything
//! expensive runs on a worker pool:
//! * Terrain generation, one job per chunk
//! * Lighting and meshing, one job per slot over a snapshot of its 3x3 window
//!
//! Finished geometry is handed to a [`ChunkRenderer`] implementation; the crate
//! itself does not depend on a graphics API.
//!
//! ## Usage
//!
//! ```no_run
//! fn main() -> anyhow::Result<()> {
//!     voxel_world::run()
//! }
//! ```
//!
//! [`ChunkRenderer`]: engine_state::rendering::ChunkRenderer

use cgmath::Point3;
use log::info;

use engine_state::{config::EngineConfig, rendering::LoggingRenderer, EngineState};

pub mod core;
pub mod engine_state;

/// Environment variable naming a configuration file when no argument is given.
pub const CONFIG_ENV_VAR: &str = "VOXEL_WORLD_CONFIG";

/// Blocks the demo viewer moves per tick along the x axis.
const DEMO_VIEWER_SPEED: f64 = 0.5;

/// Runs the headless demo.
///
/// Loads the configuration named by the first command line argument or by
/// [`CONFIG_ENV_VAR`], then walks a viewer across the world for the configured
/// number of ticks with a renderer that only records what it receives.
pub fn run() -> anyhow::Result<()> {
    let mut log_builder = env_logger::Builder::new();
    log_builder.target(env_logger::Target::Stdout);
    log_builder.parse_env("RUST_LOG");
    log_builder.init();
    info!("Logger initialized");

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var(CONFIG_ENV_VAR).ok());
    let config = match config_path {
        Some(path) => {
            info!("Loading config from {}", path);
            EngineConfig::load(path)?
        }
        None => EngineConfig::default(),
    };

    let mut engine = EngineState::new(&config)?;
    let mut renderer = LoggingRenderer::new();
    let half_way = config.demo_ticks / 2;

    for tick in 0..config.demo_ticks {
        let viewer = Point3::new(8.0 + tick as f64 * DEMO_VIEWER_SPEED, 100.0, 8.0);
        if tick == half_way {
            // Light a lantern under the viewer to exercise edits of watched chunks.
            let (x, z) = (viewer.x.floor() as i32, viewer.z.floor() as i32);
            let lantern = engine_state::voxels::block::block_type::BlockType::LANTERN.id();
            engine.set_block(lantern, x, 90, z)?;
            info!("Placed a lantern at ({}, 90, {})", x, z);
        }

        engine.tick(viewer, &mut renderer);

        if tick % 60 == 0 {
            info!(
                "Tick {}: viewer chunk {:?}, {} slots, {} resident chunks, {} uploads, {} vertices",
                tick,
                engine.streamer().viewer_chunk(),
                engine.streamer().len(),
                engine.world().len(),
                renderer.uploads(),
                renderer.vertices()
            );
        }
        std::thread::sleep(web_time::Duration::from_millis(16));
    }

    engine.shutdown(&mut renderer);
    info!(
        "Demo finished: {} uploads, {} releases",
        renderer.uploads(),
        renderer.releases().len()
    );
    Ok(())
}
