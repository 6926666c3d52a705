//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration file and missing keys fall back to the values below.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

/// Settings read at startup.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Seed of the procedural generator; a random seed is drawn when absent
    pub world_seed: Option<u64>,
    /// Streaming window radius in chunks
    pub view_distance: u32,
    /// Number of background workers, 0 picks one less than the available cores
    pub worker_threads: usize,
    /// Chunks the world keeps per chunk of the streaming window
    pub retained_factor: usize,
    /// JSON atlas layout replacing the built-in one
    pub atlas_layout: Option<PathBuf>,
    /// Number of ticks the headless demo runs
    pub demo_ticks: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            world_seed: None,
            view_distance: 5,
            worker_threads: 0,
            retained_factor: 4,
            atlas_layout: None,
            demo_ticks: 600,
        }
    }
}

impl EngineConfig {
    /// Loads a configuration from a JSON file.
    ///
    /// # Arguments
    /// * `path` - Location of the configuration file
    ///
    /// # Returns
    /// The parsed configuration, or an error naming the file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Parses a configuration from a JSON string.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.retained_factor >= 1,
            "retained_factor must be at least 1, got {}",
            self.retained_factor
        );
        Ok(())
    }

    /// The configured seed, or a fresh random one.
    pub fn resolve_seed(&self) -> u64 {
        match self.world_seed {
            Some(seed) => seed,
            None => {
                let seed = fastrand::u64(..);
                log::info!("No world seed configured, using {}", seed);
                seed
            }
        }
    }

    /// The number of workers to start; never zero.
    pub fn resolve_worker_threads(&self) -> usize {
        if self.worker_threads > 0 {
            return self.worker_threads;
        }
        std::thread::available_parallelism()
            .map(|cores| cores.get().saturating_sub(1))
            .unwrap_or(1)
            .max(1)
    }
}
