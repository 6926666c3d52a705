//! # Voxel Task System
//!
//! This module contains tasks related to voxel world generation. They run on
//! the task manager's workers to keep the control loop responsive while
//! terrain is produced.

pub mod chunk_generation_task;
