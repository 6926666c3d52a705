//! Background tasks for the rendering system.
//!
//! # Available Tasks
//! - `ChunkMeshGenerationTask`: Solves lighting and builds geometry for one chunk

pub mod chunk_mesh_generation_task;
