//! # Voxel Engine Core
//!
//! This module contains the core voxel world functionality: representing,
//! generating, lighting and storing a chunk-partitioned block grid.
//!
//! ## Architecture
//!
//! The voxel system is organized into several key components:
//!
//! * **Block**: The immutable catalog of block kinds and their properties
//! * **Chunk**: Fixed-size 16x128x16 columns of blocks, plus the 3x3 chunk window
//! * **Chunk Generator**: Deterministic terrain, caves and trees from a world seed
//! * **Lighting**: Flood-fill light propagation over a chunk window
//! * **World**: Sparse storage of chunks with on-demand generation and eviction
//! * **Tasks**: Background chunk generation
//!
//! ## Data Flow
//!
//! 1. The streamer asks the world for chunks around the viewer
//! 2. The world returns resident chunks or schedules generation jobs
//! 3. Edits go through the world, which records edits to watched chunks
//! 4. Lighting and meshing run on snapshots of a chunk's 3x3 window
//!
//! ## Thread Safety
//!
//! Live chunks are only touched by the control thread. Background jobs get
//! either a chunk they create themselves or deep copies.

pub mod block;
pub mod chunk;
pub mod chunk_generator;
pub mod lighting;
pub mod tasks;
pub mod world;
