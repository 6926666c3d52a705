//! Rendering-side data of the voxel engine.
//!
//! This module turns chunks into GPU-friendly geometry without depending on a
//! graphics API. It holds the texture atlas catalog, the vertex format, the
//! mesh builder and the renderer seam a backend implements.

pub mod atlas;
pub mod meshing;
pub mod tasks;
pub mod vertex;

// Re-export commonly used types
pub use meshing::{ChunkGeometry, ChunkRenderer, IndexRange, LoggingRenderer, MeshBuilder};
pub use vertex::Vertex;
