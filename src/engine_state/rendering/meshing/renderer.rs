//! The seam between the chunk pipeline and a graphics backend.
//!
//! The streamer never talks to a GPU itself. It hands finished geometry to a
//! [`ChunkRenderer`] and tells it when a slot goes away; everything else (buffer
//! allocation, draw calls, culling) is the backend's business.

use std::collections::HashMap;

use cgmath::Point2;

use super::ChunkGeometry;
use crate::core::SlotKey;

/// Receives chunk geometry from the streamer.
///
/// Every slot key is released exactly once, after its last `upload` if it
/// had any. A slot may be released without ever uploading, and a key is
/// never reused after it has been released.
pub trait ChunkRenderer {
    /// Replaces the geometry shown for a slot.
    ///
    /// # Arguments
    /// * `key` - The slot the geometry belongs to
    /// * `position` - Chunk coordinates of the slot
    /// * `geometry` - Chunk-relative geometry; the chunk origin is `position * CHUNK_DIMENSION`
    fn upload(&mut self, key: SlotKey, position: Point2<i32>, geometry: &ChunkGeometry);

    /// Frees everything held for a slot.
    fn release(&mut self, key: SlotKey);
}

/// A renderer that only records and logs what it is given.
///
/// Used by the headless demo and by tests.
#[derive(Debug, Default)]
pub struct LoggingRenderer {
    resident: HashMap<SlotKey, Point2<i32>>,
    uploads: usize,
    releases: Vec<SlotKey>,
    vertices: usize,
}

impl LoggingRenderer {
    /// Creates an empty renderer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Slots that received geometry and have not been released.
    pub fn resident(&self) -> &HashMap<SlotKey, Point2<i32>> {
        &self.resident
    }

    /// Total number of uploads.
    pub fn uploads(&self) -> usize {
        self.uploads
    }

    /// Every released key, in release order.
    pub fn releases(&self) -> &[SlotKey] {
        &self.releases
    }

    /// Total number of vertices uploaded.
    pub fn vertices(&self) -> usize {
        self.vertices
    }
}

impl ChunkRenderer for LoggingRenderer {
    fn upload(&mut self, key: SlotKey, position: Point2<i32>, geometry: &ChunkGeometry) {
        log::debug!(
            "Uploading chunk ({}, {}): {} vertices, {} solid and {} translucent indices",
            position.x,
            position.y,
            geometry.vertices.len(),
            geometry.solid.count,
            geometry.translucent.count
        );
        self.resident.insert(key, position);
        self.uploads += 1;
        self.vertices += geometry.vertices.len();
    }

    fn release(&mut self, key: SlotKey) {
        log::debug!("Releasing slot {:?}", key);
        self.resident.remove(&key);
        self.releases.push(key);
    }
}
