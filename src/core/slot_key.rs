//! Identity of a streaming slot, shared by chunks, the streamer and renderers.

use cgmath::Point2;

/// Identifies a streaming slot.
///
/// The generation makes keys unique over the streamer's lifetime, so a slot
/// that leaves the window and a later slot for the same chunk never share a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    /// Chunk coordinates of the slot
    pub position: Point2<i32>,
    /// Creation counter of the streamer that made the slot
    pub generation: u64,
}

impl SlotKey {
    /// Creates a key.
    pub fn new(position: Point2<i32>, generation: u64) -> Self {
        SlotKey {
            position,
            generation,
        }
    }
}
