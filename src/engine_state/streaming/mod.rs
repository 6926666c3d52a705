//! # Chunk Streaming
//!
//! This module keeps a square window of chunks around a moving viewer lit,
//! meshed and uploaded without ever blocking the control loop.
//!
//! ## Tick Overview
//!
//! Every call to [`ChunkStreamer::update`]:
//! 1. opens the upload gate
//! 2. turns edits of watched chunks into dirty slots
//! 3. applies a staged view distance change
//! 4. recomputes the viewer's chunk and evicts far chunks from the world
//! 5. keeps slots whose chunk is still in the window, creates slots for new
//!    positions and releases the rest exactly once
//! 6. marks the 3x3 slots around the viewer high priority
//! 7. updates every slot, nearest first
//!
//! Each slot tracks a chunk it shows and at most one background job that
//! lights and meshes a snapshot of the chunk's 3x3 window. A finished result
//! is only uploaded once every neighbour's job has finished as well, so
//! adjacent chunks switch to new geometry together.

use std::collections::HashMap;
use std::sync::Arc;

use cgmath::{Point2, Point3, Vector2};

use crate::engine_state::{
    rendering::meshing::ChunkRenderer,
    task_management::TaskManager,
    voxels::{
        block::BlockRegistry,
        chunk::{chunk_matrix::ChunkMatrix, CHUNK_DIMENSION},
        world::World,
    },
};

mod chunk_slot;
mod upload_gate;

pub use crate::core::SlotKey;
pub use chunk_slot::{ChunkSlot, SlotState};
pub use upload_gate::UploadGate;

/// Factor applied to the window area to get the number of chunks the world keeps.
pub const RETAINED_CHUNKS_FACTOR: usize = 4;

/// Returns the window offsets for a view distance, nearest first.
///
/// Offsets at equal distance keep row-major order (`z`, then `x`).
pub fn window_offsets(view_distance: i32) -> Vec<Vector2<i32>> {
    let mut offsets = Vec::new();
    for z in -view_distance..=view_distance {
        for x in -view_distance..=view_distance {
            offsets.push(Vector2::new(x, z));
        }
    }
    offsets.sort_by_key(|offset| offset.x * offset.x + offset.y * offset.y);
    offsets
}

/// Smallest cleanup budget that keeps every chunk of a window resident.
///
/// Cleanup ranks chunks by Euclidean distance, so the window corners at
/// `2 * view_distance²` tie with, or rank behind, chunks outside the square.
/// Counting every chunk within that distance covers the whole window.
pub fn window_covering_budget(view_distance: i32) -> usize {
    let corner = 2 * view_distance * view_distance;
    let reach = 2 * view_distance;
    let mut count = 0;
    for z in -reach..=reach {
        for x in -reach..=reach {
            if x * x + z * z <= corner {
                count += 1;
            }
        }
    }
    count
}

/// Converts a viewer position into the coordinates of the chunk containing it.
pub fn viewer_chunk(viewer: Point3<f64>) -> Point2<i32> {
    let size = CHUNK_DIMENSION as f64;
    Point2::new(
        (viewer.x / size).floor() as i32,
        (viewer.z / size).floor() as i32,
    )
}

/// Manages the streaming window around the viewer.
pub struct ChunkStreamer {
    registry: Arc<BlockRegistry>,
    view_distance: i32,
    staged_view_distance: Option<i32>,
    retained_factor: usize,
    offsets: Vec<Vector2<i32>>,
    slots: HashMap<Point2<i32>, ChunkSlot>,
    viewer_chunk: Point2<i32>,
    next_generation: u64,
    gate: UploadGate,
}

impl ChunkStreamer {
    /// Creates a streamer with an empty window.
    ///
    /// # Arguments
    /// * `registry` - Block catalog handed to meshing jobs
    /// * `view_distance` - Window radius in chunks; the window side is `2 * view_distance + 1`
    pub fn new(registry: Arc<BlockRegistry>, view_distance: u32) -> Self {
        let view_distance = view_distance as i32;
        ChunkStreamer {
            registry,
            view_distance,
            staged_view_distance: None,
            retained_factor: RETAINED_CHUNKS_FACTOR,
            offsets: window_offsets(view_distance),
            slots: HashMap::new(),
            viewer_chunk: Point2::new(0, 0),
            next_generation: 0,
            gate: UploadGate::new(),
        }
    }

    /// Overrides how many chunks the world keeps per window chunk.
    pub fn with_retained_factor(mut self, factor: usize) -> Self {
        self.retained_factor = factor;
        self
    }

    /// Current window radius in chunks.
    pub fn view_distance(&self) -> u32 {
        self.view_distance as u32
    }

    /// Window side length in chunks.
    pub fn window_side(&self) -> usize {
        (2 * self.view_distance + 1) as usize
    }

    /// Number of chunks the world may keep around the viewer.
    ///
    /// This is the window area times the retained factor, but never less than
    /// [`window_covering_budget`], so cleanup cannot evict a chunk a slot shows.
    pub fn retained_chunks(&self) -> usize {
        let side = self.window_side();
        (side * side * self.retained_factor).max(window_covering_budget(self.view_distance))
    }

    /// Stages a new view distance; it takes effect on the next update.
    pub fn set_view_distance(&mut self, view_distance: u32) {
        self.staged_view_distance = Some(view_distance as i32);
    }

    /// Chunk coordinates of the viewer as of the last update.
    pub fn viewer_chunk(&self) -> Point2<i32> {
        self.viewer_chunk
    }

    /// The slot at chunk coordinates, if it is in the window.
    pub fn slot(&self, position: Point2<i32>) -> Option<&ChunkSlot> {
        self.slots.get(&position)
    }

    /// Every slot of the window, in no particular order.
    pub fn slots(&self) -> impl Iterator<Item = &ChunkSlot> {
        self.slots.values()
    }

    /// Number of slots in the window.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the window has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether every slot of the window has uploaded its latest geometry.
    pub fn is_settled(&self) -> bool {
        self.slots.len() == self.offsets.len()
            && self
                .slots
                .values()
                .all(|slot| slot.state() == SlotState::Ready && !slot.is_dirty() && !slot.has_job())
    }

    /// Marks the slot of a chunk and its eight neighbours dirty.
    ///
    /// # Arguments
    /// * `chunk_position` - Chunk coordinates of an edited chunk
    pub fn mark_dirty(&mut self, chunk_position: Point2<i32>) {
        for dz in -1..=1 {
            for dx in -1..=1 {
                let position = Point2::new(chunk_position.x + dx, chunk_position.y + dz);
                if let Some(slot) = self.slots.get_mut(&position) {
                    slot.mark_dirty();
                }
            }
        }
    }

    /// Advances streaming by one tick.
    ///
    /// # Arguments
    /// * `viewer` - Viewer position in world coordinates
    /// * `world` - The world store; chunks are requested and evicted here
    /// * `task_manager` - Pool for generation and meshing jobs
    /// * `renderer` - Receiver of uploads and releases
    pub fn update(
        &mut self,
        viewer: Point3<f64>,
        world: &mut World,
        task_manager: &mut TaskManager,
        renderer: &mut dyn ChunkRenderer,
    ) {
        self.gate.open();

        for position in world.take_watched_edits() {
            self.mark_dirty(position);
        }

        if let Some(view_distance) = self.staged_view_distance.take() {
            log::info!(
                "View distance changed from {} to {}",
                self.view_distance,
                view_distance
            );
            self.view_distance = view_distance;
            self.offsets = window_offsets(view_distance);
        }

        self.viewer_chunk = viewer_chunk(viewer);
        world.perform_cleanup(
            self.viewer_chunk.x,
            self.viewer_chunk.y,
            self.retained_chunks(),
        );

        self.rebuild_window(world, task_manager, renderer);

        for offset in &self.offsets {
            let position = self.viewer_chunk + *offset;
            if let Some(slot) = self.slots.get_mut(&position) {
                slot.set_high_priority(offset.x.abs() <= 1 && offset.y.abs() <= 1);
            }
        }

        for index in 0..self.offsets.len() {
            let position = self.viewer_chunk + self.offsets[index];
            let (matrix, neighbours_finished) = self.neighbourhood(position);
            if let Some(slot) = self.slots.get_mut(&position) {
                slot.update(
                    matrix,
                    neighbours_finished,
                    &mut self.gate,
                    &self.registry,
                    task_manager,
                    renderer,
                );
            }
        }
    }

    /// Keeps in-window slots, creates missing ones and releases the rest.
    fn rebuild_window(
        &mut self,
        world: &mut World,
        task_manager: &mut TaskManager,
        renderer: &mut dyn ChunkRenderer,
    ) {
        let mut previous = std::mem::take(&mut self.slots);

        for offset in &self.offsets {
            let position = self.viewer_chunk + *offset;
            let mut slot = match previous.remove(&position) {
                Some(slot) => slot,
                None => {
                    let key = SlotKey::new(position, self.next_generation);
                    self.next_generation += 1;
                    ChunkSlot::new(key)
                }
            };

            if slot.chunk().is_none() {
                match world.schedule_chunk(task_manager, position.x, position.y) {
                    Ok(Some(chunk)) => slot.attach(chunk),
                    Ok(None) => {}
                    Err(err) => log::error!(
                        "Chunk ({}, {}) could not be generated, retrying: {}",
                        position.x,
                        position.y,
                        err
                    ),
                }
            }

            self.slots.insert(position, slot);
        }

        for (_, slot) in previous {
            slot.release(renderer);
        }
    }

    /// Builds a slot's window from the chunks of its neighbouring slots.
    ///
    /// # Returns
    /// The window and whether every neighbour slot with a chunk has a finished job.
    fn neighbourhood(&self, position: Point2<i32>) -> (ChunkMatrix, bool) {
        let mut matrix = ChunkMatrix::default();
        let mut finished = true;
        for dz in -1..=1 {
            for dx in -1..=1 {
                let neighbour = Point2::new(position.x + dx, position.y + dz);
                let Some(slot) = self.slots.get(&neighbour) else {
                    continue;
                };
                let Some(chunk) = slot.chunk() else {
                    continue;
                };
                matrix.set(dx, dz, Some(chunk.clone()));
                if (dx, dz) != (0, 0) && !slot.is_job_finished() {
                    finished = false;
                }
            }
        }
        (matrix, finished)
    }

    /// Releases every slot. The streamer can be updated again afterwards.
    pub fn release_all(&mut self, renderer: &mut dyn ChunkRenderer) {
        for (_, slot) in self.slots.drain() {
            slot.release(renderer);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::rendering::atlas::Atlas;

    #[test]
    fn window_is_sorted_nearest_first() {
        let offsets = window_offsets(2);
        assert_eq!(offsets.len(), 25);
        assert_eq!(offsets[0], Vector2::new(0, 0));
        let distances: Vec<i32> = offsets.iter().map(|o| o.x * o.x + o.y * o.y).collect();
        assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
        assert_eq!(offsets[1], Vector2::new(0, -1));
    }

    #[test]
    fn covering_budget_keeps_the_whole_window() {
        assert_eq!(window_covering_budget(0), 1);
        assert_eq!(window_covering_budget(1), 9);
        assert_eq!(window_covering_budget(3), 61);

        for view_distance in 0..8 {
            let budget = window_covering_budget(view_distance);
            let reach = 2 * view_distance + 1;
            let mut ranked = Vec::new();
            for z in -reach..=reach {
                for x in -reach..=reach {
                    ranked.push((x * x + z * z, x, z));
                }
            }
            ranked.sort();
            let kept = &ranked[..budget];
            for offset in window_offsets(view_distance) {
                let distance = offset.x * offset.x + offset.y * offset.y;
                assert!(kept.contains(&(distance, offset.x, offset.y)));
            }
        }
    }

    #[test]
    fn retained_chunks_never_drop_below_the_window() {
        let registry = BlockRegistry::standard(&Atlas::standard()).unwrap();
        let streamer = ChunkStreamer::new(registry.clone(), 3).with_retained_factor(0);
        assert_eq!(streamer.retained_chunks(), 61);
        let streamer = ChunkStreamer::new(registry, 3).with_retained_factor(4);
        assert_eq!(streamer.retained_chunks(), 196);
    }

    #[test]
    fn viewer_chunk_uses_floor() {
        assert_eq!(viewer_chunk(Point3::new(0.5, 70.0, 15.9)), Point2::new(0, 0));
        assert_eq!(viewer_chunk(Point3::new(-0.1, 70.0, 16.0)), Point2::new(-1, 1));
        assert_eq!(viewer_chunk(Point3::new(-16.0, 0.0, -16.1)), Point2::new(-1, -2));
    }
}
