//! End-to-end checks of the chunk pipeline: generation, streaming, edits and release.

use std::collections::HashSet;
use std::ops::Deref;
use std::sync::Arc;

use cgmath::{Point2, Point3};
use voxel_world::core::MtResource;
use voxel_world::engine_state::{
    rendering::{
        atlas::Atlas, vertex::vertex_bytes, ChunkGeometry, ChunkRenderer, LoggingRenderer,
        MeshBuilder,
    },
    streaming::{ChunkStreamer, SlotKey, SlotState},
    task_management::TaskManager,
    voxels::{
        block::{block_type::BlockType, BlockRegistry, AIR_ID},
        chunk::{chunk_matrix::ChunkMatrix, CHUNK_DIMENSION},
        chunk_generator::ChunkGenerator,
        lighting::compute_lighting,
        world::World,
    },
};

const MAX_TICKS: usize = 500;

/// Forwards to a `LoggingRenderer` and keeps the positions uploaded since the last tick.
#[derive(Default)]
struct Recorder {
    inner: LoggingRenderer,
    tick_uploads: Vec<Point2<i32>>,
}

impl Deref for Recorder {
    type Target = LoggingRenderer;

    fn deref(&self) -> &LoggingRenderer {
        &self.inner
    }
}

impl ChunkRenderer for Recorder {
    fn upload(&mut self, key: SlotKey, position: Point2<i32>, geometry: &ChunkGeometry) {
        self.tick_uploads.push(position);
        self.inner.upload(key, position, geometry);
    }

    fn release(&mut self, key: SlotKey) {
        self.inner.release(key);
    }
}

struct Harness {
    world: World,
    task_manager: TaskManager,
    streamer: ChunkStreamer,
    renderer: Recorder,
}

impl Harness {
    fn new(view_distance: u32, retained_factor: usize) -> Self {
        let registry = BlockRegistry::standard(&Atlas::standard()).unwrap();
        let generator = Arc::new(ChunkGenerator::new(42, registry.clone()));
        Harness {
            world: World::new(generator),
            task_manager: TaskManager::new(4),
            streamer: ChunkStreamer::new(registry, view_distance)
                .with_retained_factor(retained_factor),
            renderer: Recorder::default(),
        }
    }

    /// Runs one update once every submitted job has finished.
    ///
    /// # Returns
    /// The positions of the slots that uploaded during the update.
    fn tick(&mut self, viewer: Point3<f64>) -> Vec<Point2<i32>> {
        self.task_manager.wait_for_idle();
        self.renderer.tick_uploads.clear();
        self.streamer.update(
            viewer,
            &mut self.world,
            &mut self.task_manager,
            &mut self.renderer,
        );
        std::mem::take(&mut self.renderer.tick_uploads)
    }

    /// Ticks until every slot shows its latest geometry.
    ///
    /// Once settled no chunk is harvested after the tick's cleanup, so the
    /// world must be within its retention bound.
    fn settle(&mut self, viewer: Point3<f64>, max_world_chunks: usize) {
        for _ in 0..MAX_TICKS {
            self.tick(viewer);
            if self.streamer.is_settled() {
                assert!(self.world.len() <= max_world_chunks);
                return;
            }
        }
        panic!("streaming window did not settle");
    }

    fn window_keys(&self) -> HashSet<SlotKey> {
        self.streamer.slots().map(|slot| slot.key()).collect()
    }
}

fn viewer_in_chunk(chunk_x: i32, chunk_z: i32) -> Point3<f64> {
    let size = CHUNK_DIMENSION as f64;
    Point3::new(chunk_x as f64 * size + 8.0, 100.0, chunk_z as f64 * size + 8.0)
}

fn chebyshev(a: Point2<i32>, b: Point2<i32>) -> i32 {
    (a.x - b.x).abs().max((a.y - b.y).abs())
}

/// Replaces the lowest opaque voxel of a column with air and returns its height.
fn dig_below_surface(world: &mut World, x: i32, z: i32) -> i32 {
    let y = (1..64)
        .find(|y| {
            let id = world.get_block(x, *y, z, false).unwrap();
            world.registry().is_opaque(id)
        })
        .unwrap();
    assert!(world.set_block(AIR_ID, x, y, z, false).unwrap());
    y
}

#[test]
fn window_fills_and_every_slot_uploads() {
    let mut harness = Harness::new(1, 4);
    harness.settle(viewer_in_chunk(0, 0), 36);

    assert_eq!(harness.streamer.len(), 9);
    for slot in harness.streamer.slots() {
        assert_eq!(slot.state(), SlotState::Ready);
        assert!(harness.renderer.resident().contains_key(&slot.key()));
        let chunk = slot.chunk().unwrap().get();
        assert_eq!(chunk.watcher, Some(slot.key()));
    }
    assert!(harness.renderer.vertices() > 0);
    assert!(harness.renderer.releases().is_empty());
}

#[test]
fn single_edit_rebuilds_the_surrounding_nine_slots_once() {
    let mut harness = Harness::new(1, 4);
    let viewer = viewer_in_chunk(0, 0);
    harness.settle(viewer, 36);
    let uploads_before = harness.renderer.uploads();

    let y = dig_below_surface(&mut harness.world, 8, 8);

    harness.tick(viewer);
    for slot in harness.streamer.slots() {
        assert!(slot.has_job(), "slot {:?} was not rebuilt", slot.position());
        assert!(!slot.is_dirty());
    }

    harness.settle(viewer, 36);
    assert_eq!(harness.renderer.uploads(), uploads_before + 9);
    assert_eq!(harness.world.get_block(8, y, 8, false).unwrap(), AIR_ID);
}

#[test]
fn edit_outside_the_window_marks_nothing() {
    let mut harness = Harness::new(1, 4);
    let viewer = viewer_in_chunk(0, 0);
    harness.settle(viewer, 36);

    // Chunk (5, 5) is generated on demand but no slot watches it.
    let far = 5 * CHUNK_DIMENSION;
    assert!(harness.world.set_block(BlockType::STONE.id(), far, 40, far, true).unwrap());
    harness.tick(viewer);
    assert!(harness.streamer.slots().all(|slot| !slot.has_job()));
    assert!(harness.streamer.is_settled());
}

#[test]
fn moving_the_viewer_releases_each_slot_exactly_once() {
    let mut harness = Harness::new(1, 1);
    harness.settle(viewer_in_chunk(0, 0), 9);
    let first_window = harness.window_keys();
    let first_chunk = harness
        .streamer
        .slot(Point2::new(0, 0))
        .and_then(|slot| slot.chunk().cloned())
        .unwrap();

    harness.settle(viewer_in_chunk(3, 0), 9);
    let second_window = harness.window_keys();
    assert!(first_window.is_disjoint(&second_window));

    let released: HashSet<SlotKey> = harness.renderer.releases().iter().copied().collect();
    assert_eq!(released.len(), harness.renderer.releases().len());
    assert_eq!(released, first_window);
    assert_eq!(first_chunk.get().watcher, None);

    // The eviction bound keeps the world at one window's worth of chunks.
    assert!(harness.world.len() <= 9);
    for position in harness.world.positions() {
        assert!((position.x - 3).abs() <= 1 && position.y.abs() <= 1);
    }

    harness.streamer.release_all(&mut harness.renderer);
    let released: HashSet<SlotKey> = harness.renderer.releases().iter().copied().collect();
    assert_eq!(released.len(), harness.renderer.releases().len());
    assert_eq!(released.len(), 18);
    assert!(harness.renderer.resident().is_empty());
}

#[test]
fn cleanup_never_evicts_chunks_held_by_slots() {
    let mut harness = Harness::new(3, 1);
    let budget = harness.streamer.retained_chunks();
    harness.settle(viewer_in_chunk(0, 0), budget);
    harness.settle(viewer_in_chunk(1, 0), budget);

    for slot in harness.streamer.slots() {
        let position = slot.position();
        let held = slot.chunk().unwrap();
        let resident = harness.world.get_chunk(position.x, position.y, false).unwrap();
        assert!(
            resident.map_or(false, |chunk| MtResource::ptr_eq(&chunk, held)),
            "slot {:?} shows a chunk the world evicted",
            position
        );
    }

    // A corner of the window still hears about its edits.
    let (x, z) = (4 * CHUNK_DIMENSION + 8, 3 * CHUNK_DIMENSION + 8);
    assert!(harness.world.set_block(BlockType::STONE.id(), x, 120, z, true).unwrap());
    harness.tick(viewer_in_chunk(1, 0));
    assert!(harness.streamer.slot(Point2::new(4, 3)).unwrap().has_job());
}

#[test]
fn only_one_outer_slot_uploads_per_tick() {
    let mut harness = Harness::new(2, 4);
    let viewer = viewer_in_chunk(0, 0);
    let centre = Point2::new(0, 0);

    let mut outer_uploads = 0;
    for _ in 0..MAX_TICKS {
        let uploads = harness.tick(viewer);
        let outer = uploads
            .iter()
            .filter(|position| chebyshev(**position, centre) > 1)
            .count();
        assert!(outer <= 1, "{} outer slots uploaded in one tick", outer);
        outer_uploads += outer;
        if harness.streamer.is_settled() {
            break;
        }
    }
    assert!(harness.streamer.is_settled());
    assert!(outer_uploads >= 16);
}

#[test]
fn ring_slots_bypass_the_gate_and_deferred_jobs_upload_later() {
    let mut harness = Harness::new(2, 4);
    let viewer = viewer_in_chunk(0, 0);
    harness.settle(viewer, 100);
    let uploads_before = harness.renderer.uploads();

    dig_below_surface(&mut harness.world, 8, 8);
    assert!(harness.tick(viewer).is_empty());

    // Corners only border slots updated earlier in the tick, so they upload at once.
    let first = harness.tick(viewer);
    assert!(first.len() > 1, "only {:?} uploaded", first);
    assert!(first.iter().all(|position| chebyshev(*position, Point2::new(0, 0)) == 1));

    // The centre's neighbours had not finished when it was updated.
    let centre = harness.streamer.slot(Point2::new(0, 0)).unwrap();
    assert!(centre.has_job() && centre.is_job_finished());

    let second = harness.tick(viewer);
    assert!(second.contains(&Point2::new(0, 0)));
    harness.settle(viewer, 100);
    assert_eq!(harness.renderer.uploads(), uploads_before + 9);
}

#[test]
fn dirty_slot_with_held_back_job_resubmits() {
    let mut harness = Harness::new(2, 4);
    let viewer = viewer_in_chunk(0, 0);
    harness.settle(viewer, 100);

    // Rebuild the slots around chunk (2, 0), half of them outside the 3x3 ring.
    let x = 2 * CHUNK_DIMENSION + 8;
    dig_below_surface(&mut harness.world, x, 8);
    harness.tick(viewer);
    harness.tick(viewer);

    let held = harness
        .streamer
        .slots()
        .find(|slot| !slot.is_high_priority() && slot.has_job() && slot.is_job_finished())
        .map(|slot| slot.position())
        .unwrap();

    let (chunk_x, chunk_z) = (held.x * CHUNK_DIMENSION + 8, held.y * CHUNK_DIMENSION + 8);
    dig_below_surface(&mut harness.world, chunk_x, chunk_z);
    harness.tick(viewer);

    let slot = harness.streamer.slot(held).unwrap();
    assert!(slot.has_job());
    assert!(!slot.is_job_finished(), "slot {:?} kept its stale job", held);
    assert!(!slot.is_dirty());
    harness.settle(viewer, 100);
}

#[test]
fn slots_leaving_before_their_chunk_arrives_are_released() {
    let mut harness = Harness::new(1, 4);
    harness.tick(viewer_in_chunk(0, 0));
    let first_window = harness.window_keys();
    assert_eq!(first_window.len(), 9);

    harness.tick(viewer_in_chunk(10, 10));
    let released: HashSet<SlotKey> = harness.renderer.releases().iter().copied().collect();
    assert_eq!(released, first_window);
    assert_eq!(harness.renderer.releases().len(), 9);
}

#[test]
fn view_distance_change_grows_the_window() {
    let mut harness = Harness::new(1, 4);
    let viewer = viewer_in_chunk(0, 0);
    harness.settle(viewer, 36);

    harness.streamer.set_view_distance(2);
    assert_eq!(harness.streamer.len(), 9);
    harness.settle(viewer, 100);
    assert_eq!(harness.streamer.len(), 25);
    assert_eq!(harness.streamer.window_side(), 5);
    assert!(harness.renderer.releases().is_empty());
}

#[test]
fn seed_42_pipeline_is_deterministic() {
    let geometry = || {
        let registry = BlockRegistry::standard(&Atlas::standard()).unwrap();
        let generator = Arc::new(ChunkGenerator::new(42, registry.clone()));
        let mut world = World::new(generator);
        let mut matrix = ChunkMatrix::default();
        for dz in -1..=1 {
            for dx in -1..=1 {
                matrix.set(dx, dz, world.get_chunk(dx, dz, true).unwrap());
            }
        }
        compute_lighting(&matrix, &registry);
        let geometry = MeshBuilder::new(&registry).build(&matrix);
        let blocks = matrix.center().unwrap().get().blocks().to_vec();
        (blocks, vertex_bytes(&geometry.vertices).to_vec(), geometry.indices)
    };

    let (blocks_a, vertices_a, indices_a) = geometry();
    let (blocks_b, vertices_b, indices_b) = geometry();
    assert_eq!(blocks_a, blocks_b);
    assert_eq!(vertices_a, vertices_b);
    assert_eq!(indices_a, indices_b);
    assert!(!indices_a.is_empty());
}
