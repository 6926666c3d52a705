//! # Chunk Generator
//!
//! Deterministic procedural generation of chunk contents from a world seed and
//! the chunk coordinate. Generation runs four stages in order, each one free to
//! overwrite the previous:
//!
//! 1. **Terrain**: a height field from layered value noise, a grass/dirt cap
//!    or a water column over a sand lip, stone with ore rolls, a bedrock floor
//! 2. **Caves**: 3-D noise carving whose threshold grows with depth
//! 3. **Surface**: exposed dirt turns into grass
//! 4. **Trees**: trunks and canopies on grass, or decorative grass leaves
//!
//! Every random stream is seeded separately from the world seed, so changing
//! one stage never shifts the sequence another stage sees.

use std::sync::Arc;

use fastrand::Rng;
use noise::{NoiseFn, OpenSimplex, Value};

use super::block::block_type::BlockType;
use super::block::{BlockRegistry, BlockTypeSize, AIR_ID};
use super::chunk::{Chunk, CHUNK_DIMENSION, CHUNK_HEIGHT};

/// Highest terrain surface.
pub const MAX_TERRAIN_HEIGHT: i32 = 96;
/// Lowest terrain surface.
pub const MIN_TERRAIN_HEIGHT: i32 = 24;
/// Horizontal scale of the terrain noise.
pub const TERRAIN_SCALE: f64 = 1.0 / 100.0;
/// Horizontal scale of the mountains noise.
pub const MOUNTAINS_SCALE: f64 = 1.0 / 100.0;
/// Horizontal scale of the tree density noise.
pub const TREES_SCALE: f64 = 1.0 / 500.0;
/// Tree density noise at or below which a tree may grow.
pub const TREE_CHANCE: f32 = 0.40;
/// Trunk height above the first trunk block.
pub const TREE_HEIGHT: i32 = 5;
/// Columns at or below this height are flooded.
pub const WATER_START_HEIGHT: i32 = MIN_TERRAIN_HEIGHT + 4;
/// Top of the water column.
pub const WATER_HEIGHT: i32 = WATER_START_HEIGHT - 1;
/// Scale of the cave noise on every axis.
pub const CAVE_SCALE: f64 = 1.0 / 25.0;
/// Cave threshold right at the surface.
pub const CAVE_MIN_THRESHOLD: f32 = 0.1;
/// Cave threshold at the bottom of the world.
pub const CAVE_MAX_THRESHOLD: f32 = 0.4;
/// Chance that a coal roll turns stone into coal ore.
pub const COAL_ORE_CHANCE: f32 = 0.05;
/// Chance that an iron roll turns stone into iron ore.
pub const IRON_ORE_CHANCE: f32 = 0.01;
/// Carved voxels at or below this height fill with lava.
pub const LAVA_HEIGHT: i32 = 3;

const TERRAIN_OCTAVES: usize = 5;

/// Per-chunk random streams.
struct ChunkRandom {
    bedrock: Rng,
    tree: Rng,
    ore: Rng,
    grass: Rng,
}

/// Generates chunk contents for one world seed.
///
/// The generator holds only immutable state and is shared between generation
/// jobs through an `Arc`.
pub struct ChunkGenerator {
    world_seed: u64,
    registry: Arc<BlockRegistry>,
    terrain_noise: Value,
    mountains_noise: Value,
    tree_noise: OpenSimplex,
    cave_noise: OpenSimplex,
    bedrock_seed: u64,
    tree_seed: u64,
    ore_seed: u64,
    grass_seed: u64,
}

/// Packs a chunk coordinate into the 64-bit value mixed into per-chunk seeds.
fn pack_chunk_position(chunk_x: i32, chunk_z: i32) -> u64 {
    ((chunk_x as u32 as u64) << 32) | chunk_z as u32 as u64
}

impl ChunkGenerator {
    /// Creates a generator for a world seed.
    ///
    /// # Arguments
    /// * `world_seed` - The process-wide world seed
    /// * `registry` - The block catalog the generated ids refer to
    ///
    /// # Returns
    /// A new `ChunkGenerator`
    pub fn new(world_seed: u64, registry: Arc<BlockRegistry>) -> Self {
        let mut seeds = Rng::with_seed(world_seed);
        let mountain_seed = seeds.u64(..);
        let bedrock_seed = seeds.u64(..);
        let tree_seed = seeds.u64(..);
        let cave_seed = seeds.u64(..);
        let ore_seed = seeds.u64(..);
        let grass_seed = seeds.u64(..);

        ChunkGenerator {
            world_seed,
            registry,
            terrain_noise: Value::new(world_seed as u32),
            mountains_noise: Value::new(mountain_seed as u32),
            tree_noise: OpenSimplex::new(tree_seed as u32),
            cave_noise: OpenSimplex::new(cave_seed as u32),
            bedrock_seed,
            tree_seed,
            ore_seed,
            grass_seed,
        }
    }

    /// The world seed this generator was built from.
    pub fn world_seed(&self) -> u64 {
        self.world_seed
    }

    /// The block catalog generated ids refer to.
    pub fn registry(&self) -> &Arc<BlockRegistry> {
        &self.registry
    }

    /// Fills a freshly created chunk.
    ///
    /// The same seed and chunk coordinate always produce byte-identical block
    /// and data arrays.
    ///
    /// # Arguments
    /// * `chunk` - An empty chunk; its position selects the terrain
    pub fn generate(&self, chunk: &mut Chunk) {
        let position = pack_chunk_position(chunk.chunk_x(), chunk.chunk_z());
        let mut random = ChunkRandom {
            bedrock: Rng::with_seed(self.bedrock_seed ^ position),
            tree: Rng::with_seed(self.tree_seed ^ position),
            ore: Rng::with_seed(self.ore_seed ^ position),
            grass: Rng::with_seed(self.grass_seed ^ position),
        };

        self.generate_terrain(chunk, &mut random);
        self.generate_caves(chunk);
        self.exposed_dirt_to_grass(chunk);
        self.generate_trees(chunk, &mut random);
    }

    fn place(&self, chunk: &mut Chunk, x: i32, y: i32, z: i32, block_type: BlockType) {
        chunk.set_block(x, y, z, block_type.id(), &self.registry);
    }

    /// Computes the surface height of a world column.
    ///
    /// # Arguments
    /// * `world_x`, `world_z` - World block coordinates
    ///
    /// # Returns
    /// A height in `MIN_TERRAIN_HEIGHT..=MAX_TERRAIN_HEIGHT`
    pub fn terrain_height(&self, world_x: i32, world_z: i32) -> i32 {
        let noise_x = world_x as f64 * TERRAIN_SCALE;
        let noise_z = world_z as f64 * TERRAIN_SCALE;

        let mut amplitude = 0.5f32;
        let mut frequency = 1.0f64;
        let mut height = 0.0f32;
        for _ in 0..TERRAIN_OCTAVES {
            let sample = self
                .terrain_noise
                .get([noise_x * frequency, noise_z * frequency]) as f32;
            height += (sample + 1.0) * 0.5 * amplitude;
            amplitude /= 2.0;
            frequency *= 2.0;
        }

        let mountains = (self.mountains_noise.get([
            world_x as f64 * MOUNTAINS_SCALE,
            world_z as f64 * MOUNTAINS_SCALE,
        ]) as f32
            + 1.0)
            * 0.5;
        height = (height * mountains).clamp(0.0, 1.0);

        (MIN_TERRAIN_HEIGHT as f32 + height * (MAX_TERRAIN_HEIGHT - MIN_TERRAIN_HEIGHT) as f32)
            .floor() as i32
    }

    fn generate_terrain(&self, chunk: &mut Chunk, random: &mut ChunkRandom) {
        let origin_x = chunk.chunk_x() * CHUNK_DIMENSION;
        let origin_z = chunk.chunk_z() * CHUNK_DIMENSION;

        for x in 0..CHUNK_DIMENSION {
            for z in 0..CHUNK_DIMENSION {
                let height = self.terrain_height(origin_x + x, origin_z + z);

                if height > WATER_START_HEIGHT {
                    self.place(chunk, x, height, z, BlockType::GRASS);
                    for y in height - 2..height {
                        self.place(chunk, x, y, z, BlockType::DIRT);
                    }
                } else {
                    for y in (height..=WATER_HEIGHT).rev() {
                        self.place(chunk, x, y, z, BlockType::WATER);
                    }
                    for y in height - 2..=height {
                        self.place(chunk, x, y, z, BlockType::SAND);
                    }
                }

                for y in 1..height - 2 {
                    let ore = random.ore.u32(0..2);
                    let value = random.ore.f32();
                    let block_type = if ore == 0 && value <= COAL_ORE_CHANCE {
                        BlockType::COAL_ORE
                    } else if ore == 1 && value <= IRON_ORE_CHANCE {
                        BlockType::IRON_ORE
                    } else {
                        BlockType::STONE
                    };
                    self.place(chunk, x, y, z, block_type);
                }

                if random.bedrock.bool() {
                    self.place(chunk, x, 1, z, BlockType::BEDROCK);
                }
                self.place(chunk, x, 0, z, BlockType::BEDROCK);
            }
        }
    }

    /// Finds the topmost voxel of a column that is neither air nor water.
    fn local_terrain_height(chunk: &Chunk, x: i32, z: i32) -> i32 {
        (0..CHUNK_HEIGHT)
            .rev()
            .find(|y| {
                let id = chunk.get_block(x, *y, z);
                id != AIR_ID && id != BlockType::WATER.id()
            })
            .unwrap_or(0)
    }

    /// Samples the cave noise at a world voxel, normalized to `[0, 1]`.
    pub fn cave_sample(&self, world_x: i32, y: i32, world_z: i32) -> f32 {
        let sample = self.cave_noise.get([
            world_x as f64 * CAVE_SCALE,
            y as f64 * CAVE_SCALE,
            world_z as f64 * CAVE_SCALE,
        ]) as f32;
        (sample + 1.0) * 0.5
    }

    /// Returns the carve threshold for a voxel at height `y` under a surface at `terrain_height`.
    pub fn cave_threshold(terrain_height: i32, y: i32) -> f32 {
        let lerp = (terrain_height - y) as f32 / terrain_height as f32;
        CAVE_MAX_THRESHOLD * lerp + CAVE_MIN_THRESHOLD * (1.0 - lerp)
    }

    fn generate_caves(&self, chunk: &mut Chunk) {
        let origin_x = chunk.chunk_x() * CHUNK_DIMENSION;
        let origin_z = chunk.chunk_z() * CHUNK_DIMENSION;
        let uncarvable = [AIR_ID, BlockType::WATER.id(), BlockType::BEDROCK.id()];

        for x in 0..CHUNK_DIMENSION {
            for z in 0..CHUNK_DIMENSION {
                let terrain_height = Self::local_terrain_height(chunk, x, z);
                if terrain_height == 0 {
                    continue;
                }

                for y in 0..=terrain_height {
                    let sample = self.cave_sample(origin_x + x, y, origin_z + z);
                    if sample > Self::cave_threshold(terrain_height, y) {
                        continue;
                    }

                    if uncarvable.contains(&chunk.get_block(x, y, z)) {
                        continue;
                    }

                    if y <= LAVA_HEIGHT {
                        self.place(chunk, x, y, z, BlockType::LAVA);
                    } else {
                        self.place(chunk, x, y, z, BlockType::AIR);
                    }
                }
            }
        }
    }

    fn exposed_dirt_to_grass(&self, chunk: &mut Chunk) {
        let dirt = BlockType::DIRT.id();
        for x in 0..CHUNK_DIMENSION {
            for z in 0..CHUNK_DIMENSION {
                for y in 0..CHUNK_HEIGHT {
                    if chunk.get_block(x, y, z) != dirt {
                        continue;
                    }
                    let above = chunk.get_block(x, y + 1, z);
                    if !self.registry.is_opaque(above) {
                        self.place(chunk, x, y, z, BlockType::GRASS);
                    }
                }
            }
        }
    }

    fn generate_trees(&self, chunk: &mut Chunk, random: &mut ChunkRandom) {
        let origin_x = chunk.chunk_x() * CHUNK_DIMENSION;
        let origin_z = chunk.chunk_z() * CHUNK_DIMENSION;
        let grass = BlockType::GRASS.id();

        for x in 0..CHUNK_DIMENSION {
            for z in 0..CHUNK_DIMENSION {
                let mut grass_y = None;
                for y in (0..CHUNK_HEIGHT).rev() {
                    let id = chunk.get_block(x, y, z);
                    if id == AIR_ID {
                        continue;
                    }
                    if id != grass {
                        break;
                    }
                    grass_y = Some(y);
                }
                let Some(grass_y) = grass_y else {
                    continue;
                };

                let tree_noise = (self.tree_noise.get([
                    (origin_x + x) as f64 * TREES_SCALE,
                    (origin_z + z) as f64 * TREES_SCALE,
                ]) as f32
                    + 1.0)
                    * 0.5;

                let near_edge =
                    x < 2 || z < 2 || x >= CHUNK_DIMENSION - 2 || z >= CHUNK_DIMENSION - 2;
                if near_edge
                    || tree_noise > TREE_CHANCE
                    || random.tree.bool()
                    || random.tree.bool()
                {
                    if grass_y != CHUNK_HEIGHT - 1 && random.grass.bool() && random.grass.bool() {
                        self.place(chunk, x, grass_y + 1, z, BlockType::GRASS_LEAVES);
                    }
                    continue;
                }

                self.generate_tree(chunk, x, grass_y, z);
            }
        }
    }

    /// Checks that an inclusive box is air and lies within the world height.
    fn is_empty(chunk: &Chunk, start: (i32, i32, i32), end: (i32, i32, i32)) -> bool {
        if start.1 < 0 || end.1 >= CHUNK_HEIGHT {
            return false;
        }
        (start.0..=end.0).all(|x| {
            (start.2..=end.2).all(|z| (start.1..=end.1).all(|y| chunk.get_block(x, y, z) == AIR_ID))
        })
    }

    fn fill(
        &self,
        chunk: &mut Chunk,
        start: (i32, i32, i32),
        end: (i32, i32, i32),
        id: BlockTypeSize,
    ) {
        for x in start.0..=end.0 {
            for z in start.2..=end.2 {
                for y in start.1..=end.1 {
                    chunk.set_block(x, y, z, id, &self.registry);
                }
            }
        }
    }

    /// Grows one tree rooted on the grass voxel at `(x, y, z)` if every part fits.
    fn generate_tree(&self, chunk: &mut Chunk, x: i32, y: i32, z: i32) {
        let trunk_start = y + 1;
        let trunk_end = y + 1 + TREE_HEIGHT;

        let trunk = ((x, trunk_start, z), (x, trunk_end, z));
        let canopy = ((x - 2, trunk_end - 2, z - 2), (x + 2, trunk_end, z + 2));
        let cross_x = ((x - 1, trunk_end + 1, z), (x + 1, trunk_end + 1, z));
        let cross_z = ((x, trunk_end + 1, z - 1), (x, trunk_end + 1, z + 1));
        let cap = ((x, trunk_end + 2, z), (x, trunk_end + 3, z));

        let parts = [trunk, canopy, cross_x, cross_z, cap];
        if !parts.iter().all(|(start, end)| Self::is_empty(chunk, *start, *end)) {
            return;
        }

        let foliage = BlockType::FOLIAGE.id();
        for (start, end) in &parts[1..] {
            self.fill(chunk, *start, *end, foliage);
        }
        self.fill(chunk, trunk.0, trunk.1, BlockType::WOOD.id());
        self.place(chunk, x, y, z, BlockType::DIRT);
    }
}
