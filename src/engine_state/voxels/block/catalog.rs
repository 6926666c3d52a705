//! The standard block catalog.

use super::block_type::BlockType;
use super::BlockDescriptor;
use crate::engine_state::voxels::chunk::MAX_LIGHT_LEVEL;

fn id(block_type: BlockType) -> i32 {
    block_type as i32
}

/// Returns the descriptors of every standard block, in id order.
pub fn standard_descriptors() -> Vec<BlockDescriptor> {
    let water_start = [
        "water_side_start",
        "water_side_start",
        "water_top_start",
        "water_top_start",
        "water_side_start",
        "water_side_start",
    ];
    let water_end = [
        "water_side_end",
        "water_side_end",
        "water_top_end",
        "water_top_end",
        "water_side_end",
        "water_side_end",
    ];
    let lava_start = [
        "lava_side_start",
        "lava_side_start",
        "lava_top_start",
        "lava_top_start",
        "lava_side_start",
        "lava_side_start",
    ];
    let lava_end = [
        "lava_side_end",
        "lava_side_end",
        "lava_top_end",
        "lava_top_end",
        "lava_side_end",
        "lava_side_end",
    ];

    vec![
        BlockDescriptor::uniform(id(BlockType::DIRT), "dirt", "dirt"),
        BlockDescriptor::top_side_bottom(
            id(BlockType::GRASS),
            "grass",
            "grass_top",
            "grass_side",
            "dirt",
        ),
        BlockDescriptor::uniform(id(BlockType::STONE), "stone", "stone"),
        BlockDescriptor::uniform(id(BlockType::SAND), "sand", "sand"),
        BlockDescriptor::uniform(id(BlockType::BEDROCK), "bedrock", "bedrock"),
        BlockDescriptor::uniform(id(BlockType::GLASS), "glass", "glass").transparent(),
        BlockDescriptor::top_bottom_side(id(BlockType::WOOD), "wood", "wood_topbottom", "wood_side"),
        BlockDescriptor::uniform(id(BlockType::PLANKS), "planks", "planks"),
        BlockDescriptor::uniform(id(BlockType::FOLIAGE), "foliage", "foliage"),
        BlockDescriptor::uniform(id(BlockType::COAL_ORE), "coal_ore", "coal_ore"),
        BlockDescriptor::uniform(id(BlockType::IRON_ORE), "iron_ore", "iron_ore"),
        BlockDescriptor::uniform(id(BlockType::GLASS_RED), "glass_red", "glass_red")
            .transparent()
            .alpha_enabled(),
        BlockDescriptor::uniform(id(BlockType::GLASS_GREEN), "glass_green", "glass_green")
            .transparent()
            .alpha_enabled(),
        BlockDescriptor::uniform(id(BlockType::GLASS_BLUE), "glass_blue", "glass_blue")
            .transparent()
            .alpha_enabled(),
        BlockDescriptor::animated(id(BlockType::WATER), "water", water_start, water_end)
            .transparent()
            .alpha_enabled()
            .no_collision()
            .liquid()
            .overlay("water_top_start"),
        BlockDescriptor::animated(id(BlockType::LAVA), "lava", lava_start, lava_end)
            .light_emission(MAX_LIGHT_LEVEL)
            .transparent()
            .no_collision()
            .liquid()
            .overlay("lava_top_start"),
        BlockDescriptor::billboard(id(BlockType::GRASS_LEAVES), "grass_leaves", "grass_leaves")
            .transparent()
            .no_collision(),
        BlockDescriptor::uniform(id(BlockType::LANTERN), "lantern", "lantern")
            .light_emission(MAX_LIGHT_LEVEL),
    ]
}
