//! # Block Type Module
//!
//! This module enumerates the standard block catalog and provides conversion
//! between block types, their stored ids and their names.

use num_derive::FromPrimitive;
use phf::phf_map;

use super::BlockTypeSize;

/// Enumerates the standard block types of the voxel world.
///
/// The discriminant is the id stored in chunk block arrays. The `FromPrimitive`
/// derive allows converting a stored id back into a type.
#[allow(non_camel_case_types)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, FromPrimitive)]
pub enum BlockType {
    /// The absence of a block.
    AIR = 0,
    /// Plain dirt.
    DIRT = 1,
    /// Dirt with a grass top.
    GRASS = 2,
    /// Stone, the bulk of the underground.
    STONE = 3,
    /// Sand, found on beaches and under water.
    SAND = 4,
    /// Indestructible floor of the world.
    BEDROCK = 5,
    /// Clear glass.
    GLASS = 6,
    /// Tree trunk.
    WOOD = 7,
    /// Wooden planks.
    PLANKS = 8,
    /// Tree canopy.
    FOLIAGE = 9,
    /// Stone with coal.
    COAL_ORE = 10,
    /// Stone with iron.
    IRON_ORE = 11,
    /// Red tinted glass.
    GLASS_RED = 12,
    /// Green tinted glass.
    GLASS_GREEN = 13,
    /// Blue tinted glass.
    GLASS_BLUE = 14,
    /// Animated water.
    WATER = 15,
    /// Animated, light emitting lava.
    LAVA = 16,
    /// Decorative billboard grass.
    GRASS_LEAVES = 17,
    /// Light emitting lantern.
    LANTERN = 18,
}

static BLOCK_NAMES: phf::Map<&'static str, BlockType> = phf_map! {
    "air" => BlockType::AIR,
    "dirt" => BlockType::DIRT,
    "grass" => BlockType::GRASS,
    "stone" => BlockType::STONE,
    "sand" => BlockType::SAND,
    "bedrock" => BlockType::BEDROCK,
    "glass" => BlockType::GLASS,
    "wood" => BlockType::WOOD,
    "planks" => BlockType::PLANKS,
    "foliage" => BlockType::FOLIAGE,
    "coal_ore" => BlockType::COAL_ORE,
    "iron_ore" => BlockType::IRON_ORE,
    "glass_red" => BlockType::GLASS_RED,
    "glass_green" => BlockType::GLASS_GREEN,
    "glass_blue" => BlockType::GLASS_BLUE,
    "water" => BlockType::WATER,
    "lava" => BlockType::LAVA,
    "grass_leaves" => BlockType::GRASS_LEAVES,
    "lantern" => BlockType::LANTERN,
};

impl BlockType {
    /// Returns the id stored in chunk block arrays.
    pub fn id(self) -> BlockTypeSize {
        self as BlockTypeSize
    }

    /// Converts a stored id to a `BlockType`.
    ///
    /// # Arguments
    /// * `btype` - The block id as a `BlockTypeSize`
    ///
    /// # Returns
    /// The corresponding `BlockType`, or `None` for an id outside the standard catalog
    pub fn from_id(btype: BlockTypeSize) -> Option<Self> {
        num::FromPrimitive::from_u8(btype)
    }

    /// Looks a standard block type up by its lowercase name.
    pub fn from_name(name: &str) -> Option<Self> {
        BLOCK_NAMES.get(name).copied()
    }

    /// Returns the lowercase name of this block type.
    pub fn name(self) -> &'static str {
        BLOCK_NAMES
            .entries()
            .find(|(_, block_type)| **block_type == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }
}
