//! # Block Module
//!
//! This module provides the block catalog of the voxel engine: the immutable
//! description of every block kind (textures, flags, light emission, shape) and
//! the registry that maps stored block ids to those descriptions.
//!
//! The registry is built once at startup through [`BlockRegistryBuilder`] and
//! then shared read-only (`Arc<BlockRegistry>`) with the generator, the
//! lighting solver and the mesh builder.

use std::fmt;
use std::sync::Arc;

use block_type::BlockType;

use crate::engine_state::rendering::atlas::{Atlas, AtlasTexture};
use crate::engine_state::voxels::chunk::MAX_LIGHT_LEVEL;

pub mod block_side;
pub mod block_type;
pub mod catalog;

/// The underlying integer type used to represent block types in memory.
pub type BlockTypeSize = u8;

/// The stored id of air, the absence of a block.
pub const AIR_ID: BlockTypeSize = 0;

/// Number of texture slots per block: six faces, each with a start and an end frame.
pub const TEXTURE_SLOTS: usize = 12;

/// How a block kind turns into geometry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum BlockShape {
    /// A unit cube with six culled faces.
    #[default]
    Cube,
    /// Two crossed, double sided quads that are never culled.
    Billboard,
}

/// A block kind description that still refers to textures by name.
///
/// Descriptors are resolved against an [`Atlas`] when they are registered.
/// The constructors mirror the common texture layouts of a block.
///
/// # Examples
/// ```
/// use voxel_world::engine_state::voxels::block::BlockDescriptor;
///
/// let water = BlockDescriptor::uniform(15, "water", "water_side_start")
///     .transparent()
///     .alpha_enabled()
///     .no_collision()
///     .liquid();
/// assert_eq!(water.id, 15);
/// ```
#[derive(Clone, Debug)]
pub struct BlockDescriptor {
    /// Requested id. Must lie in `1..=255`.
    pub id: i32,
    /// Block name.
    pub name: String,
    /// Texture names in slot order (-X, +X, -Y, +Y, -Z, +Z, then the end frames).
    pub textures: [Option<String>; TEXTURE_SLOTS],
    /// Whether light and neighbouring faces pass through the block.
    pub transparent: bool,
    /// Whether the block is drawn in the translucent stream.
    pub alpha_enabled: bool,
    /// Whether the block is collidable.
    pub collision: bool,
    /// Whether the block is a liquid.
    pub liquid: bool,
    /// Light emitted by the block, `0..=MAX_LIGHT_LEVEL`.
    pub light_emission: u8,
    /// Full screen tint texture used when the viewer's eye is inside the block.
    pub overlay: Option<String>,
    /// Auxiliary byte written whenever the block is placed.
    pub default_data: u8,
    /// Geometry shape.
    pub shape: BlockShape,
}

impl BlockDescriptor {
    /// Creates a descriptor with six start and six end frame textures.
    pub fn animated(id: i32, name: &str, start: [&str; 6], end: [&str; 6]) -> Self {
        let mut textures: [Option<String>; TEXTURE_SLOTS] = Default::default();
        for (slot, texture) in start.iter().chain(end.iter()).enumerate() {
            textures[slot] = Some(texture.to_string());
        }
        Self::with_textures(id, name, textures)
    }

    /// Creates a descriptor with one texture per face.
    ///
    /// # Arguments
    /// * `id` - Block id
    /// * `name` - Block name
    /// * `faces` - Textures in the order -X, +X, -Y, +Y, -Z, +Z
    pub fn six_faces(id: i32, name: &str, faces: [&str; 6]) -> Self {
        let mut textures: [Option<String>; TEXTURE_SLOTS] = Default::default();
        for (slot, texture) in faces.iter().enumerate() {
            textures[slot] = Some(texture.to_string());
        }
        Self::with_textures(id, name, textures)
    }

    /// Creates a descriptor with distinct top, side and bottom textures.
    pub fn top_side_bottom(id: i32, name: &str, top: &str, side: &str, bottom: &str) -> Self {
        Self::six_faces(id, name, [side, side, bottom, top, side, side])
    }

    /// Creates a descriptor sharing one texture between top and bottom.
    pub fn top_bottom_side(id: i32, name: &str, top_bottom: &str, side: &str) -> Self {
        Self::top_side_bottom(id, name, top_bottom, side, top_bottom)
    }

    /// Creates a descriptor using one texture for every face.
    pub fn uniform(id: i32, name: &str, texture: &str) -> Self {
        Self::top_bottom_side(id, name, texture, texture)
    }

    /// Creates a billboard descriptor. Billboards read their texture from slot 0.
    pub fn billboard(id: i32, name: &str, texture: &str) -> Self {
        let mut descriptor = Self::uniform(id, name, texture);
        descriptor.shape = BlockShape::Billboard;
        descriptor
    }

    fn with_textures(id: i32, name: &str, textures: [Option<String>; TEXTURE_SLOTS]) -> Self {
        BlockDescriptor {
            id,
            name: name.to_string(),
            textures,
            transparent: false,
            alpha_enabled: false,
            collision: true,
            liquid: false,
            light_emission: 0,
            overlay: None,
            default_data: 0,
            shape: BlockShape::Cube,
        }
    }

    /// Marks the block as transparent.
    pub fn transparent(mut self) -> Self {
        self.transparent = true;
        self
    }

    /// Draws the block in the translucent stream.
    pub fn alpha_enabled(mut self) -> Self {
        self.alpha_enabled = true;
        self
    }

    /// Disables collision.
    pub fn no_collision(mut self) -> Self {
        self.collision = false;
        self
    }

    /// Marks the block as a liquid.
    pub fn liquid(mut self) -> Self {
        self.liquid = true;
        self
    }

    /// Sets the emitted light level.
    pub fn light_emission(mut self, level: u8) -> Self {
        self.light_emission = level;
        self
    }

    /// Sets the overlay texture.
    pub fn overlay(mut self, texture: &str) -> Self {
        self.overlay = Some(texture.to_string());
        self
    }

    /// Sets the auxiliary byte written on placement.
    pub fn default_data(mut self, data: u8) -> Self {
        self.default_data = data;
        self
    }
}

/// An immutable, fully resolved block kind.
#[derive(Clone, Debug)]
pub struct BlockKind {
    id: BlockTypeSize,
    name: String,
    textures: [Option<AtlasTexture>; TEXTURE_SLOTS],
    transparent: bool,
    alpha_enabled: bool,
    collision: bool,
    liquid: bool,
    light_emission: u8,
    overlay: Option<AtlasTexture>,
    default_data: u8,
    shape: BlockShape,
}

impl BlockKind {
    /// Stored id of the kind.
    pub fn id(&self) -> BlockTypeSize {
        self.id
    }

    /// Name of the kind.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the texture in a slot, if one is assigned.
    ///
    /// # Arguments
    /// * `slot` - Slot index in `0..TEXTURE_SLOTS`
    pub fn texture(&self, slot: usize) -> Option<&AtlasTexture> {
        self.textures.get(slot).and_then(Option::as_ref)
    }

    /// Whether light and neighbouring faces pass through the block.
    pub fn is_transparent(&self) -> bool {
        self.transparent
    }

    /// Whether the block goes into the translucent stream.
    pub fn is_alpha_enabled(&self) -> bool {
        self.alpha_enabled
    }

    /// Whether the block is collidable.
    pub fn has_collision(&self) -> bool {
        self.collision
    }

    /// Whether the block is a liquid.
    pub fn is_liquid(&self) -> bool {
        self.liquid
    }

    /// Light emitted by the block.
    pub fn light_emission(&self) -> u8 {
        self.light_emission
    }

    /// Overlay texture shown while the viewer's eye is inside the block.
    pub fn overlay(&self) -> Option<&AtlasTexture> {
        self.overlay.as_ref()
    }

    /// Auxiliary byte written on placement.
    pub fn default_data(&self) -> u8 {
        self.default_data
    }

    /// Geometry shape.
    pub fn shape(&self) -> BlockShape {
        self.shape
    }
}

/// Fatal errors raised while building a [`BlockRegistry`].
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryError {
    /// The id is not in `1..=255`. Id 0 is reserved for air.
    InvalidId(i32),
    /// Another kind already uses the id.
    DuplicateId(BlockTypeSize),
    /// A texture name is not present in the atlas.
    UnknownTexture {
        /// Block name.
        block: String,
        /// Missing texture name.
        texture: String,
    },
    /// A face has no start frame texture.
    MissingTexture {
        /// Block name.
        block: String,
        /// Empty slot.
        slot: usize,
    },
    /// The light emission exceeds the maximum light level.
    InvalidEmission {
        /// Block name.
        block: String,
        /// Requested emission.
        level: u8,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::InvalidId(id) => write!(f, "invalid block id {}", id),
            RegistryError::DuplicateId(id) => write!(f, "block id {} registered twice", id),
            RegistryError::UnknownTexture { block, texture } => {
                write!(f, "block '{}' references unknown texture '{}'", block, texture)
            }
            RegistryError::MissingTexture { block, slot } => {
                write!(f, "block '{}' has no texture in slot {}", block, slot)
            }
            RegistryError::InvalidEmission { block, level } => write!(
                f,
                "block '{}' emits light {} above the maximum of {}",
                block, level, MAX_LIGHT_LEVEL
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

/// Collects block descriptors and resolves them into a [`BlockRegistry`].
pub struct BlockRegistryBuilder<'a> {
    atlas: &'a Atlas,
    kinds: Vec<Option<BlockKind>>,
}

impl<'a> BlockRegistryBuilder<'a> {
    /// Creates a builder resolving textures against `atlas`.
    pub fn new(atlas: &'a Atlas) -> Self {
        BlockRegistryBuilder {
            atlas,
            kinds: vec![None; BlockTypeSize::MAX as usize + 1],
        }
    }

    /// Resolves and registers one descriptor.
    ///
    /// # Arguments
    /// * `descriptor` - The block kind to add
    ///
    /// # Returns
    /// The builder, or the first validation failure
    pub fn register(mut self, descriptor: BlockDescriptor) -> Result<Self, RegistryError> {
        let id = BlockTypeSize::try_from(descriptor.id)
            .ok()
            .filter(|id| *id != AIR_ID)
            .ok_or(RegistryError::InvalidId(descriptor.id))?;

        if self.kinds[id as usize].is_some() {
            return Err(RegistryError::DuplicateId(id));
        }

        if descriptor.light_emission > MAX_LIGHT_LEVEL {
            return Err(RegistryError::InvalidEmission {
                block: descriptor.name,
                level: descriptor.light_emission,
            });
        }

        let mut textures: [Option<AtlasTexture>; TEXTURE_SLOTS] = Default::default();
        for (slot, name) in descriptor.textures.iter().enumerate() {
            textures[slot] = match name {
                Some(name) => Some(self.resolve(&descriptor.name, name)?),
                None => None,
            };
        }

        let required_slots = match descriptor.shape {
            BlockShape::Cube => 6,
            BlockShape::Billboard => 1,
        };
        if let Some(slot) = (0..required_slots).find(|slot| textures[*slot].is_none()) {
            return Err(RegistryError::MissingTexture {
                block: descriptor.name,
                slot,
            });
        }

        let overlay = match &descriptor.overlay {
            Some(name) => Some(self.resolve(&descriptor.name, name)?),
            None => None,
        };

        self.kinds[id as usize] = Some(BlockKind {
            id,
            name: descriptor.name,
            textures,
            transparent: descriptor.transparent,
            alpha_enabled: descriptor.alpha_enabled,
            collision: descriptor.collision,
            liquid: descriptor.liquid,
            light_emission: descriptor.light_emission,
            overlay,
            default_data: descriptor.default_data,
            shape: descriptor.shape,
        });

        Ok(self)
    }

    fn resolve(&self, block: &str, texture: &str) -> Result<AtlasTexture, RegistryError> {
        self.atlas
            .texture(texture)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownTexture {
                block: block.to_string(),
                texture: texture.to_string(),
            })
    }

    /// Finishes construction. The registry can no longer change afterwards.
    pub fn build(self) -> BlockRegistry {
        BlockRegistry {
            kinds: self.kinds,
            atlas_width: self.atlas.width(),
        }
    }
}

/// The immutable catalog mapping stored block ids to block kinds.
#[derive(Debug)]
pub struct BlockRegistry {
    kinds: Vec<Option<BlockKind>>,
    atlas_width: u32,
}

impl BlockRegistry {
    /// Builds the standard catalog against `atlas`.
    ///
    /// # Returns
    /// A shared registry, or the first registration failure
    pub fn standard(atlas: &Atlas) -> Result<Arc<BlockRegistry>, RegistryError> {
        let mut builder = BlockRegistryBuilder::new(atlas);
        for descriptor in catalog::standard_descriptors() {
            builder = builder.register(descriptor)?;
        }
        let registry = builder.build();
        log::info!("Block registry initialized with {} kinds", registry.len());
        Ok(Arc::new(registry))
    }

    /// Looks a kind up by stored id. Air and unregistered ids yield `None`.
    pub fn get(&self, id: BlockTypeSize) -> Option<&BlockKind> {
        self.kinds[id as usize].as_ref()
    }

    /// Looks a standard kind up.
    pub fn get_type(&self, block_type: BlockType) -> Option<&BlockKind> {
        self.get(block_type.id())
    }

    /// Whether the id blocks light and hides neighbouring faces.
    ///
    /// Unregistered non-air ids count as opaque.
    pub fn is_opaque(&self, id: BlockTypeSize) -> bool {
        id != AIR_ID && self.get(id).map_or(true, |kind| !kind.is_transparent())
    }

    /// Light emitted by the block with this id; air and unknown ids emit nothing.
    pub fn light_emission(&self, id: BlockTypeSize) -> u8 {
        self.get(id).map_or(0, BlockKind::light_emission)
    }

    /// Auxiliary byte written when the id is placed; air writes 0.
    pub fn default_data(&self, id: BlockTypeSize) -> u8 {
        self.get(id).map_or(0, BlockKind::default_data)
    }

    /// Width in pixels of the atlas the textures were resolved against.
    pub fn atlas_width(&self) -> u32 {
        self.atlas_width
    }

    /// Iterates over every registered kind in id order.
    pub fn iter(&self) -> impl Iterator<Item = &BlockKind> {
        self.kinds.iter().flatten()
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.iter().count()
    }

    /// Whether no kind is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::block_side::BlockSide;
    use super::*;

    #[test]
    fn standard_catalog_has_expected_flags() {
        let registry = BlockRegistry::standard(&Atlas::standard()).unwrap();
        assert_eq!(registry.len(), 18);

        let water = registry.get_type(BlockType::WATER).unwrap();
        assert!(water.is_transparent() && water.is_alpha_enabled() && water.is_liquid());
        assert!(!water.has_collision());
        assert_eq!(water.overlay().unwrap().name, "water_top_start");
        assert_eq!(water.texture(BlockSide::TOP.end_slot()).unwrap().name, "water_top_end");

        let lava = registry.get_type(BlockType::LAVA).unwrap();
        assert_eq!(lava.light_emission(), MAX_LIGHT_LEVEL);
        assert!(!lava.is_alpha_enabled());

        let grass = registry.get_type(BlockType::GRASS).unwrap();
        assert_eq!(grass.texture(BlockSide::TOP.start_slot()).unwrap().name, "grass_top");
        assert_eq!(grass.texture(BlockSide::BOTTOM.start_slot()).unwrap().name, "dirt");
        assert_eq!(grass.texture(BlockSide::LEFT.start_slot()).unwrap().name, "grass_side");
        assert!(grass.texture(BlockSide::LEFT.end_slot()).is_none());

        let leaves = registry.get_type(BlockType::GRASS_LEAVES).unwrap();
        assert_eq!(leaves.shape(), BlockShape::Billboard);

        assert!(registry.is_opaque(BlockType::FOLIAGE.id()));
        assert!(!registry.is_opaque(BlockType::GLASS.id()));
        assert!(!registry.is_opaque(AIR_ID));
    }

    #[test]
    fn air_id_is_rejected() {
        let atlas = Atlas::standard();
        let err = BlockRegistryBuilder::new(&atlas)
            .register(BlockDescriptor::uniform(0, "nothing", "dirt"))
            .err();
        assert_eq!(err, Some(RegistryError::InvalidId(0)));

        let err = BlockRegistryBuilder::new(&atlas)
            .register(BlockDescriptor::uniform(-3, "negative", "dirt"))
            .err();
        assert_eq!(err, Some(RegistryError::InvalidId(-3)));
    }

    #[test]
    fn duplicate_and_unknown_textures_are_rejected() {
        let atlas = Atlas::standard();
        let err = BlockRegistryBuilder::new(&atlas)
            .register(BlockDescriptor::uniform(1, "dirt", "dirt"))
            .and_then(|b| b.register(BlockDescriptor::uniform(1, "again", "dirt")))
            .err();
        assert_eq!(err, Some(RegistryError::DuplicateId(1)));

        let err = BlockRegistryBuilder::new(&atlas)
            .register(BlockDescriptor::uniform(40, "marble", "marble"))
            .err();
        assert!(matches!(err, Some(RegistryError::UnknownTexture { .. })));
    }

    #[test]
    fn emission_above_maximum_is_rejected() {
        let atlas = Atlas::standard();
        let err = BlockRegistryBuilder::new(&atlas)
            .register(BlockDescriptor::uniform(40, "sun", "lantern").light_emission(17))
            .err();
        assert!(matches!(err, Some(RegistryError::InvalidEmission { level: 17, .. })));
    }
}
