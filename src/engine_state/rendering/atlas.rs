//! # Texture Atlas Catalog
//!
//! Describes where every named block texture lives inside the texture atlas.
//! The GPU-side atlas image is owned by the renderer; this module only holds
//! the normalized UV rectangles, pixel sizes and blend modes that the block
//! registry and the mesh builder consume.
//!
//! ## Layout Format
//!
//! A layout row names a texture and gives its inclusive pixel corners in image
//! space (origin top-left, Y down) together with a blend mode:
//!
//! ```text
//! name,x0,y0,x1,y1,blend
//! grass_top,0,15,15,0,opaque
//! ```
//!
//! `y0` is the bottom pixel row of the tile and `y1` the top row. Rows can be
//! given as CSV lines or as a JSON document (see [`AtlasLayout`]).

use std::collections::HashMap;
use std::fmt;

use cgmath::Vector2;
use num_derive::FromPrimitive;
use serde::Deserialize;

/// Inset applied to every UV edge so that sampling never bleeds into a neighbouring tile.
pub const ATLAS_EPSILON: f32 = 0.001;

/// Side length in pixels of one tile in the built-in layout.
pub const STANDARD_TILE_SIZE: u32 = 16;

/// Number of frames of every animated strip in the built-in layout.
pub const STANDARD_ANIMATION_FRAMES: u32 = 4;

/// How a texture's alpha channel is treated by the fragment stage.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default, FromPrimitive, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    /// Alpha is ignored.
    #[default]
    Opaque = 0,
    /// Fragments below an alpha cutoff are discarded.
    Tested = 1,
    /// Fragments are alpha blended.
    Blended = 2,
}

impl BlendMode {
    /// Returns the integer tag written into the vertex stream.
    pub fn index(self) -> u32 {
        self as u32
    }

    /// Parses a blend mode name, ignoring case.
    ///
    /// # Arguments
    /// * `name` - One of `opaque`, `tested` or `blended`
    ///
    /// # Returns
    /// The matching `BlendMode`, or `None` for an unknown name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "opaque" => Some(BlendMode::Opaque),
            "tested" => Some(BlendMode::Tested),
            "blended" => Some(BlendMode::Blended),
            _ => None,
        }
    }
}

/// A named rectangle inside the atlas.
///
/// `lower` and `higher` are in atlas-normalized coordinates with the origin at
/// the bottom-left corner, already inset by [`ATLAS_EPSILON`]. `width` and
/// `height` are the tile size in pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct AtlasTexture {
    /// Name the texture is looked up by.
    pub name: String,
    /// Width of the tile in pixels.
    pub width: u32,
    /// Height of the tile in pixels.
    pub height: u32,
    /// Lower UV corner.
    pub lower: Vector2<f32>,
    /// Upper UV corner.
    pub higher: Vector2<f32>,
    /// Blend mode tag.
    pub blend_mode: BlendMode,
}

/// A single layout row in pixel space, before normalization.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AtlasLayoutEntry {
    /// Texture name.
    pub name: String,
    /// Left pixel column (inclusive).
    pub x0: f32,
    /// Bottom pixel row in image space (inclusive).
    pub y0: f32,
    /// Right pixel column (inclusive).
    pub x1: f32,
    /// Top pixel row in image space (inclusive).
    pub y1: f32,
    /// Blend mode of the texture.
    #[serde(default)]
    pub blend: BlendMode,
}

/// A complete layout description as stored in a JSON layout file.
#[derive(Clone, Debug, Deserialize)]
pub struct AtlasLayout {
    /// Atlas width in pixels.
    pub width: u32,
    /// Atlas height in pixels.
    pub height: u32,
    /// Every texture row.
    pub textures: Vec<AtlasLayoutEntry>,
}

/// Errors raised while building an atlas catalog.
#[derive(Debug)]
pub enum AtlasError {
    /// The atlas has a zero dimension.
    InvalidDimensions {
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// Two rows share one name.
    DuplicateTexture(String),
    /// A CSV row could not be parsed.
    MalformedRow {
        /// One-based line number.
        line: usize,
        /// Description of the problem.
        reason: String,
    },
    /// The JSON layout could not be decoded.
    Json(serde_json::Error),
}

impl fmt::Display for AtlasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtlasError::InvalidDimensions { width, height } => {
                write!(f, "invalid atlas dimensions {}x{}", width, height)
            }
            AtlasError::DuplicateTexture(name) => write!(f, "duplicate atlas texture '{}'", name),
            AtlasError::MalformedRow { line, reason } => {
                write!(f, "malformed atlas row at line {}: {}", line, reason)
            }
            AtlasError::Json(err) => write!(f, "invalid atlas layout: {}", err),
        }
    }
}

impl std::error::Error for AtlasError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AtlasError::Json(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for AtlasError {
    fn from(err: serde_json::Error) -> Self {
        AtlasError::Json(err)
    }
}

/// The catalog of every texture in the atlas, keyed by name.
#[derive(Clone, Debug)]
pub struct Atlas {
    width: u32,
    height: u32,
    textures: HashMap<String, AtlasTexture>,
}

impl Atlas {
    /// Builds a catalog from pixel-space layout rows.
    ///
    /// # Arguments
    /// * `width` - Atlas width in pixels
    /// * `height` - Atlas height in pixels
    /// * `entries` - Layout rows
    ///
    /// # Returns
    /// The catalog, or an error for a zero-sized atlas or a duplicated name
    pub fn from_layout(
        width: u32,
        height: u32,
        entries: impl IntoIterator<Item = AtlasLayoutEntry>,
    ) -> Result<Self, AtlasError> {
        if width == 0 || height == 0 {
            return Err(AtlasError::InvalidDimensions { width, height });
        }

        let mut textures = HashMap::new();
        for entry in entries {
            let texture = Self::normalize(width, height, &entry);
            if textures.insert(entry.name.clone(), texture).is_some() {
                return Err(AtlasError::DuplicateTexture(entry.name));
            }
        }

        Ok(Atlas {
            width,
            height,
            textures,
        })
    }

    /// Builds a catalog from a JSON [`AtlasLayout`] document.
    pub fn from_json(json: &str) -> Result<Self, AtlasError> {
        let layout: AtlasLayout = serde_json::from_str(json)?;
        Self::from_layout(layout.width, layout.height, layout.textures)
    }

    /// Builds a catalog from CSV rows of the form `name,x0,y0,x1,y1,blend`.
    ///
    /// Blank lines are skipped.
    ///
    /// # Arguments
    /// * `width` - Atlas width in pixels
    /// * `height` - Atlas height in pixels
    /// * `csv` - The CSV text
    pub fn from_csv(width: u32, height: u32, csv: &str) -> Result<Self, AtlasError> {
        let mut entries = Vec::new();
        for (index, line) in csv.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            entries.push(Self::parse_csv_row(index + 1, line)?);
        }
        Self::from_layout(width, height, entries)
    }

    fn parse_csv_row(line: usize, row: &str) -> Result<AtlasLayoutEntry, AtlasError> {
        let malformed = |reason: String| AtlasError::MalformedRow { line, reason };

        let fields: Vec<&str> = row.split(',').map(str::trim).collect();
        if fields.len() != 6 {
            return Err(malformed(format!("expected 6 fields, found {}", fields.len())));
        }

        let mut corners = [0.0f32; 4];
        for (corner, field) in corners.iter_mut().zip(&fields[1..5]) {
            *corner = field
                .parse()
                .map_err(|_| malformed(format!("'{}' is not a number", field)))?;
        }

        let blend = BlendMode::from_name(fields[5])
            .ok_or_else(|| malformed(format!("unknown blend mode '{}'", fields[5])))?;

        Ok(AtlasLayoutEntry {
            name: fields[0].to_string(),
            x0: corners[0],
            y0: corners[1],
            x1: corners[2],
            y1: corners[3],
            blend,
        })
    }

    /// Converts inclusive pixel corners into an inset, flipped, normalized rectangle.
    fn normalize(width: u32, height: u32, entry: &AtlasLayoutEntry) -> AtlasTexture {
        let atlas_width = width as f32;
        let atlas_height = height as f32;

        let mut lower_x = entry.x0;
        let mut lower_y = entry.y0 + 1.0;
        let mut higher_x = entry.x1 + 1.0;
        let mut higher_y = entry.y1;

        let texture_width = (higher_x - lower_x).round().abs() as u32;
        let texture_height = (higher_y - lower_y).round().abs() as u32;

        higher_y += ATLAS_EPSILON;
        lower_y -= ATLAS_EPSILON;
        lower_x += ATLAS_EPSILON;
        higher_x -= ATLAS_EPSILON;

        lower_y = atlas_height - lower_y;
        higher_y = atlas_height - higher_y;

        AtlasTexture {
            name: entry.name.clone(),
            width: texture_width,
            height: texture_height,
            lower: Vector2::new(lower_x / atlas_width, lower_y / atlas_height),
            higher: Vector2::new(higher_x / atlas_width, higher_y / atlas_height),
            blend_mode: entry.blend,
        }
    }

    /// Builds the built-in layout covering every texture of the standard block catalog.
    ///
    /// Tiles are 16 pixels square on an 8-column grid. Animated textures occupy
    /// a horizontal strip of four consecutive tiles, the `_start` entry naming
    /// the first tile and the `_end` entry the last.
    pub fn standard() -> Self {
        let tile = STANDARD_TILE_SIZE as f32;
        let mut entries = Vec::new();

        let mut push = |name: &str, column: u32, row: u32, blend: BlendMode| {
            let x = column as f32 * tile;
            let y = row as f32 * tile;
            entries.push(AtlasLayoutEntry {
                name: name.to_string(),
                x0: x,
                y0: y + tile - 1.0,
                x1: x + tile - 1.0,
                y1: y,
                blend,
            });
        };

        let still = [
            ("dirt", BlendMode::Opaque),
            ("grass_top", BlendMode::Opaque),
            ("grass_side", BlendMode::Opaque),
            ("stone", BlendMode::Opaque),
            ("sand", BlendMode::Opaque),
            ("bedrock", BlendMode::Opaque),
            ("glass", BlendMode::Tested),
            ("wood_topbottom", BlendMode::Opaque),
            ("wood_side", BlendMode::Opaque),
            ("planks", BlendMode::Opaque),
            ("foliage", BlendMode::Tested),
            ("coal_ore", BlendMode::Opaque),
            ("iron_ore", BlendMode::Opaque),
            ("glass_red", BlendMode::Blended),
            ("glass_green", BlendMode::Blended),
            ("glass_blue", BlendMode::Blended),
            ("grass_leaves", BlendMode::Tested),
            ("lantern", BlendMode::Opaque),
        ];
        for (index, (name, blend)) in still.iter().enumerate() {
            let index = index as u32;
            push(name, index % 8, index / 8, *blend);
        }

        let animated = [
            ("water_side", BlendMode::Blended),
            ("water_top", BlendMode::Blended),
            ("lava_side", BlendMode::Opaque),
            ("lava_top", BlendMode::Opaque),
        ];
        let first_animated_row = (still.len() as u32).div_ceil(8);
        for (index, (name, blend)) in animated.iter().enumerate() {
            let row = first_animated_row + index as u32;
            push(&format!("{}_start", name), 0, row, *blend);
            push(&format!("{}_end", name), STANDARD_ANIMATION_FRAMES - 1, row, *blend);
        }

        let rows = first_animated_row + animated.len() as u32;
        let width = 8 * STANDARD_TILE_SIZE;
        let height = rows.next_power_of_two() * STANDARD_TILE_SIZE;

        let mut textures = HashMap::new();
        for entry in entries {
            textures.insert(entry.name.clone(), Self::normalize(width, height, &entry));
        }

        Atlas {
            width,
            height,
            textures,
        }
    }

    /// Atlas width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Atlas height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Looks up a texture by name.
    pub fn texture(&self, name: &str) -> Option<&AtlasTexture> {
        self.textures.get(name)
    }

    /// Number of textures in the catalog.
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str, x0: f32, y0: f32, x1: f32, y1: f32) -> AtlasLayoutEntry {
        AtlasLayoutEntry {
            name: name.to_string(),
            x0,
            y0,
            x1,
            y1,
            blend: BlendMode::Opaque,
        }
    }

    #[test]
    fn pixel_corners_become_inset_normalized_rectangle() {
        let atlas = Atlas::from_layout(64, 32, vec![entry("tile", 16.0, 15.0, 31.0, 0.0)]).unwrap();
        let tile = atlas.texture("tile").unwrap();

        assert_eq!(tile.width, 16);
        assert_eq!(tile.height, 16);
        assert!((tile.lower.x - (16.0 + ATLAS_EPSILON) / 64.0).abs() < 1e-6);
        assert!((tile.higher.x - (32.0 - ATLAS_EPSILON) / 64.0).abs() < 1e-6);
        // Image row 0 is the top of the atlas, so the tile sits in the upper half.
        assert!((tile.lower.y - (16.0 + ATLAS_EPSILON) / 32.0).abs() < 1e-6);
        assert!((tile.higher.y - (32.0 - ATLAS_EPSILON) / 32.0).abs() < 1e-6);
    }

    #[test]
    fn csv_rows_are_parsed() {
        let csv = "dirt,0,15,15,0,opaque\n\nglass,16,15,31,0,Tested\n";
        let atlas = Atlas::from_csv(32, 16, csv).unwrap();
        assert_eq!(atlas.len(), 2);
        assert_eq!(atlas.texture("glass").unwrap().blend_mode, BlendMode::Tested);
    }

    #[test]
    fn malformed_csv_reports_line() {
        let err = Atlas::from_csv(32, 16, "dirt,0,15,15,0,opaque\nbad,row").unwrap_err();
        assert!(matches!(err, AtlasError::MalformedRow { line: 2, .. }));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = Atlas::from_layout(
            32,
            16,
            vec![entry("a", 0.0, 15.0, 15.0, 0.0), entry("a", 16.0, 15.0, 31.0, 0.0)],
        )
        .unwrap_err();
        assert!(matches!(err, AtlasError::DuplicateTexture(name) if name == "a"));
    }

    #[test]
    fn json_layout_loads() {
        let json = r#"{
            "width": 32, "height": 16,
            "textures": [
                { "name": "water_top_start", "x0": 0, "y0": 15, "x1": 15, "y1": 0, "blend": "blended" },
                { "name": "stone", "x0": 16, "y0": 15, "x1": 31, "y1": 0 }
            ]
        }"#;
        let atlas = Atlas::from_json(json).unwrap();
        assert_eq!(atlas.texture("water_top_start").unwrap().blend_mode, BlendMode::Blended);
        assert_eq!(atlas.texture("stone").unwrap().blend_mode, BlendMode::Opaque);
    }

    #[test]
    fn standard_layout_animated_strip_spans_four_tiles() {
        let atlas = Atlas::standard();
        let start = atlas.texture("water_side_start").unwrap();
        let end = atlas.texture("water_side_end").unwrap();

        let start_px = (start.lower.x * atlas.width() as f32) as i32;
        let end_px = (end.higher.x * atlas.width() as f32) as i32;
        assert_eq!((end_px - start_px + 1) as u32 / start.width, STANDARD_ANIMATION_FRAMES);
    }
}
