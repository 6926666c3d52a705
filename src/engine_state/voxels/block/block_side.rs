//! # Block Side Module
//!
//! This module defines the six faces of a voxel block and the per-face
//! geometry helpers used by face culling and lighting lookups.

use cgmath::Vector3;

/// Represents the six possible faces of a voxel block.
///
/// The discriminant doubles as the texture slot index of the face; the
/// matching end-of-animation slot is `side as usize + 6`.
///
/// The order is: [FRONT (-X), BACK (+X), BOTTOM (-Y), TOP (+Y), LEFT (-Z), RIGHT (+Z)]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The face looking towards negative X
    FRONT = 0,

    /// The face looking towards positive X
    BACK = 1,

    /// The face looking towards negative Y
    BOTTOM = 2,

    /// The face looking towards positive Y
    TOP = 3,

    /// The face looking towards negative Z
    LEFT = 4,

    /// The face looking towards positive Z
    RIGHT = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in texture slot order.
    ///
    /// # Returns
    /// An array containing all `BlockSide` variants.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::FRONT,
            BlockSide::BACK,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::LEFT,
            BlockSide::RIGHT,
        ]
    }

    /// Returns the integer step from a voxel to its neighbour across this face.
    ///
    /// # Returns
    /// A unit vector along one axis.
    pub fn offset(self) -> Vector3<i32> {
        match self {
            BlockSide::FRONT => Vector3::new(-1, 0, 0),
            BlockSide::BACK => Vector3::new(1, 0, 0),
            BlockSide::BOTTOM => Vector3::new(0, -1, 0),
            BlockSide::TOP => Vector3::new(0, 1, 0),
            BlockSide::LEFT => Vector3::new(0, 0, -1),
            BlockSide::RIGHT => Vector3::new(0, 0, 1),
        }
    }

    /// Returns the outward facing normal of this face.
    pub fn normal(self) -> [f32; 3] {
        let offset = self.offset();
        [offset.x as f32, offset.y as f32, offset.z as f32]
    }

    /// Returns the texture slot holding the first animation frame of this face.
    pub fn start_slot(self) -> usize {
        self as usize
    }

    /// Returns the texture slot holding the last animation frame of this face.
    pub fn end_slot(self) -> usize {
        self as usize + 6
    }
}
