use cgmath::Vector3;

use crate::engine_state::voxels::block::block_side::BlockSide;

/// One corner of a cube face, relative to the voxel's minimum corner.
///
/// Besides its position a corner names the three voxels that can occlude it:
/// the two edge neighbours (`side1`, `side2`) and the diagonal one (`corner`),
/// all relative to the voxel that owns the face.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceCorner {
    /// Corner position relative to the voxel's minimum corner
    pub position: Vector3<i32>,
    /// First edge neighbour sampled for ambient occlusion
    pub side1: Vector3<i32>,
    /// Second edge neighbour sampled for ambient occlusion
    pub side2: Vector3<i32>,
    /// Diagonal neighbour sampled for ambient occlusion
    pub corner: Vector3<i32>,
}

fn corner(position: [i32; 3], side1: [i32; 3], side2: [i32; 3], corner: [i32; 3]) -> FaceCorner {
    FaceCorner {
        position: Vector3::new(position[0], position[1], position[2]),
        side1: Vector3::new(side1[0], side1[1], side1[2]),
        side2: Vector3::new(side2[0], side2[1], side2[2]),
        corner: Vector3::new(corner[0], corner[1], corner[2]),
    }
}

/// Triangle order of a cube face quad.
pub const FACE_INDICES: [u32; 6] = [0, 1, 2, 1, 3, 2];

/// Returns the corners of a cube face in the order lower-left, lower-right,
/// upper-left, upper-right as seen from outside the block.
///
/// Texture coordinates follow the same order: the lower-left corner maps to
/// the texture's lower UV corner and the upper-right one to its higher corner.
///
/// # Arguments
/// * `block_side` - Which side of the block the face is on
///
/// # Returns
/// The four corners, ready to be wound with [`FACE_INDICES`].
pub fn face_corners(block_side: BlockSide) -> [FaceCorner; 4] {
    match block_side {
        BlockSide::FRONT => [
            corner([0, 0, 0], [-1, 0, -1], [-1, -1, 0], [-1, -1, -1]),
            corner([0, 0, 1], [-1, 0, 1], [-1, -1, 0], [-1, -1, 1]),
            corner([0, 1, 0], [-1, 0, -1], [-1, 1, 0], [-1, 1, -1]),
            corner([0, 1, 1], [-1, 0, 1], [-1, 1, 0], [-1, 1, 1]),
        ],

        BlockSide::BACK => [
            corner([1, 0, 1], [1, 0, 1], [1, -1, 0], [1, -1, 1]),
            corner([1, 0, 0], [1, 0, -1], [1, -1, 0], [1, -1, -1]),
            corner([1, 1, 1], [1, 0, 1], [1, 1, 0], [1, 1, 1]),
            corner([1, 1, 0], [1, 0, -1], [1, 1, 0], [1, 1, -1]),
        ],

        BlockSide::BOTTOM => [
            corner([0, 0, 0], [-1, -1, 0], [0, -1, -1], [-1, -1, -1]),
            corner([1, 0, 0], [1, -1, 0], [0, -1, -1], [1, -1, -1]),
            corner([0, 0, 1], [-1, -1, 0], [0, -1, 1], [-1, -1, 1]),
            corner([1, 0, 1], [1, -1, 0], [0, -1, 1], [1, -1, 1]),
        ],

        BlockSide::TOP => [
            corner([0, 1, 1], [0, 1, 1], [-1, 1, 0], [-1, 1, 1]),
            corner([1, 1, 1], [1, 1, 0], [0, 1, 1], [1, 1, 1]),
            corner([0, 1, 0], [-1, 1, 0], [0, 1, -1], [-1, 1, -1]),
            corner([1, 1, 0], [1, 1, 0], [0, 1, -1], [1, 1, -1]),
        ],

        BlockSide::LEFT => [
            corner([1, 0, 0], [1, 0, -1], [0, -1, -1], [1, -1, -1]),
            corner([0, 0, 0], [-1, 0, -1], [0, -1, -1], [-1, -1, -1]),
            corner([1, 1, 0], [1, 0, -1], [0, 1, -1], [1, 1, -1]),
            corner([0, 1, 0], [-1, 0, -1], [0, 1, -1], [-1, 1, -1]),
        ],

        BlockSide::RIGHT => [
            corner([0, 0, 1], [-1, 0, 1], [0, -1, 1], [-1, -1, 1]),
            corner([1, 0, 1], [1, 0, 1], [0, -1, 1], [1, -1, 1]),
            corner([0, 1, 1], [-1, 0, 1], [0, 1, 1], [-1, 1, 1]),
            corner([1, 1, 1], [1, 0, 1], [0, 1, 1], [1, 1, 1]),
        ],
    }
}

/// Converts the solidity of a corner's three occluders into a shading factor.
///
/// Two solid edge neighbours fully occlude the corner regardless of the
/// diagonal. Otherwise each solid occluder darkens it by one step.
///
/// # Returns
/// `1.0` for an unoccluded corner down to `0.25` for a fully occluded one.
pub fn ambient_occlusion(side1: bool, side2: bool, corner: bool) -> f32 {
    let level = if side1 && side2 {
        3
    } else {
        side1 as u32 + side2 as u32 + corner as u32
    };
    0.25 + (1.0 - level as f32 / 3.0) * 0.75
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occlusion_levels() {
        assert_eq!(ambient_occlusion(false, false, false), 1.0);
        assert_eq!(ambient_occlusion(true, true, false), 0.25);
        assert_eq!(ambient_occlusion(true, true, true), 0.25);
        assert_eq!(ambient_occlusion(false, false, true), 0.75);
        assert!((ambient_occlusion(true, false, true) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn corners_lie_on_their_face() {
        for side in BlockSide::all() {
            let offset = side.offset();
            for face_corner in face_corners(side) {
                // Every occluder sits in the layer just outside the face.
                for sample in [face_corner.side1, face_corner.side2, face_corner.corner] {
                    let along = sample.x * offset.x + sample.y * offset.y + sample.z * offset.z;
                    assert_eq!(along, 1);
                }
                // The corner position lies on the face plane.
                let plane = if offset.x + offset.y + offset.z > 0 { 1 } else { 0 };
                let along = face_corner.position.x * offset.x.abs()
                    + face_corner.position.y * offset.y.abs()
                    + face_corner.position.z * offset.z.abs();
                assert_eq!(along, plane);
            }
        }
    }
}
