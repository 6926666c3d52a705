//! Geometry for billboard blocks: two crossed, double sided quads.

use crate::engine_state::rendering::atlas::AtlasTexture;
use crate::engine_state::rendering::vertex::{Vertex, VertexStream};

/// Winding of the front side of a billboard quad.
pub const FRONT_INDICES: [u32; 6] = [0, 1, 2, 1, 3, 2];
/// Winding of the back side of a billboard quad.
pub const BACK_INDICES: [u32; 6] = [0, 2, 1, 1, 2, 3];

const BOTTOM_OCCLUSION: f32 = 0.75;
const TOP_OCCLUSION: f32 = 1.0;

/// Writes the four quads of a billboard voxel into `stream`.
///
/// Both diagonals of the voxel get one quad, and every quad is written once
/// per winding so it is visible from both sides.
///
/// # Arguments
/// * `x`, `y`, `z` - Chunk-relative voxel position
/// * `texture` - The billboard texture
/// * `shadow` - Light factor of the voxel itself
/// * `stream` - Destination stream
pub fn write_billboard(x: i32, y: i32, z: i32, texture: &AtlasTexture, shadow: f32, stream: &mut VertexStream) {
    let (x, y, z) = (x as f32, y as f32, z as f32);

    let diagonals = [
        [[x, y, z], [x + 1.0, y, z + 1.0], [x, y + 1.0, z], [x + 1.0, y + 1.0, z + 1.0]],
        [[x + 1.0, y, z], [x, y, z + 1.0], [x + 1.0, y + 1.0, z], [x, y + 1.0, z + 1.0]],
    ];
    let uvs = [
        [texture.lower.x, texture.lower.y],
        [texture.higher.x, texture.lower.y],
        [texture.lower.x, texture.higher.y],
        [texture.higher.x, texture.higher.y],
    ];

    for positions in diagonals {
        let vertices: [Vertex; 4] = std::array::from_fn(|i| Vertex {
            position: positions[i],
            normal: [0.0, 1.0, 0.0],
            uv: uvs[i],
            blend_mode: texture.blend_mode.index(),
            animation_offset: 0.0,
            animation_frames: 1,
            ambient_occlusion: if i < 2 { BOTTOM_OCCLUSION } else { TOP_OCCLUSION },
            shadow,
        });
        stream.push_quad(vertices, FRONT_INDICES);
        stream.push_quad(vertices, BACK_INDICES);
    }
}
