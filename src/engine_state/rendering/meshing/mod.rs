//! Mesh generation for voxel chunks.
//!
//! This module converts the centre chunk of a [`ChunkMatrix`] into a single
//! vertex/index stream that a [`ChunkRenderer`] can upload in one go.
//!
//! # Architecture
//! - `MeshBuilder`: walks the centre chunk and writes per-voxel geometry
//! - `face`: corner tables and ambient occlusion for cube faces
//! - `billboard`: crossed-quad geometry for billboard blocks
//! - `renderer`: the seam between the core and a graphics backend
//!
//! # Output Layout
//! Opaque and alpha-tested voxels go to the solid stream; voxels of
//! alpha-blended kinds go to the translucent stream. The two streams are
//! concatenated, solid first, so one index buffer serves both passes through
//! two [`IndexRange`]s.

use cgmath::{Vector2, Vector3};

use crate::engine_state::{
    rendering::{
        atlas::AtlasTexture,
        vertex::{Vertex, VertexStream},
    },
    voxels::{
        block::{block_side::BlockSide, BlockKind, BlockRegistry, BlockShape, BlockTypeSize, AIR_ID},
        chunk::{chunk_matrix::{ChunkMatrix, MatrixView}, Chunk, CHUNK_DIMENSION, CHUNK_HEIGHT},
    },
};

mod billboard;
mod face;
mod renderer;

pub use face::{ambient_occlusion, face_corners, FaceCorner, FACE_INDICES};
pub use renderer::*;

/// A contiguous run of the index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IndexRange {
    /// Offset of the first index, in bytes
    pub byte_offset: usize,
    /// Number of indices
    pub count: usize,
}

/// The complete geometry of one chunk.
#[derive(Debug, Clone)]
pub struct ChunkGeometry {
    /// Solid vertices followed by translucent vertices
    pub vertices: Vec<Vertex>,
    /// Solid indices followed by translucent indices
    pub indices: Vec<u32>,
    /// Index range of the solid pass
    pub solid: IndexRange,
    /// Index range of the translucent pass
    pub translucent: IndexRange,
    /// Centre of the bounding box of every vertex position
    pub center: Vector3<f32>,
    /// Half extents of the bounding box of every vertex position
    pub half_extents: Vector3<f32>,
    /// Centre of the bounding box of every texture coordinate
    pub texture_center: Vector2<f32>,
    /// Half extents of the bounding box of every texture coordinate
    pub texture_half_extents: Vector2<f32>,
}

impl ChunkGeometry {
    /// Concatenates a solid and a translucent stream.
    ///
    /// # Arguments
    /// * `solid` - Geometry for the solid pass
    /// * `translucent` - Geometry for the translucent pass
    ///
    /// # Returns
    /// Geometry with translucent indices shifted past the solid vertices and
    /// bounds computed over every vertex.
    pub fn from_streams(solid: VertexStream, translucent: VertexStream) -> Self {
        let solid_vertex_count = solid.vertex_count() as u32;
        let solid_index_count = solid.indices.len();
        let translucent_index_count = translucent.indices.len();

        let mut vertices = solid.vertices;
        vertices.extend(translucent.vertices);

        let mut indices = solid.indices;
        indices.extend(translucent.indices.iter().map(|index| index + solid_vertex_count));

        let (center, half_extents) = position_bounds(&vertices);
        let (texture_center, texture_half_extents) = texture_bounds(&vertices);

        ChunkGeometry {
            vertices,
            indices,
            solid: IndexRange {
                byte_offset: 0,
                count: solid_index_count,
            },
            translucent: IndexRange {
                byte_offset: solid_index_count * std::mem::size_of::<u32>(),
                count: translucent_index_count,
            },
            center,
            half_extents,
            texture_center,
            texture_half_extents,
        }
    }

    /// Whether the chunk produced no geometry at all.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

fn position_bounds(vertices: &[Vertex]) -> (Vector3<f32>, Vector3<f32>) {
    let zero = Vector3::new(0.0, 0.0, 0.0);
    let Some(first) = vertices.first() else {
        return (zero, zero);
    };

    let mut min = first.position;
    let mut max = first.position;
    for vertex in vertices {
        for axis in 0..3 {
            min[axis] = min[axis].min(vertex.position[axis]);
            max[axis] = max[axis].max(vertex.position[axis]);
        }
    }

    let min = Vector3::from(min);
    let max = Vector3::from(max);
    ((max + min) * 0.5, (max - min) * 0.5)
}

fn texture_bounds(vertices: &[Vertex]) -> (Vector2<f32>, Vector2<f32>) {
    let zero = Vector2::new(0.0, 0.0);
    let Some(first) = vertices.first() else {
        return (zero, zero);
    };

    let mut min = first.uv;
    let mut max = first.uv;
    for vertex in vertices {
        for axis in 0..2 {
            min[axis] = min[axis].min(vertex.uv[axis]);
            max[axis] = max[axis].max(vertex.uv[axis]);
        }
    }

    let min = Vector2::from(min);
    let max = Vector2::from(max);
    ((max + min) * 0.5, (max - min) * 0.5)
}

/// Builds chunk geometry against a block registry.
pub struct MeshBuilder<'a> {
    registry: &'a BlockRegistry,
}

impl<'a> MeshBuilder<'a> {
    /// Creates a builder reading block kinds from `registry`.
    pub fn new(registry: &'a BlockRegistry) -> Self {
        MeshBuilder { registry }
    }

    /// Builds the geometry of the centre chunk of `matrix`.
    ///
    /// Neighbouring chunks are only read, for face culling and ambient
    /// occlusion across the chunk border. Light comes from the centre chunk's
    /// lighting buffer, so lighting should be solved first.
    ///
    /// # Arguments
    /// * `matrix` - The 3x3 window around the chunk
    ///
    /// # Returns
    /// The chunk's geometry, empty if the matrix has no centre chunk.
    pub fn build(&self, matrix: &ChunkMatrix) -> ChunkGeometry {
        let mut solid = VertexStream::new();
        let mut translucent = VertexStream::new();

        let view = matrix.read();
        if let Some(center) = view.center() {
            for y in 0..CHUNK_HEIGHT {
                for z in 0..CHUNK_DIMENSION {
                    for x in 0..CHUNK_DIMENSION {
                        let id = center.get_block(x, y, z);
                        if id == AIR_ID {
                            continue;
                        }
                        let Some(kind) = self.registry.get(id) else {
                            continue;
                        };

                        let stream = if kind.is_alpha_enabled() {
                            &mut translucent
                        } else {
                            &mut solid
                        };

                        match kind.shape() {
                            BlockShape::Cube => self.write_cube(&view, center, kind, x, y, z, stream),
                            BlockShape::Billboard => {
                                if let Some(texture) = kind.texture(0) {
                                    let shadow = center.light_level_for_rendering(x, y, z);
                                    billboard::write_billboard(x, y, z, texture, shadow, stream);
                                }
                            }
                        }
                    }
                }
            }
        }

        ChunkGeometry::from_streams(solid, translucent)
    }

    /// Whether a face of `id` is visible against the neighbour `neighbour`.
    ///
    /// Faces show against air, and against transparent blocks of another kind.
    pub fn is_face_visible(&self, id: BlockTypeSize, neighbour: BlockTypeSize) -> bool {
        if neighbour == AIR_ID {
            return true;
        }
        neighbour != id
            && self
                .registry
                .get(neighbour)
                .is_some_and(BlockKind::is_transparent)
    }

    fn is_occluder(&self, view: &MatrixView<'_>, x: i32, y: i32, z: i32, offset: Vector3<i32>) -> bool {
        self.registry
            .is_opaque(view.get_block(x + offset.x, y + offset.y, z + offset.z))
    }

    /// Number of animation frames and the UV step between them.
    fn animation(&self, start: &AtlasTexture, end: Option<&AtlasTexture>) -> (u32, f32) {
        let Some(end) = end else {
            return (1, 1.0);
        };
        let atlas_width = self.registry.atlas_width() as f32;
        let start_px = (start.lower.x * atlas_width) as i32;
        let end_px = (end.higher.x * atlas_width) as i32;
        let frames = (end_px - start_px + 1) / start.width.max(1) as i32;
        (frames.max(1) as u32, start.width as f32 / atlas_width)
    }

    #[allow(clippy::too_many_arguments)]
    fn write_cube(
        &self,
        view: &MatrixView<'_>,
        center: &Chunk,
        kind: &BlockKind,
        x: i32,
        y: i32,
        z: i32,
        stream: &mut VertexStream,
    ) {
        for side in BlockSide::all() {
            let offset = side.offset();
            let neighbour = view.get_block(x + offset.x, y + offset.y, z + offset.z);
            if !self.is_face_visible(kind.id(), neighbour) {
                continue;
            }
            let Some(start) = kind.texture(side.start_slot()) else {
                continue;
            };

            let (animation_frames, animation_offset) =
                self.animation(start, kind.texture(side.end_slot()));
            let shadow = center.light_level_for_rendering(x + offset.x, y + offset.y, z + offset.z);
            let uvs = [
                [start.lower.x, start.lower.y],
                [start.higher.x, start.lower.y],
                [start.lower.x, start.higher.y],
                [start.higher.x, start.higher.y],
            ];
            let corners = face_corners(side);

            let vertices: [Vertex; 4] = std::array::from_fn(|i| {
                let corner = &corners[i];
                Vertex {
                    position: [
                        (x + corner.position.x) as f32,
                        (y + corner.position.y) as f32,
                        (z + corner.position.z) as f32,
                    ],
                    normal: side.normal(),
                    uv: uvs[i],
                    blend_mode: start.blend_mode.index(),
                    animation_offset,
                    animation_frames,
                    ambient_occlusion: ambient_occlusion(
                        self.is_occluder(view, x, y, z, corner.side1),
                        self.is_occluder(view, x, y, z, corner.side2),
                        self.is_occluder(view, x, y, z, corner.corner),
                    ),
                    shadow,
                }
            });
            stream.push_quad(vertices, FACE_INDICES);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::MtResource;
    use crate::engine_state::rendering::atlas::Atlas;
    use crate::engine_state::voxels::block::block_type::BlockType;

    fn registry() -> Arc<BlockRegistry> {
        BlockRegistry::standard(&Atlas::standard()).unwrap()
    }

    fn matrix_with(blocks: &[(i32, i32, i32, BlockType)], registry: &BlockRegistry) -> ChunkMatrix {
        let mut chunk = Chunk::new(0, 0);
        for (x, y, z, block_type) in blocks {
            chunk.set_block(*x, *y, *z, block_type.id(), registry);
        }
        ChunkMatrix::new(MtResource::new(chunk))
    }

    #[test]
    fn empty_chunk_has_empty_geometry() {
        let registry = registry();
        let geometry = MeshBuilder::new(&registry).build(&matrix_with(&[], &registry));

        assert!(geometry.is_empty());
        assert!(geometry.indices.is_empty());
        assert_eq!(geometry.center, Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(geometry.half_extents, Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(geometry.translucent, IndexRange::default());
    }

    #[test]
    fn lone_cube_emits_six_unoccluded_faces() {
        let registry = registry();
        let matrix = matrix_with(&[(5, 10, 7, BlockType::STONE)], &registry);
        let geometry = MeshBuilder::new(&registry).build(&matrix);

        assert_eq!(geometry.vertices.len(), 24);
        assert_eq!(geometry.solid, IndexRange { byte_offset: 0, count: 36 });
        assert_eq!(geometry.translucent, IndexRange { byte_offset: 144, count: 0 });
        assert!(geometry.vertices.iter().all(|v| v.ambient_occlusion == 1.0));
        assert!(geometry.vertices.iter().all(|v| v.shadow == 1.0));
        assert!(geometry.vertices.iter().all(|v| v.animation_frames == 1));
        assert_eq!(geometry.center, Vector3::new(5.5, 10.5, 7.5));
        assert_eq!(geometry.half_extents, Vector3::new(0.5, 0.5, 0.5));
        assert_eq!(&geometry.indices[..6], &FACE_INDICES);
    }

    #[test]
    fn shared_faces_are_culled() {
        let registry = registry();
        let matrix = matrix_with(
            &[(5, 10, 7, BlockType::STONE), (6, 10, 7, BlockType::STONE)],
            &registry,
        );
        let geometry = MeshBuilder::new(&registry).build(&matrix);
        assert_eq!(geometry.vertices.len(), 10 * 4);
    }

    #[test]
    fn transparent_faces_cull_only_against_their_own_kind() {
        let registry = registry();
        let builder = MeshBuilder::new(&registry);

        let same = matrix_with(
            &[(5, 10, 7, BlockType::GLASS), (6, 10, 7, BlockType::GLASS)],
            &registry,
        );
        assert_eq!(builder.build(&same).vertices.len(), 10 * 4);

        let mixed = matrix_with(
            &[(5, 10, 7, BlockType::GLASS), (6, 10, 7, BlockType::GLASS_RED)],
            &registry,
        );
        let geometry = builder.build(&mixed);
        assert_eq!(geometry.solid.count, 36);
        assert_eq!(geometry.translucent, IndexRange { byte_offset: 144, count: 36 });
        let translucent = &geometry.indices[geometry.solid.count..];
        assert_eq!(translucent.iter().min(), Some(&24));
        assert_eq!(translucent.iter().max(), Some(&47));

        assert!(builder.is_face_visible(BlockType::STONE.id(), BlockType::WATER.id()));
        assert!(!builder.is_face_visible(BlockType::WATER.id(), BlockType::STONE.id()));
        assert!(!builder.is_face_visible(BlockType::WATER.id(), BlockType::WATER.id()));
    }

    #[test]
    fn corner_between_two_solid_sides_is_fully_occluded() {
        let registry = registry();
        let matrix = matrix_with(
            &[
                (5, 10, 5, BlockType::STONE),
                (4, 11, 5, BlockType::STONE),
                (5, 11, 4, BlockType::STONE),
            ],
            &registry,
        );
        let geometry = MeshBuilder::new(&registry).build(&matrix);

        let corner = geometry
            .vertices
            .iter()
            .find(|v| v.normal == [0.0, 1.0, 0.0] && v.position == [5.0, 11.0, 5.0])
            .unwrap();
        assert_eq!(corner.ambient_occlusion, 0.25);
        assert!(geometry.vertices.iter().all(|v| v.ambient_occlusion >= 0.25));
    }

    #[test]
    fn animated_textures_report_frames() {
        let registry = registry();
        let matrix = matrix_with(&[(0, 40, 0, BlockType::WATER)], &registry);
        let geometry = MeshBuilder::new(&registry).build(&matrix);

        assert_eq!(geometry.solid.count, 0);
        assert_eq!(geometry.translucent.count, 36);
        for vertex in &geometry.vertices {
            assert_eq!(vertex.animation_frames, 4);
            assert_eq!(vertex.animation_offset, 16.0 / 128.0);
        }
    }

    #[test]
    fn billboards_are_never_culled() {
        let registry = registry();
        let mut blocks = vec![(5, 10, 5, BlockType::GRASS_LEAVES)];
        for side in BlockSide::all() {
            let o = side.offset();
            blocks.push((5 + o.x, 10 + o.y, 5 + o.z, BlockType::STONE));
        }
        let matrix = matrix_with(&blocks, &registry);
        let geometry = MeshBuilder::new(&registry).build(&matrix);

        let billboard: Vec<&Vertex> = geometry
            .vertices
            .iter()
            .filter(|v| v.animation_frames == 1 && v.animation_offset == 0.0)
            .collect();
        assert_eq!(billboard.len(), 16);
        for vertex in billboard {
            let expected = if vertex.position[1] == 10.0 { 0.75 } else { 1.0 };
            assert_eq!(vertex.ambient_occlusion, expected);
        }
    }

    #[test]
    fn neighbour_chunks_cull_border_faces() {
        let registry = registry();
        let mut matrix = matrix_with(&[(15, 10, 3, BlockType::STONE)], &registry);
        let mut east = Chunk::new(1, 0);
        east.set_block(0, 10, 3, BlockType::STONE.id(), &registry);
        matrix.set(1, 0, Some(MtResource::new(east)));

        let geometry = MeshBuilder::new(&registry).build(&matrix);
        assert_eq!(geometry.vertices.len(), 5 * 4);
        assert!(geometry.vertices.iter().all(|v| v.normal != [1.0, 0.0, 0.0]));
    }

    #[test]
    fn face_shadow_reads_the_light_outside_the_face() {
        let registry = registry();
        let matrix = matrix_with(&[(5, 10, 5, BlockType::STONE)], &registry);
        matrix.center().unwrap().get_mut().set_light_level(5, 11, 5, 8);

        let geometry = MeshBuilder::new(&registry).build(&matrix);
        for vertex in &geometry.vertices {
            let expected = if vertex.normal == [0.0, 1.0, 0.0] { 0.25 } else { 1.0 };
            assert_eq!(vertex.shadow, expected);
        }
    }
}
