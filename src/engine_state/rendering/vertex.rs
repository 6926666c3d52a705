//! Vertex data structures for chunk geometry.
//!
//! This module defines the per-vertex format produced by the mesh builder and
//! handed to a [`ChunkRenderer`](super::renderer::ChunkRenderer). The layout is
//! plain old data so a renderer can upload a vertex slice as raw bytes.

use bytemuck::{Pod, Zeroable};

/// A vertex of chunk geometry.
///
/// Positions are relative to the chunk origin; the renderer adds the chunk's
/// world offset.
///
/// # Memory Layout
/// - Position: [f32; 3] (12 bytes)
/// - Normal: [f32; 3] (12 bytes)
/// - Texture Coordinates: [f32; 2] (8 bytes)
/// - Blend Mode: u32 (4 bytes)
/// - Animation Offset: f32 (4 bytes)
/// - Animation Frames: u32 (4 bytes)
/// - Ambient Occlusion: f32 (4 bytes)
/// - Shadow: f32 (4 bytes)
///
/// Total size: 52 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// Chunk-relative position
    pub position: [f32; 3],
    /// Outward facing normal
    pub normal: [f32; 3],
    /// Atlas-normalized texture coordinates of the first animation frame
    pub uv: [f32; 2],
    /// [`BlendMode`](super::atlas::BlendMode) index of the texture
    pub blend_mode: u32,
    /// Horizontal UV step between animation frames
    pub animation_offset: f32,
    /// Number of animation frames, 1 for still textures
    pub animation_frames: u32,
    /// Ambient occlusion factor in `0.25..=1.0`
    pub ambient_occlusion: f32,
    /// Light factor `(level / MAX_LIGHT_LEVEL)²`
    pub shadow: f32,
}

/// Size of one [`Vertex`] in bytes.
pub const VERTEX_SIZE: usize = std::mem::size_of::<Vertex>();

/// Growable vertex and index buffers for one render pass.
#[derive(Debug, Default, Clone)]
pub struct VertexStream {
    /// Vertex data
    pub vertices: Vec<Vertex>,
    /// Triangle indices into `vertices`
    pub indices: Vec<u32>,
}

impl VertexStream {
    /// Creates an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one quad.
    ///
    /// # Arguments
    /// * `corners` - The four vertices of the quad
    /// * `order` - Six indices into `corners` forming two triangles
    pub fn push_quad(&mut self, corners: [Vertex; 4], order: [u32; 6]) {
        let base = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&corners);
        self.indices.extend(order.iter().map(|index| base + index));
    }

    /// Number of vertices in the stream.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Whether the stream holds no geometry.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// Views a vertex slice as raw bytes for upload.
pub fn vertex_bytes(vertices: &[Vertex]) -> &[u8] {
    bytemuck::cast_slice(vertices)
}

/// Views an index slice as raw bytes for upload.
pub fn index_bytes(indices: &[u32]) -> &[u8] {
    bytemuck::cast_slice(indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_packed() {
        assert_eq!(VERTEX_SIZE, 52);
        let vertices = [Vertex::zeroed(); 3];
        assert_eq!(vertex_bytes(&vertices).len(), 3 * VERTEX_SIZE);
        assert_eq!(index_bytes(&[0, 1, 2]).len(), 12);
    }

    #[test]
    fn quads_are_offset_by_existing_vertices() {
        let mut stream = VertexStream::new();
        stream.push_quad([Vertex::zeroed(); 4], [0, 1, 2, 1, 3, 2]);
        stream.push_quad([Vertex::zeroed(); 4], [0, 1, 2, 1, 3, 2]);

        assert_eq!(stream.vertex_count(), 8);
        assert_eq!(&stream.indices[6..], &[4, 5, 6, 5, 7, 6]);
    }
}
