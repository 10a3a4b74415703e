use bytemuck::{Pod, Zeroable};

use crate::types::Viewport;

/// Interleaved quad vertex: clip-space position followed by texture coordinate.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
}

/// Every quad is drawn as a four-vertex triangle strip.
pub const QUAD_VERTEX_COUNT: u32 = 4;

/// One float attribute inside an interleaved vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub location: u32,
    pub components: u32,
    pub offset: u64,
}

/// How the attributes of the bound vertex buffer are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    pub stride: u64,
    pub attributes: [VertexAttribute; 2],
}

/// Position at slot 0, uv at slot 1, 16 bytes per vertex.
pub const QUAD_LAYOUT: VertexLayout = VertexLayout {
    stride: std::mem::size_of::<Vertex>() as u64,
    attributes: [
        VertexAttribute {
            location: 0,
            components: 2,
            offset: 0,
        },
        VertexAttribute {
            location: 1,
            components: 2,
            offset: 8,
        },
    ],
};

impl VertexLayout {
    pub(crate) fn wgpu_attributes(&self) -> [wgpu::VertexAttribute; 2] {
        self.attributes.map(|attribute| wgpu::VertexAttribute {
            format: match attribute.components {
                1 => wgpu::VertexFormat::Float32,
                2 => wgpu::VertexFormat::Float32x2,
                3 => wgpu::VertexFormat::Float32x3,
                _ => wgpu::VertexFormat::Float32x4,
            },
            offset: attribute.offset,
            shader_location: attribute.location,
        })
    }
}

/// Quad centred on the origin spanning `[-x, x]` by `[-y, y]` in clip space.
///
/// Vertex order is top-left, bottom-left, top-right, bottom-right so the
/// strip covers the rectangle with two triangles.
pub fn quad(extent: [f32; 2]) -> [Vertex; 4] {
    let [x, y] = extent;
    [
        Vertex {
            position: [-x, y],
            uv: [0.0, 1.0],
        },
        Vertex {
            position: [-x, -y],
            uv: [0.0, 0.0],
        },
        Vertex {
            position: [x, y],
            uv: [1.0, 1.0],
        },
        Vertex {
            position: [x, -y],
            uv: [1.0, 0.0],
        },
    ]
}

/// Quad covering the whole viewport.
pub fn full_screen_quad() -> [Vertex; 4] {
    quad([1.0, 1.0])
}

/// Clip-space half-extents that keep a decal at its native pixel size.
///
/// The quad spans `2 * extent * viewport / 2` pixels on each axis, so an
/// extent of `decal / viewport` maps one decal texel to one pixel.
pub fn text_extents(decal_width: u32, decal_height: u32, viewport: Viewport) -> [f32; 2] {
    [
        decal_width as f32 / viewport.width.max(1) as f32,
        decal_height as f32 / viewport.height.max(1) as f32,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_is_sixteen_bytes() {
        assert_eq!(std::mem::size_of::<Vertex>(), 16);
        assert_eq!(QUAD_LAYOUT.stride, 16);
        assert_eq!(std::mem::offset_of!(Vertex, uv) as u64, QUAD_LAYOUT.attributes[1].offset);
    }

    #[test]
    fn full_screen_quad_corners() {
        let quad = full_screen_quad();
        assert_eq!(quad[0].position, [-1.0, 1.0]);
        assert_eq!(quad[0].uv, [0.0, 1.0]);
        assert_eq!(quad[3].position, [1.0, -1.0]);
        assert_eq!(quad[3].uv, [1.0, 0.0]);
    }

    #[test]
    fn text_extents_keep_native_pixel_size() {
        let extents = text_extents(700, 300, Viewport::new(1000, 500));
        assert!((extents[0] - 0.7).abs() < 1e-6);
        assert!((extents[1] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn small_viewports_overflow_clip_space() {
        let extents = text_extents(700, 300, Viewport::new(350, 150));
        assert_eq!(extents, [2.0, 2.0]);
    }

    #[test]
    fn text_quad_uses_extents_for_every_corner() {
        let quad = quad([0.7, 0.6]);
        for vertex in quad {
            assert_eq!(vertex.position[0].abs(), 0.7);
            assert_eq!(vertex.position[1].abs(), 0.6);
        }
    }
}
