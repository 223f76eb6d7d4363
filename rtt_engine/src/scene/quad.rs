/// Full-screen-ish quad used by the composite pass

use bytemuck::{Pod, Zeroable};
use crate::graphics_device::{MeshDesc, VertexDeclaration};

/// Interleaved position + UV vertex
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const fn new(position: [f32; 3], uv: [f32; 2]) -> Self {
        Self { position, uv }
    }
}

/// Quad corners, counter-clockwise from bottom left
pub static QUAD_VERTICES: [Vertex; 4] = [
    Vertex::new([-0.7, -0.7, 0.0], [0.0, 0.0]),
    Vertex::new([-0.7, 0.7, 0.0], [0.0, 1.0]),
    Vertex::new([0.7, 0.7, 0.0], [1.0, 1.0]),
    Vertex::new([0.7, -0.7, 0.0], [1.0, 0.0]),
];

/// Two triangles sharing the 1-3 diagonal
pub static QUAD_INDICES: [u32; 6] = [0, 1, 3, 3, 1, 2];

/// Mesh descriptor for the quad, uploaded directly to host-visible memory
pub fn quad_mesh_desc() -> MeshDesc<'static> {
    MeshDesc {
        vertex_declaration: VertexDeclaration::PositionUv,
        vertex_data: bytemuck::cast_slice(&QUAD_VERTICES),
        indices: &QUAD_INDICES,
        use_staging: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout_matches_declaration() {
        assert_eq!(std::mem::size_of::<Vertex>(), VertexDeclaration::PositionUv.stride());
    }

    #[test]
    fn test_quad_geometry() {
        let desc = quad_mesh_desc();
        assert_eq!(desc.vertex_count(), 4);
        assert_eq!(desc.indices.to_vec(), vec![0u32, 1, 3, 3, 1, 2]);
        assert!(desc.is_well_formed());
        assert_eq!(desc.vertex_data.len(), 4 * 20);
    }

    #[test]
    fn test_quad_corners_and_uvs() {
        let floats: &[f32] = bytemuck::cast_slice(&QUAD_VERTICES);
        assert_eq!(floats[0..5].to_vec(), vec![-0.7f32, -0.7, 0.0, 0.0, 0.0]);
        assert_eq!(floats[15..20].to_vec(), vec![0.7f32, -0.7, 0.0, 1.0, 0.0]);
        for vertex in QUAD_VERTICES.iter() {
            assert_eq!(vertex.position[2], 0.0);
            assert!(vertex.uv.iter().all(|c| *c == 0.0 || *c == 1.0));
        }
    }
}
