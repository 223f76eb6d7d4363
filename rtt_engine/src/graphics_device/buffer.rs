/// Mesh descriptor

use crate::graphics_device::VertexDeclaration;

/// Descriptor for creating an indexed mesh
///
/// `vertex_data` holds interleaved vertices laid out per
/// `vertex_declaration`.
#[derive(Debug, Clone, Copy)]
pub struct MeshDesc<'a> {
    pub vertex_declaration: VertexDeclaration,
    pub vertex_data: &'a [u8],
    pub indices: &'a [u32],
    /// Upload through a staging buffer into device-local memory
    pub use_staging: bool,
}

impl MeshDesc<'_> {
    /// Number of whole vertices in `vertex_data`
    pub fn vertex_count(&self) -> usize {
        self.vertex_data.len() / self.vertex_declaration.stride()
    }

    /// Whether the vertex data is a whole number of vertices and every
    /// index refers to one of them
    pub fn is_well_formed(&self) -> bool {
        let stride = self.vertex_declaration.stride();
        if self.vertex_data.is_empty() || self.vertex_data.len() % stride != 0 {
            return false;
        }
        let count = self.vertex_count();
        self.indices.iter().all(|&index| (index as usize) < count)
    }
}
