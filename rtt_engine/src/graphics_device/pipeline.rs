/// Shader, shader binding and pipeline descriptors

use std::path::PathBuf;
use crate::graphics_device::{
    AttachmentDescriptorInfo, BufferHandle, RenderPassHandle, ShaderHandle, Viewport, Rect2D,
};

/// Shader stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// Descriptor for loading one shader stage
///
/// The device loads precompiled bytecode from `path`; compilation and the
/// bytecode format belong to the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStageDesc {
    pub path: PathBuf,
    pub stage: ShaderStage,
}

impl ShaderStageDesc {
    pub fn new(path: impl Into<PathBuf>, stage: ShaderStage) -> Self {
        Self {
            path: path.into(),
            stage,
        }
    }
}

/// Kind of resource a shader binding slot expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderBindingType {
    Sampler2D,
    Uniform,
}

/// Resource bound to a shader binding slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingResource {
    /// Sampled render target attachment
    Image(AttachmentDescriptorInfo),
    /// Uniform buffer range
    Buffer { buffer: BufferHandle, offset: u64, range: u64 },
}

/// One shader binding slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShaderBinding {
    pub index: u32,
    pub binding_type: ShaderBindingType,
    pub stage: ShaderStage,
    pub resource: BindingResource,
}

impl ShaderBinding {
    /// Whether the resource kind matches the declared binding type
    pub fn is_consistent(&self) -> bool {
        matches!(
            (self.binding_type, self.resource),
            (ShaderBindingType::Sampler2D, BindingResource::Image(_))
                | (ShaderBindingType::Uniform, BindingResource::Buffer { .. })
        )
    }
}

/// Vertex declaration (interleaved f32 attributes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexDeclaration {
    Position,
    PositionUv,
    PositionNormalUv,
}

impl VertexDeclaration {
    /// Number of f32 components per vertex
    pub fn components(&self) -> usize {
        match self {
            VertexDeclaration::Position => 3,
            VertexDeclaration::PositionUv => 5,
            VertexDeclaration::PositionNormalUv => 8,
        }
    }

    /// Vertex stride in bytes
    pub fn stride(&self) -> usize {
        self.components() * std::mem::size_of::<f32>()
    }
}

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveTopology {
    TriangleList,
    TriangleStrip,
    LineList,
    PointList,
}

/// Descriptor for creating a graphics pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDesc {
    pub vertex_declaration: VertexDeclaration,
    pub topology: PrimitiveTopology,
    pub render_pass: RenderPassHandle,
    pub shader: ShaderHandle,
    pub viewports: Vec<Viewport>,
    pub scissors: Vec<Rect2D>,
    /// Name of a pipeline cache created with `create_pipeline_cache`
    pub pipeline_cache: Option<String>,
}
