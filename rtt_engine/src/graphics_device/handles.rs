/// Device resource handles
///
/// Every object the device creates is referred to by a slotmap key owned
/// by the device. Keys stay valid until their own resource is destroyed,
/// and a destroyed key never aliases a newer resource.

use slotmap::new_key_type;

new_key_type! {
    /// Render pass with one framebuffer per swapchain image
    pub struct RenderPassHandle;

    /// Offscreen render target (color + depth, one framebuffer per swapchain image)
    pub struct RenderTargetHandle;

    /// Primary command buffer
    pub struct CommandBufferHandle;

    /// GPU-to-CPU completion signal
    pub struct FenceHandle;

    /// GPU-to-GPU ordering signal
    pub struct SemaphoreHandle;

    /// Shader program (one module per stage)
    pub struct ShaderHandle;

    /// Uniform buffer
    pub struct BufferHandle;

    /// Graphics pipeline
    pub struct PipelineHandle;

    /// Indexed mesh (vertex + index buffers)
    pub struct MeshHandle;
}

/// Any device resource, used for release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceResource {
    RenderPass(RenderPassHandle),
    RenderTarget(RenderTargetHandle),
    CommandBuffer(CommandBufferHandle),
    Fence(FenceHandle),
    Semaphore(SemaphoreHandle),
    Shader(ShaderHandle),
    Buffer(BufferHandle),
    Pipeline(PipelineHandle),
    Mesh(MeshHandle),
}

impl DeviceResource {
    /// Short resource kind name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            DeviceResource::RenderPass(_) => "render pass",
            DeviceResource::RenderTarget(_) => "render target",
            DeviceResource::CommandBuffer(_) => "command buffer",
            DeviceResource::Fence(_) => "fence",
            DeviceResource::Semaphore(_) => "semaphore",
            DeviceResource::Shader(_) => "shader",
            DeviceResource::Buffer(_) => "buffer",
            DeviceResource::Pipeline(_) => "pipeline",
            DeviceResource::Mesh(_) => "mesh",
        }
    }
}
