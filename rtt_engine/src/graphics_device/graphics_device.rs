/// GraphicsDevice trait - the engine capability set the application drives

use std::time::Duration;
use crate::error::Result;
use crate::graphics_device::{
    AttachmentDescriptorInfo, BufferHandle, CommandBufferHandle, CommandBufferLevel,
    CommandList, DeviceResource, FenceHandle, MeshDesc, MeshHandle, PipelineDesc,
    PipelineHandle, RenderPassDesc, RenderPassHandle, RenderTargetDesc, RenderTargetHandle,
    SemaphoreHandle, ShaderBinding, ShaderHandle, ShaderStageDesc, SubmitInfo, TextureFormat,
};

/// Device identification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Adapter name
    pub name: String,
    /// Backend name (e.g. "headless")
    pub backend: String,
    /// Whether GPU debugging/validation is enabled
    pub debug_gpu: bool,
}

/// Presentation window state owned by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainInfo {
    pub image_count: usize,
    pub width: u32,
    pub height: u32,
    pub color_format: TextureFormat,
    pub depth_format: TextureFormat,
    /// Signaled when an acquired image is ready to be rendered into
    pub image_available: SemaphoreHandle,
    /// Must be signaled before an image can be presented
    pub rendering_done: SemaphoreHandle,
}

/// Main graphics device trait
///
/// Central interface for creating GPU resources, recording command
/// buffers, submitting them and synchronizing with the GPU.
/// Every call returns a pass/fail result.
pub trait GraphicsDevice: Send {
    /// Get device identification
    fn info(&self) -> DeviceInfo;

    /// Get the presentation window state
    fn swapchain(&self) -> SwapchainInfo;

    // ===== LOAD / INITIALIZE =====

    /// Create a render pass with one framebuffer per swapchain image
    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<RenderPassHandle>;

    /// Create an offscreen render target
    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<RenderTargetHandle>;

    /// Describe a render target attachment for sampling by a later pass
    ///
    /// # Arguments
    ///
    /// * `render_target` - Render target to sample
    /// * `attachment_index` - 0 = color, 1 = depth
    fn render_target_attachment(
        &self,
        render_target: RenderTargetHandle,
        attachment_index: usize,
    ) -> Result<AttachmentDescriptorInfo>;

    /// Allocate `count` command buffers
    fn create_command_buffers(
        &mut self,
        count: usize,
        level: CommandBufferLevel,
    ) -> Result<Vec<CommandBufferHandle>>;

    /// Create a fence, optionally in the signaled state
    fn create_fence(&mut self, signaled: bool) -> Result<FenceHandle>;

    /// Create a binary semaphore (unsignaled)
    fn create_semaphore(&mut self) -> Result<SemaphoreHandle>;

    /// Create a shader program from its first stage
    fn create_shader(&mut self, desc: &ShaderStageDesc) -> Result<ShaderHandle>;

    /// Load an additional stage into an existing shader program
    fn add_shader_stage(&mut self, shader: ShaderHandle, desc: &ShaderStageDesc) -> Result<()>;

    /// Declare the resources bound to a shader's binding slots
    fn set_shader_bindings(&mut self, shader: ShaderHandle, bindings: &[ShaderBinding]) -> Result<()>;

    /// Create a uniform buffer of `size` bytes
    fn create_uniform_buffer(&mut self, size: u64) -> Result<BufferHandle>;

    /// Write `data` into a buffer at `offset`
    fn update_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()>;

    /// Create (or open) a named pipeline cache
    fn create_pipeline_cache(&mut self, name: &str) -> Result<()>;

    /// Create a graphics pipeline
    fn create_pipeline(&mut self, desc: &PipelineDesc) -> Result<PipelineHandle>;

    /// Create an indexed mesh
    fn create_mesh(&mut self, desc: &MeshDesc<'_>) -> Result<MeshHandle>;

    // ===== RECORDING =====

    /// Borrow a command buffer for recording
    fn command_list(&mut self, command_buffer: CommandBufferHandle) -> Result<&mut dyn CommandList>;

    // ===== SUBMISSION / SYNCHRONIZATION =====

    /// Submit command buffers to the graphics queue
    fn submit(&mut self, submit: &SubmitInfo<'_>) -> Result<()>;

    /// Block until `fence` is signaled or `timeout` expires
    fn wait_for_fence(&mut self, fence: FenceHandle, timeout: Duration) -> Result<()>;

    /// Return `fence` to the unsignaled state
    fn reset_fence(&mut self, fence: FenceHandle) -> Result<()>;

    /// Wait for all GPU operations to complete
    fn wait_idle(&mut self) -> Result<()>;

    // ===== PRESENTATION =====

    /// Acquire the next swapchain image; signals `SwapchainInfo::image_available`
    fn acquire_next_image(&mut self) -> Result<u32>;

    /// Present an image; consumes `SwapchainInfo::rendering_done`
    fn present(&mut self, image_index: u32) -> Result<()>;

    // ===== RELEASE =====

    /// Destroy a resource
    ///
    /// Returns `false` if the resource was already destroyed or never existed.
    fn destroy(&mut self, resource: DeviceResource) -> bool;
}
