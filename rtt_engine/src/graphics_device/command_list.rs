/// CommandList trait - for recording rendering commands

use crate::error::Result;
use crate::graphics_device::{
    RenderPassHandle, RenderTargetHandle, PipelineHandle, MeshHandle,
};

/// Command list for recording rendering commands
///
/// Borrowed from the device with `GraphicsDevice::command_list()`.
/// Commands are recorded between `begin()` and `end()` and later submitted
/// via `GraphicsDevice::submit()`. Calling `begin()` on a previously
/// recorded list discards its old contents.
pub trait CommandList {
    /// Begin recording commands
    fn begin(&mut self) -> Result<()>;

    /// End recording commands
    fn end(&mut self) -> Result<()>;

    /// Begin a render pass
    ///
    /// # Arguments
    ///
    /// * `pass` - Swapchain render pass or offscreen render target
    /// * `framebuffer_index` - Framebuffer to render into (one per swapchain image)
    /// * `clear_values` - Clear values for attachments (color first, then depth)
    fn begin_render_pass(
        &mut self,
        pass: RenderPassRef,
        framebuffer_index: u32,
        clear_values: &[ClearValue],
    ) -> Result<()>;

    /// End the current render pass
    fn end_render_pass(&mut self) -> Result<()>;

    /// Set the viewport
    fn set_viewport(&mut self, viewport: Viewport) -> Result<()>;

    /// Set the scissor rectangle
    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()>;

    /// Bind a graphics pipeline (and its shader bindings)
    fn bind_pipeline(&mut self, pipeline: PipelineHandle) -> Result<()>;

    /// Bind the vertex and index buffers of a mesh
    fn bind_mesh(&mut self, mesh: MeshHandle) -> Result<()>;

    /// Draw indexed vertices
    ///
    /// # Arguments
    ///
    /// * `index_count` - Number of indices to draw
    /// * `first_index` - Index of first index
    /// * `vertex_offset` - Value added to vertex index before indexing into the vertex buffer
    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()>;
}

/// Render pass that a command list renders into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPassRef {
    /// Render pass whose framebuffers are the swapchain images
    Swapchain(RenderPassHandle),
    /// Offscreen render target's own render pass
    Offscreen(RenderTargetHandle),
}

/// Viewport dimensions and depth range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-extent viewport with depth range [0, 1]
    pub fn from_extent(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// 2D rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect2D {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect2D {
    pub fn from_extent(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

/// Clear value for an attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Color clear value (normalized RGBA)
    Color([f32; 4]),
    /// Depth/stencil clear value
    DepthStencil { depth: f32, stencil: u32 },
}
