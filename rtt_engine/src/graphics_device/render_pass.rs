/// Render pass and render target descriptors

use crate::graphics_device::{Viewport, Rect2D, RenderTargetHandle};

/// Pixel formats of attachments and swapchain images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum TextureFormat {
    R8G8B8A8_UNORM,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,
    D32_FLOAT,
    D24_UNORM_S8_UINT,
}

impl TextureFormat {
    /// Whether this is a depth (or depth/stencil) format
    pub fn is_depth(&self) -> bool {
        matches!(self, TextureFormat::D32_FLOAT | TextureFormat::D24_UNORM_S8_UINT)
    }
}

/// Image layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLayout {
    Undefined,
    ColorAttachment,
    DepthStencilAttachment,
    ShaderReadOnly,
    PresentSrc,
}

/// Descriptor for a single attachment in a render pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentDesc {
    /// Pixel format
    pub format: TextureFormat,
    /// Layout the attachment is left in when the pass ends
    pub final_layout: ImageLayout,
}

impl AttachmentDesc {
    /// Color attachment ending in `final_layout`
    pub fn color(format: TextureFormat, final_layout: ImageLayout) -> Self {
        Self {
            format,
            final_layout,
        }
    }

    /// Depth attachment
    pub fn depth(format: TextureFormat) -> Self {
        Self {
            format,
            final_layout: ImageLayout::DepthStencilAttachment,
        }
    }
}

/// Descriptor for creating a render pass over the swapchain images
///
/// The device creates one framebuffer per swapchain image, pairing the
/// image with the shared depth buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderPassDesc {
    pub viewport: Viewport,
    pub scissor: Rect2D,
    pub color_attachment: AttachmentDesc,
    pub depth_attachment: Option<AttachmentDesc>,
}

/// Descriptor for creating an offscreen render target
///
/// The color attachment ends each pass in `ShaderReadOnly` layout so it can
/// be sampled by a later pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderTargetDesc {
    pub viewport: Viewport,
    pub scissor: Rect2D,
    pub color_format: TextureFormat,
    pub depth_format: Option<TextureFormat>,
    /// Number of framebuffers (one per swapchain image)
    pub count: usize,
}

/// Attachment of a render target usable as a sampled image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentDescriptorInfo {
    pub render_target: RenderTargetHandle,
    pub attachment_index: usize,
    pub format: TextureFormat,
    pub layout: ImageLayout,
}
