/// Queue submission and synchronization types

use bitflags::bitflags;
use crate::graphics_device::{CommandBufferHandle, FenceHandle, SemaphoreHandle};

bitflags! {
    /// Pipeline stages a submission waits at before its wait semaphores are consumed
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PipelineStageFlags: u32 {
        const COLOR_ATTACHMENT_OUTPUT = 1 << 10;
    }
}

/// Command buffer level
///
/// Only primary buffers can be submitted to the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBufferLevel {
    Primary,
    Secondary,
}

/// One queue submission
///
/// `wait_stages` pairs with `wait_semaphores` element by element.
#[derive(Debug, Clone, Copy)]
pub struct SubmitInfo<'a> {
    pub command_buffers: &'a [CommandBufferHandle],
    pub wait_semaphores: &'a [SemaphoreHandle],
    pub wait_stages: &'a [PipelineStageFlags],
    pub signal_semaphores: &'a [SemaphoreHandle],
    /// Fence signaled once every command buffer has completed
    pub fence: Option<FenceHandle>,
}
