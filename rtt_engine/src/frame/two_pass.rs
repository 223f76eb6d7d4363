/// Two-pass frame submission
///
/// The offscreen pass renders into the render target, the composite pass
/// samples it and draws into the swapchain image. The composite submission
/// waits on the offscreen semaphore, and the CPU waits on each pass's fence
/// before moving on, so the render target is never sampled while it is
/// still being written and no command buffer is reused while in flight.

use std::fmt;
use std::time::Duration;
use crate::error::Error;
use crate::frame::SyncPair;
use crate::graphics_device::{
    CommandBufferHandle, GraphicsDevice, PipelineStageFlags, SemaphoreHandle, SubmitInfo,
};
use crate::engine_error;

const SOURCE: &str = "rtt::Frame";

/// Stage both submissions wait at
const WAIT_STAGE: [PipelineStageFlags; 1] = [PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];

/// Step of the protocol that dropped a frame
#[derive(Debug, Clone)]
pub enum FrameError {
    ResetOffscreenFence(Error),
    SubmitOffscreen(Error),
    WaitOffscreen(Error),
    ResetCompositeFence(Error),
    SubmitComposite(Error),
    WaitComposite(Error),
}

impl FrameError {
    /// Human-readable name of the failed step
    pub fn step(&self) -> &'static str {
        match self {
            FrameError::ResetOffscreenFence(_) => "resetting render target fence",
            FrameError::SubmitOffscreen(_) => "submitting queue for drawing to render target",
            FrameError::WaitOffscreen(_) => "waiting for render target fence",
            FrameError::ResetCompositeFence(_) => "resetting draw fence",
            FrameError::SubmitComposite(_) => "submitting queue for final drawing",
            FrameError::WaitComposite(_) => "waiting for draw fence",
        }
    }

    /// Device error behind the failure
    pub fn error(&self) -> &Error {
        match self {
            FrameError::ResetOffscreenFence(e)
            | FrameError::SubmitOffscreen(e)
            | FrameError::WaitOffscreen(e)
            | FrameError::ResetCompositeFence(e)
            | FrameError::SubmitComposite(e)
            | FrameError::WaitComposite(e) => e,
        }
    }

    /// Whether the composite pass was submitted before the failure
    pub fn composite_submitted(&self) -> bool {
        matches!(self, FrameError::WaitComposite(_))
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error on {}: {}", self.step(), self.error())
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error())
    }
}

/// Per-frame inputs of the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSubmission {
    /// Offscreen command buffer for the acquired image
    pub offscreen_commands: CommandBufferHandle,
    /// Composite command buffer for the acquired image
    pub composite_commands: CommandBufferHandle,
    /// Signaled by the presentation engine once the image is acquired
    pub image_available: SemaphoreHandle,
    /// Waited on by presentation
    pub rendering_done: SemaphoreHandle,
}

/// Submits one frame as two dependent passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TwoPassSubmitter {
    pub offscreen: SyncPair,
    pub composite: SyncPair,
    /// Bound on each fence wait
    pub fence_timeout: Duration,
}

impl TwoPassSubmitter {
    pub fn new(offscreen: SyncPair, composite: SyncPair, fence_timeout: Duration) -> Self {
        Self { offscreen, composite, fence_timeout }
    }

    /// Submit both passes of a frame
    ///
    /// Steps, each aborting the frame on failure:
    /// 1. reset the offscreen fence
    /// 2. submit the offscreen pass (waits image-available, signals the
    ///    offscreen semaphore)
    /// 3. wait for the offscreen fence
    /// 4. reset the composite fence
    /// 5. submit the composite pass (waits the offscreen semaphore, signals
    ///    rendering-done)
    /// 6. wait for the composite fence
    ///
    /// A failure is logged and returned; nothing after the failed step is
    /// attempted.
    pub fn submit(
        &self,
        device: &mut dyn GraphicsDevice,
        frame: &FrameSubmission,
    ) -> Result<(), FrameError> {
        self.run(device, frame).map_err(|err| {
            engine_error!(SOURCE, "{}", err);
            err
        })
    }

    fn run(&self, device: &mut dyn GraphicsDevice, frame: &FrameSubmission) -> Result<(), FrameError> {
        // Offscreen pass
        device
            .reset_fence(self.offscreen.fence)
            .map_err(FrameError::ResetOffscreenFence)?;
        device
            .submit(&SubmitInfo {
                command_buffers: &[frame.offscreen_commands],
                wait_semaphores: &[frame.image_available],
                wait_stages: &WAIT_STAGE,
                signal_semaphores: &[self.offscreen.semaphore],
                fence: Some(self.offscreen.fence),
            })
            .map_err(FrameError::SubmitOffscreen)?;
        device
            .wait_for_fence(self.offscreen.fence, self.fence_timeout)
            .map_err(FrameError::WaitOffscreen)?;

        // Composite pass
        device
            .reset_fence(self.composite.fence)
            .map_err(FrameError::ResetCompositeFence)?;
        device
            .submit(&SubmitInfo {
                command_buffers: &[frame.composite_commands],
                wait_semaphores: &[self.offscreen.semaphore],
                wait_stages: &WAIT_STAGE,
                signal_semaphores: &[frame.rendering_done],
                fence: Some(self.composite.fence),
            })
            .map_err(FrameError::SubmitComposite)?;
        device
            .wait_for_fence(self.composite.fence, self.fence_timeout)
            .map_err(FrameError::WaitComposite)?;

        Ok(())
    }
}

#[cfg(test)]
#[path = "two_pass_tests.rs"]
mod tests;
