/// Fence/semaphore pair signaled by one pass

use crate::graphics_device::{DeviceResource, FenceHandle, GraphicsDevice, SemaphoreHandle};

/// Completion signals of one render pass
///
/// The semaphore orders GPU work (the dependent pass waits on it), the
/// fence lets the CPU block until the pass has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPair {
    pub fence: FenceHandle,
    pub semaphore: SemaphoreHandle,
}

impl SyncPair {
    pub fn new(fence: FenceHandle, semaphore: SemaphoreHandle) -> Self {
        Self { fence, semaphore }
    }

    /// Destroy the fence, then the semaphore
    ///
    /// Returns the number of primitives actually destroyed.
    pub fn release(&self, device: &mut dyn GraphicsDevice) -> usize {
        [DeviceResource::Fence(self.fence), DeviceResource::Semaphore(self.semaphore)]
            .into_iter()
            .filter(|resource| device.destroy(*resource))
            .count()
    }
}

#[cfg(test)]
#[path = "sync_pair_tests.rs"]
mod tests;
