/*!
# RTT Engine

Offscreen render-to-target compositing over an abstract graphics device.

Each frame renders into an offscreen render target, then samples that
target onto a quad drawn into the swapchain image. The two passes are
chained with fence/semaphore pairs so the composite pass never reads a
partially written target.

## Architecture

- **GraphicsDevice**: Capability trait for creating resources, recording
  command lists, submitting and synchronizing
- **HeadlessGraphicsDevice**: Complete CPU-side device with a call journal
  and fault injection
- **TwoPassSubmitter**: The offscreen/composite submission protocol
- **RenderToTargetScene**: Loads, updates, submits and releases the scene
- **RenderLoop**: Drives the scene on a background thread until cancelled
*/

// Internal modules
mod error;
mod engine;
pub mod log;
pub mod config;
pub mod graphics_device;
pub mod frame;
pub mod scene;

// Main rtt namespace module
pub mod rtt {
    // Error types
    pub use crate::error::{Error, Result};

    // Engine singleton
    pub use crate::engine::Engine;

    // Configuration
    pub use crate::config::{Config, WindowInfo};

    // Device capability trait
    pub use crate::graphics_device::GraphicsDevice;

    // Logging sub-module (types only, macros are exported at the crate root)
    pub mod log {
        pub use crate::log::{format_entry, DefaultLogger, LogEntry, LogSeverity, Logger};
    }

    // Device sub-module with all device types
    pub mod device {
        pub use crate::graphics_device::*;
    }

    // Frame sub-module
    pub mod frame {
        pub use crate::frame::*;
    }

    // Scene sub-module
    pub mod scene {
        pub use crate::scene::*;
    }
}

// Re-export math library at crate root
pub use glam;
