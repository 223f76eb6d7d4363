/// Application and window configuration

use std::path::PathBuf;
use std::time::Duration;
use winit::window::Window;
use crate::error::{Error, Result};
use crate::graphics_device::TextureFormat;

/// Presentation window description handed to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowInfo {
    /// Opaque window system id
    pub window_id: u64,
    pub width: u32,
    pub height: u32,
    pub v_sync: bool,
    pub fullscreen: bool,
    pub swap_chain_format: TextureFormat,
    /// Whether swapchain images must be CPU readable
    pub cpu_access_swap_chain_buffer: bool,
}

impl Default for WindowInfo {
    fn default() -> Self {
        Self {
            window_id: 0,
            width: 800,
            height: 600,
            v_sync: true,
            fullscreen: false,
            swap_chain_format: TextureFormat::B8G8R8A8_UNORM,
            cpu_access_swap_chain_buffer: false,
        }
    }
}

impl WindowInfo {
    /// Describe an open winit window, keeping the other defaults
    pub fn from_window(window: &Window) -> Self {
        let size = window.inner_size();
        Self {
            window_id: u64::from(window.id()),
            width: size.width,
            height: size.height,
            fullscreen: window.fullscreen().is_some(),
            ..Self::default()
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Application name (window title)
    pub app_name: String,
    /// Root directory of the shader binaries and other content
    pub content_path: PathBuf,
    /// Directory for log files
    pub log_path: PathBuf,
    /// Enable GPU debugging/validation
    pub debug_gpu: bool,
    /// Presentation window
    pub window: WindowInfo,
    /// Bound on every fence wait of the frame protocol
    pub fence_timeout: Duration,
    /// Refresh period of the telemetry panel
    pub telemetry_interval: Duration,
    /// Advance game time in fixed steps instead of variable ones
    pub fixed_time_step: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "Render To Target".to_string(),
            content_path: PathBuf::from("content"),
            log_path: PathBuf::from("logs"),
            debug_gpu: cfg!(debug_assertions),
            window: WindowInfo::default(),
            fence_timeout: Duration::from_secs(1),
            telemetry_interval: Duration::from_millis(50),
            fixed_time_step: false,
        }
    }
}

impl Config {
    /// Path of a shader binary under `<content_path>/shaders/`
    pub fn shader_path(&self, file_name: &str) -> PathBuf {
        self.content_path.join("shaders").join(file_name)
    }

    /// Reject configurations the engine cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.app_name.trim().is_empty() {
            return Err(Error::InitializationFailed("Application name is empty".to_string()));
        }
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::InitializationFailed(format!(
                "Window extent {}x{} is empty",
                self.window.width, self.window.height
            )));
        }
        if self.window.swap_chain_format.is_depth() {
            return Err(Error::InitializationFailed(format!(
                "Swapchain format {:?} is not a color format",
                self.window.swap_chain_format
            )));
        }
        if self.fence_timeout.is_zero() {
            return Err(Error::InitializationFailed("Fence timeout must be positive".to_string()));
        }
        if self.telemetry_interval.is_zero() {
            return Err(Error::InitializationFailed("Telemetry interval must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
