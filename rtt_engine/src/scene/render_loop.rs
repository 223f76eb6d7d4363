/// Render loop driving the scene on a background thread
///
/// One frame in flight: each iteration ticks game time, acquires a
/// swapchain image, updates the scene, runs the two-pass protocol and
/// presents. Any failure along the way drops that frame only.

use std::fmt;
use std::thread::{self, JoinHandle};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::frame::{CancellationToken, FrameError, GameTime, TelemetrySlot};
use crate::graphics_device::GraphicsDevice;
use crate::scene::RenderToTargetScene;
use crate::{engine_info, engine_trace, engine_warn};

const SOURCE: &str = "rtt::RenderLoop";

/// Name of the thread started by `spawn_render_thread`
pub const RENDER_THREAD_NAME: &str = "rtt-render";

/// Why a frame was dropped
#[derive(Debug, Clone)]
pub enum FrameDrop {
    Acquire(Error),
    Update(Error),
    Protocol(FrameError),
    Present(Error),
}

impl fmt::Display for FrameDrop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameDrop::Acquire(e) => write!(f, "Error on acquiring next image: {}", e),
            FrameDrop::Update(e) => write!(f, "Error on updating scene: {}", e),
            FrameDrop::Protocol(e) => write!(f, "{}", e),
            FrameDrop::Present(e) => write!(f, "Error on presenting: {}", e),
        }
    }
}

/// Result of one loop iteration
#[derive(Debug, Clone)]
pub enum FrameOutcome {
    Presented { image_index: u32 },
    Dropped(FrameDrop),
}

impl FrameOutcome {
    pub fn is_presented(&self) -> bool {
        matches!(self, FrameOutcome::Presented { .. })
    }
}

/// Frame counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopStats {
    pub frames: u64,
    pub presented: u64,
    pub dropped: u64,
}

/// Owns the device and the scene for the lifetime of the render thread
pub struct RenderLoop {
    device: Box<dyn GraphicsDevice>,
    scene: RenderToTargetScene,
    game_time: GameTime,
    stats: LoopStats,
    shut_down: bool,
}

impl RenderLoop {
    pub fn new(device: Box<dyn GraphicsDevice>, config: &Config, telemetry: TelemetrySlot) -> Self {
        let mut game_time = GameTime::new();
        game_time.set_fixed_time_step(config.fixed_time_step);

        Self {
            device,
            scene: RenderToTargetScene::new(config, telemetry),
            game_time,
            stats: LoopStats::default(),
            shut_down: false,
        }
    }

    /// Load the scene; the loop cannot run without it
    pub fn load(&mut self) -> Result<()> {
        let info = self.device.info();
        engine_info!(SOURCE, "Loading scene on {} ({})", info.name, info.backend);
        self.scene.load(self.device.as_mut())
    }

    /// Run one frame
    pub fn run_frame(&mut self) -> FrameOutcome {
        self.stats.frames += 1;
        let outcome = self.frame();

        match &outcome {
            FrameOutcome::Presented { image_index } => {
                self.stats.presented += 1;
                engine_trace!(SOURCE, "Frame {} presented image {}", self.stats.frames, image_index);
            }
            FrameOutcome::Dropped(reason) => {
                self.stats.dropped += 1;
                engine_warn!(SOURCE, "Rendered unsuccessfully: {}", reason);
            }
        }
        outcome
    }

    fn frame(&mut self) -> FrameOutcome {
        self.game_time.tick(|_| {});

        let image_index = match self.device.acquire_next_image() {
            Ok(index) => index,
            Err(e) => return FrameOutcome::Dropped(FrameDrop::Acquire(e)),
        };

        if let Err(e) = self.scene.update(self.device.as_mut(), &self.game_time) {
            return FrameOutcome::Dropped(FrameDrop::Update(e));
        }

        if let Err(e) = self.scene.pre_render(self.device.as_mut(), image_index) {
            return FrameOutcome::Dropped(FrameDrop::Protocol(e));
        }

        match self.device.present(image_index) {
            Ok(()) => FrameOutcome::Presented { image_index },
            Err(e) => FrameOutcome::Dropped(FrameDrop::Present(e)),
        }
    }

    /// Run frames until `token` is cancelled, then shut down
    pub fn run(&mut self, token: &CancellationToken) -> LoopStats {
        while !token.is_cancelled() {
            self.run_frame();
        }
        self.shutdown();
        self.stats
    }

    /// Wait for the device to go idle and release the scene
    ///
    /// Returns the number of resources released; later calls return 0.
    pub fn shutdown(&mut self) -> usize {
        if self.shut_down {
            return 0;
        }
        self.shut_down = true;

        if let Err(e) = self.device.wait_idle() {
            engine_warn!(SOURCE, "Error on waiting for device idle: {}", e);
        }
        let released = self.scene.release(self.device.as_mut());
        engine_info!(SOURCE, "Render loop stopped ({} frames, {} presented, {} dropped)",
            self.stats.frames, self.stats.presented, self.stats.dropped);
        released
    }

    // ===== ACCESSORS =====

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn scene(&self) -> &RenderToTargetScene {
        &self.scene
    }

    pub fn game_time(&self) -> &GameTime {
        &self.game_time
    }

    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }
}

/// Load the scene and run the render loop on a named background thread
///
/// The thread returns the final counters, or the load error (resources
/// already released) if the scene could not be loaded.
///
/// # Errors
///
/// Returns `InitializationFailed` if the thread cannot be spawned.
pub fn spawn_render_thread(
    device: Box<dyn GraphicsDevice>,
    config: Config,
    telemetry: TelemetrySlot,
    token: CancellationToken,
) -> Result<JoinHandle<Result<LoopStats>>> {
    thread::Builder::new()
        .name(RENDER_THREAD_NAME.to_string())
        .spawn(move || {
            let mut render_loop = RenderLoop::new(device, &config, telemetry);
            render_loop.load()?;
            Ok(render_loop.run(&token))
        })
        .map_err(|e| Error::InitializationFailed(format!("Cannot spawn render thread: {}", e)))
}

#[cfg(test)]
#[path = "render_loop_tests.rs"]
mod tests;
