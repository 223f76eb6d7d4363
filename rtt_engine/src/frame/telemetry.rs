/// Frame telemetry shared with the GUI thread

use std::sync::{Arc, Mutex, PoisonError};
use crate::frame::GameTime;

/// Timing figures of one frame
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetrySnapshot {
    pub fps: u32,
    /// Seconds covered by the last update
    pub frame_time: f64,
    /// Seconds of game time since start
    pub total_time: f64,
}

impl TelemetrySnapshot {
    pub fn from_game_time(time: &GameTime) -> Self {
        Self {
            fps: time.frames_per_second(),
            frame_time: time.elapsed_seconds(),
            total_time: time.total_seconds(),
        }
    }

    /// Text for the debug window title
    pub fn title_text(&self) -> String {
        format!(
            "FPS: {} | FrameTime: {:.4} | TotalTime: {:.2}",
            self.fps, self.frame_time, self.total_time
        )
    }
}

/// Single-slot, last-write-wins mailbox for telemetry
///
/// The render thread publishes every frame, the GUI thread reads on its own
/// timer. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct TelemetrySlot {
    latest: Arc<Mutex<Option<TelemetrySnapshot>>>,
}

impl TelemetrySlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current snapshot
    pub fn publish(&self, snapshot: TelemetrySnapshot) {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }

    /// Most recent snapshot, if any frame has been published
    pub fn latest(&self) -> Option<TelemetrySnapshot> {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod tests;
