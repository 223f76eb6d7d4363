/// Frame module - per-frame timing, synchronization and telemetry

pub mod sync_pair;
pub mod two_pass;
pub mod clear_color;
pub mod game_time;
pub mod telemetry;
pub mod cancellation;

pub use sync_pair::SyncPair;
pub use two_pass::{FrameError, FrameSubmission, TwoPassSubmitter};
pub use clear_color::{oscillating_clear_color, OFFSCREEN_CLEAR_BLUE};
pub use game_time::{GameTime, TICKS_PER_SECOND};
pub use telemetry::{TelemetrySlot, TelemetrySnapshot};
pub use cancellation::CancellationToken;
