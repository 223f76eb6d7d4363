/// Tick-based game clock
///
/// Time is counted in ticks of 100 ns. Each `tick` measures the wall-clock
/// delta since the previous call and advances the clock either by that
/// delta (variable step) or by as many whole target steps as fit
/// (fixed step), invoking the update callback once per advance.

use std::time::{Duration, Instant};

/// Clock resolution
pub const TICKS_PER_SECOND: u64 = 10_000_000;

/// Default fixed step (60 Hz)
const DEFAULT_TARGET_ELAPSED_TICKS: u64 = TICKS_PER_SECOND / 60;

/// Deltas longer than this are clamped (debugger pauses, window drags)
const DEFAULT_MAX_DELTA_TICKS: u64 = TICKS_PER_SECOND / 10;

/// Deltas this close to the target step are snapped onto it
const FIXED_STEP_SNAP_TICKS: u64 = TICKS_PER_SECOND / 4000;

/// Game clock
#[derive(Debug, Clone)]
pub struct GameTime {
    last_time: Option<Instant>,
    max_delta_ticks: u64,

    elapsed_ticks: u64,
    total_ticks: u64,
    left_over_ticks: u64,

    frame_count: u32,
    frames_per_second: u32,
    frames_this_second: u32,
    seconds_counter: u64,

    fixed_time_step: bool,
    target_elapsed_ticks: u64,
}

impl Default for GameTime {
    fn default() -> Self {
        Self::new()
    }
}

impl GameTime {
    pub fn new() -> Self {
        Self {
            last_time: None,
            max_delta_ticks: DEFAULT_MAX_DELTA_TICKS,
            elapsed_ticks: 0,
            total_ticks: 0,
            left_over_ticks: 0,
            frame_count: 0,
            frames_per_second: 0,
            frames_this_second: 0,
            seconds_counter: 0,
            fixed_time_step: false,
            target_elapsed_ticks: DEFAULT_TARGET_ELAPSED_TICKS,
        }
    }

    // ===== GETTERS =====

    /// Ticks covered by the last update
    pub fn elapsed_ticks(&self) -> u64 {
        self.elapsed_ticks
    }

    pub fn elapsed_seconds(&self) -> f64 {
        ticks_to_seconds(self.elapsed_ticks)
    }

    /// Ticks accumulated since the first tick
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    pub fn total_seconds(&self) -> f64 {
        ticks_to_seconds(self.total_ticks)
    }

    /// Number of updates so far
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    /// Frames counted during the last whole second
    pub fn frames_per_second(&self) -> u32 {
        self.frames_per_second
    }

    pub fn fixed_time_step(&self) -> bool {
        self.fixed_time_step
    }

    pub fn target_elapsed_ticks(&self) -> u64 {
        self.target_elapsed_ticks
    }

    // ===== SETTERS =====

    pub fn set_fixed_time_step(&mut self, enabled: bool) {
        self.fixed_time_step = enabled;
    }

    /// Set the fixed step length; zero is ignored
    pub fn set_target_elapsed_ticks(&mut self, ticks: u64) {
        if ticks > 0 {
            self.target_elapsed_ticks = ticks;
        }
    }

    pub fn set_target_elapsed_seconds(&mut self, seconds: f64) {
        self.set_target_elapsed_ticks(seconds_to_ticks(seconds));
    }

    /// Clamp applied to every measured delta
    pub fn set_max_delta(&mut self, max_delta: Duration) {
        self.max_delta_ticks = duration_to_ticks(max_delta).max(1);
    }

    /// Forget the last measurement so a long pause is not counted as a delta
    pub fn reset_elapsed_time(&mut self) {
        self.last_time = None;
        self.left_over_ticks = 0;
        self.frames_per_second = 0;
        self.frames_this_second = 0;
        self.seconds_counter = 0;
    }

    // ===== TICK =====

    /// Advance the clock to now
    pub fn tick(&mut self, update: impl FnMut(&GameTime)) {
        self.tick_at(Instant::now(), update);
    }

    /// Advance the clock to `now`, calling `update` once per advance
    ///
    /// In variable-step mode `update` runs once per call (except the very
    /// first call, which only starts the clock). In fixed-step mode it runs
    /// zero or more times, once per whole target step accumulated.
    pub fn tick_at(&mut self, now: Instant, mut update: impl FnMut(&GameTime)) {
        let Some(last_time) = self.last_time.replace(now) else {
            return;
        };

        let measured = duration_to_ticks(now.saturating_duration_since(last_time));
        let mut delta = measured.min(self.max_delta_ticks);
        self.seconds_counter += measured;

        let last_frame_count = self.frame_count;

        if self.fixed_time_step {
            if delta.abs_diff(self.target_elapsed_ticks) < FIXED_STEP_SNAP_TICKS {
                delta = self.target_elapsed_ticks;
            }
            self.left_over_ticks += delta;

            while self.left_over_ticks >= self.target_elapsed_ticks {
                self.elapsed_ticks = self.target_elapsed_ticks;
                self.total_ticks += self.target_elapsed_ticks;
                self.left_over_ticks -= self.target_elapsed_ticks;
                self.frame_count = self.frame_count.wrapping_add(1);
                update(self);
            }
        } else {
            self.elapsed_ticks = delta;
            self.total_ticks += delta;
            self.left_over_ticks = 0;
            self.frame_count = self.frame_count.wrapping_add(1);
            update(self);
        }

        if self.frame_count != last_frame_count {
            self.frames_this_second += 1;
        }

        if self.seconds_counter >= TICKS_PER_SECOND {
            self.frames_per_second = self.frames_this_second;
            self.frames_this_second = 0;
            self.seconds_counter %= TICKS_PER_SECOND;
        }
    }
}

fn ticks_to_seconds(ticks: u64) -> f64 {
    ticks as f64 / TICKS_PER_SECOND as f64
}

fn seconds_to_ticks(seconds: f64) -> u64 {
    (seconds.max(0.0) * TICKS_PER_SECOND as f64).round() as u64
}

fn duration_to_ticks(duration: Duration) -> u64 {
    (duration.as_nanos() / 100).min(u64::MAX as u128) as u64
}

#[cfg(test)]
#[path = "game_time_tests.rs"]
mod tests;
