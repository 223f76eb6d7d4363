/// Clear color of the offscreen pass

use crate::graphics_device::Color;

/// Constant blue channel of the offscreen clear color
pub const OFFSCREEN_CLEAR_BLUE: u8 = 155;

/// Clear color at `total_seconds` of game time
///
/// `r = round(|sin t| * 255)`, `g = round(|cos t| * 255)`, blue and alpha
/// are constant. A non-finite `t` yields black channels.
pub fn oscillating_clear_color(total_seconds: f64) -> Color {
    Color::rgba(
        channel(total_seconds.sin()),
        channel(total_seconds.cos()),
        OFFSCREEN_CLEAR_BLUE,
        255,
    )
}

fn channel(value: f64) -> u8 {
    // Saturating cast: NaN maps to 0
    (value.abs() * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
#[path = "clear_color_tests.rs"]
mod tests;
