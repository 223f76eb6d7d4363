/// 8-bit RGBA color and named constants

use crate::graphics_device::ClearValue;

/// RGBA color with 8 bits per channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const CORNFLOWER_BLUE: Color = Color::rgba(100, 149, 237, 255);
    pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Normalized floating-point components in [0, 1]
    pub fn to_f32_array(&self) -> [f32; 4] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
            self.a as f32 / 255.0,
        ]
    }

    /// Color attachment clear value for this color
    pub fn to_clear_value(&self) -> ClearValue {
        ClearValue::Color(self.to_f32_array())
    }
}
