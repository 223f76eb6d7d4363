use super::*;
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

#[test]
fn test_clear_color_at_zero() {
    assert_eq!(oscillating_clear_color(0.0), Color::rgba(0, 255, 155, 255));
}

#[test]
fn test_clear_color_at_half_pi() {
    assert_eq!(oscillating_clear_color(FRAC_PI_2), Color::rgba(255, 0, 155, 255));
}

#[test]
fn test_clear_color_rounds_to_nearest() {
    // 255 * sin(pi/4) = 180.31
    let color = oscillating_clear_color(FRAC_PI_4);
    assert_eq!(color.r, 180);
    assert_eq!(color.g, 180);

    // 255 * |sin(1)| = 214.57, 255 * |cos(1)| = 137.78
    let color = oscillating_clear_color(1.0);
    assert_eq!(color.r, 215);
    assert_eq!(color.g, 138);
}

#[test]
fn test_clear_color_uses_absolute_value() {
    let negative = oscillating_clear_color(-1.0);
    let positive = oscillating_clear_color(1.0);
    assert_eq!(negative, positive);

    let color = oscillating_clear_color(PI + 1.0);
    assert_eq!(color.r, 215);
    assert_eq!(color.g, 138);
}

#[test]
fn test_clear_color_constant_channels_over_time() {
    let mut t = 0.0;
    while t < 20.0 {
        let color = oscillating_clear_color(t);
        assert_eq!(color.b, OFFSCREEN_CLEAR_BLUE);
        assert_eq!(color.a, 255);
        t += 0.173;
    }
}

#[test]
fn test_clear_color_non_finite_time() {
    let color = oscillating_clear_color(f64::NAN);
    assert_eq!((color.r, color.g, color.b, color.a), (0, 0, 155, 255));
}
