//! Per-kind drawing rules for dashboard elements.
//!
//! Every element gets a black background and a one-pixel outline in its
//! own color; the kind decides what goes inside.

use libm::roundf;

use crate::dashboard::{DashElement, ElementKind};
use crate::graphics::{Color, DisplayBackend};

/// Value indicator turns yellow from this fraction of the range
pub const WARNING_THRESHOLD: f32 = 0.6;

/// Value indicator turns red above this fraction of the range
pub const DANGER_THRESHOLD: f32 = 0.8;

/// Gauge fill inset from each edge
pub const GAUGE_INSET: u32 = 2;

/// Value indicator inset from the top-left corner
pub const INDICATOR_INSET: u32 = 5;

/// Value indicator bar width
pub const INDICATOR_WIDTH: u32 = 20;

/// Horizontal distance between graph grid dots
pub const GRID_SPACING: u32 = 4;

/// Graph grid dot color
pub const GRID_COLOR: Color = Color::GRAY;

/// Position of `value` within `[min, max]`, clamped to `0.0..=1.0`.
///
/// A degenerate range (`max == min`) or any non-finite intermediate
/// yields 0.
pub fn fill_fraction(value: f32, min: f32, max: f32) -> f32 {
    let span = max - min;
    if span == 0.0 {
        return 0.0;
    }
    let fraction = (value - min) / span;
    if !fraction.is_finite() {
        return 0.0;
    }
    fraction.clamp(0.0, 1.0)
}

/// Color band of a value indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Normal,
    Warning,
    Danger,
}

impl Zone {
    pub fn from_fraction(fraction: f32) -> Self {
        if fraction > DANGER_THRESHOLD {
            Zone::Danger
        } else if fraction >= WARNING_THRESHOLD {
            Zone::Warning
        } else {
            Zone::Normal
        }
    }

    pub const fn color(self) -> Color {
        match self {
            Zone::Normal => Color::GREEN,
            Zone::Warning => Color::YELLOW,
            Zone::Danger => Color::RED,
        }
    }
}

/// Width in pixels of a gauge's fill bar
pub fn gauge_fill_width(element: &DashElement) -> u32 {
    let inner = element.width.saturating_sub(2 * GAUGE_INSET);
    let fraction = fill_fraction(element.value, element.min, element.max);
    // fraction is in [0, 1], so the product never exceeds `inner`
    roundf(fraction * inner as f32) as u32
}

/// Draw one element onto `target`
pub fn draw_element<D: DisplayBackend + ?Sized>(target: &mut D, element: &DashElement) {
    draw_frame(target, element);
    match element.kind {
        ElementKind::Gauge => draw_gauge(target, element),
        ElementKind::Value => draw_value(target, element),
        ElementKind::Graph => draw_graph(target, element),
        ElementKind::Label => {}
    }
}

fn draw_frame<D: DisplayBackend + ?Sized>(target: &mut D, el: &DashElement) {
    target.draw_filled_rect(el.x, el.y, el.width, el.height, Color::BLACK);
    target.draw_outline_rect(el.x, el.y, el.width, el.height, el.color);
}

fn draw_gauge<D: DisplayBackend + ?Sized>(target: &mut D, el: &DashElement) {
    let fill = gauge_fill_width(el);
    let height = el.height.saturating_sub(2 * GAUGE_INSET);
    if fill == 0 || height == 0 {
        return;
    }
    target.draw_filled_rect(
        el.x.saturating_add(GAUGE_INSET),
        el.y.saturating_add(GAUGE_INSET),
        fill,
        height,
        el.color,
    );
}

fn draw_value<D: DisplayBackend + ?Sized>(target: &mut D, el: &DashElement) {
    if el.width <= 2 * INDICATOR_INSET || el.height <= 2 * INDICATOR_INSET {
        return;
    }
    let zone = Zone::from_fraction(fill_fraction(el.value, el.min, el.max));
    // Keep clear of the right-hand outline on narrow elements
    let width = INDICATOR_WIDTH.min(el.width - INDICATOR_INSET - 1);
    target.draw_filled_rect(
        el.x.saturating_add(INDICATOR_INSET),
        el.y.saturating_add(INDICATOR_INSET),
        width,
        el.height - 2 * INDICATOR_INSET,
        zone.color(),
    );
}

fn draw_graph<D: DisplayBackend + ?Sized>(target: &mut D, el: &DashElement) {
    let start = el.x.saturating_add(2);
    let end = el.x.saturating_add(el.width).saturating_sub(2);
    for i in 1..4u64 {
        let row = el.y as u64 + el.height as u64 * i / 4;
        let Ok(row) = u32::try_from(row) else {
            break;
        };
        for x in (start..end).step_by(GRID_SPACING as usize) {
            target.set_pixel(x, row, GRID_COLOR);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framebuffer::Framebuffer;

    fn canvas(width: u32, height: u32) -> Vec<u32> {
        vec![0u32; (width * height) as usize]
    }

    #[test]
    fn test_fill_fraction_clamps() {
        assert_eq!(fill_fraction(50.0, 0.0, 100.0), 0.5);
        assert_eq!(fill_fraction(-10.0, 0.0, 100.0), 0.0);
        assert_eq!(fill_fraction(150.0, 0.0, 100.0), 1.0);
        // Negative ranges, as for boost/vacuum
        assert_eq!(fill_fraction(-15.0, -15.0, 30.0), 0.0);
        assert_eq!(fill_fraction(7.5, -15.0, 30.0), 0.5);
        assert_eq!(fill_fraction(30.0, -15.0, 30.0), 1.0);
        assert_eq!(fill_fraction(-40.0, -60.0, -40.0), 1.0);
    }

    #[test]
    fn test_fill_fraction_is_monotonic() {
        let mut previous = 0.0;
        for step in 0..=200 {
            let value = -20.0 + step as f32 * 0.25;
            let fraction = fill_fraction(value, -15.0, 30.0);
            assert!(fraction >= previous, "{} dropped at {}", fraction, value);
            previous = fraction;
        }
        assert_eq!(previous, 1.0);
    }

    #[test]
    fn test_fill_fraction_degenerate_range() {
        assert_eq!(fill_fraction(5.0, 10.0, 10.0), 0.0);
        assert_eq!(fill_fraction(f32::NAN, 0.0, 100.0), 0.0);
        assert_eq!(fill_fraction(f32::INFINITY, 0.0, f32::INFINITY), 0.0);
    }

    #[test]
    fn test_zone_boundaries() {
        assert_eq!(Zone::from_fraction(0.0), Zone::Normal);
        assert_eq!(Zone::from_fraction(0.59), Zone::Normal);
        assert_eq!(Zone::from_fraction(0.6), Zone::Warning);
        assert_eq!(Zone::from_fraction(0.8), Zone::Warning);
        assert_eq!(Zone::from_fraction(0.81), Zone::Danger);
        assert_eq!(Zone::Danger.color(), Color::RED);
    }

    #[test]
    fn test_gauge_fill_width_rounds() {
        let el = DashElement::gauge(0, 0, 400, 60, Color::GREEN).with_value(75.0);
        assert_eq!(gauge_fill_width(&el), 297);

        // 1/3 of 96 is exactly 32; 0.5 of 7 rounds up to 4
        let el = DashElement::gauge(0, 0, 100, 10, Color::GREEN).with_range(0.0, 3.0).with_value(1.0);
        assert_eq!(gauge_fill_width(&el), 32);
        let el = DashElement::gauge(0, 0, 11, 10, Color::GREEN).with_value(50.0);
        assert_eq!(gauge_fill_width(&el), 4);
    }

    #[test]
    fn test_gauge_at_minimum_draws_no_fill() {
        let mut pixels = canvas(50, 20);
        let mut fb = Framebuffer::new(&mut pixels, 50, 20, 200).unwrap();
        let el = DashElement::gauge(0, 0, 40, 10, Color::GREEN).with_value(0.0);

        draw_element(&mut fb, &el);
        assert_eq!(fb.pixel(0, 0), Some(Color::GREEN));
        assert_eq!(fb.pixel(2, 2), Some(Color::BLACK));
    }

    #[test]
    fn test_value_indicator_is_clipped_to_interior() {
        let mut pixels = canvas(40, 40);
        let mut fb = Framebuffer::new(&mut pixels, 40, 40, 160).unwrap();
        let el = DashElement::value(0, 0, 16, 16, Color::CYAN).with_value(10.0);

        draw_element(&mut fb, &el);
        assert_eq!(fb.pixel(5, 5), Some(Color::GREEN));
        assert_eq!(fb.pixel(14, 10), Some(Color::GREEN));
        // Outline survives
        assert_eq!(fb.pixel(15, 10), Some(Color::CYAN));
    }

    #[test]
    fn test_small_value_element_has_no_indicator() {
        let mut pixels = canvas(20, 20);
        let mut fb = Framebuffer::new(&mut pixels, 20, 20, 80).unwrap();
        let el = DashElement::value(0, 0, 10, 12, Color::CYAN).with_value(99.0);

        draw_element(&mut fb, &el);
        assert!(fb.as_slice().iter().all(|&p| p != Color::RED.to_u32()));
    }

    #[test]
    fn test_graph_grid_dots() {
        let mut pixels = canvas(40, 40);
        let mut fb = Framebuffer::new(&mut pixels, 40, 40, 160).unwrap();
        let el = DashElement::graph(0, 0, 20, 20, Color::YELLOW);

        draw_element(&mut fb, &el);
        for row in [5, 10, 15] {
            for x in [2, 6, 10, 14] {
                assert_eq!(fb.pixel(x, row), Some(GRID_COLOR), "dot at ({}, {})", x, row);
            }
            assert_eq!(fb.pixel(3, row), Some(Color::BLACK));
            // 18 is not < 20 - 2
            assert_eq!(fb.pixel(18, row), Some(Color::BLACK));
        }
        assert_eq!(fb.pixel(2, 4), Some(Color::BLACK));
    }

    #[test]
    fn test_label_is_frame_only() {
        let mut pixels = canvas(10, 10);
        let mut fb = Framebuffer::new(&mut pixels, 10, 10, 40).unwrap();
        fb.clear(Color::BLUE);
        let el = DashElement::label(1, 1, 8, 8, Color::WHITE).with_label("Status");

        draw_element(&mut fb, &el);
        assert_eq!(fb.pixel(0, 0), Some(Color::BLUE));
        assert_eq!(fb.pixel(1, 1), Some(Color::WHITE));
        assert_eq!(fb.pixel(4, 4), Some(Color::BLACK));
    }
}
