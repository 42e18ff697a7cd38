//! # Graphics Primitives
//!
//! Colors and the drawing interface the dashboard renders through.
//!
//! Every primitive clips per pixel: anything outside `width × height` is
//! silently skipped, never an error.

/// 24-bit RGB color, packed as `0x00RRGGBB` in the framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Pack into a framebuffer word
    #[inline]
    pub const fn to_u32(&self) -> u32 {
        ((self.r as u32) << 16) | ((self.g as u32) << 8) | (self.b as u32)
    }

    /// Unpack a framebuffer word, ignoring the top byte
    pub const fn from_u32(packed: u32) -> Self {
        Self {
            r: ((packed >> 16) & 0xFF) as u8,
            g: ((packed >> 8) & 0xFF) as u8,
            b: (packed & 0xFF) as u8,
        }
    }

    // Predefined colors
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const CYAN: Color = Color::rgb(0, 255, 255);
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const ORANGE: Color = Color::rgb(255, 165, 0);
}

impl From<u32> for Color {
    fn from(packed: u32) -> Self {
        Self::from_u32(packed)
    }
}

/// Drawing target for the dashboard renderer.
///
/// Implementors supply geometry, `set_pixel` and `clear`; the rectangle
/// helpers default to per-pixel loops and may be overridden with faster
/// clipped versions.
pub trait DisplayBackend {
    /// Get display width in pixels
    fn width(&self) -> u32;

    /// Get display height in pixels
    fn height(&self) -> u32;

    /// Set a pixel at (x, y)
    /// Returns false (and draws nothing) if out of bounds
    fn set_pixel(&mut self, x: u32, y: u32, color: Color) -> bool;

    /// Fill the whole `width × height` area
    fn clear(&mut self, color: Color);

    /// Draw a horizontal line
    fn hline(&mut self, x: u32, y: u32, len: u32, color: Color) {
        for i in 0..len {
            match x.checked_add(i) {
                Some(px) => self.set_pixel(px, y, color),
                None => break,
            };
        }
    }

    /// Draw a vertical line
    fn vline(&mut self, x: u32, y: u32, len: u32, color: Color) {
        for i in 0..len {
            match y.checked_add(i) {
                Some(py) => self.set_pixel(x, py, color),
                None => break,
            };
        }
    }

    /// Draw the one-pixel boundary of a rectangle
    fn draw_outline_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Color) {
        if w == 0 || h == 0 {
            return;
        }

        // Top and bottom
        self.hline(x, y, w, color);
        if let Some(bottom) = y.checked_add(h - 1) {
            self.hline(x, bottom, w, color);
        }

        // Left and right
        self.vline(x, y, h, color);
        if let Some(right) = x.checked_add(w - 1) {
            self.vline(right, y, h, color);
        }
    }

    /// Fill a rectangle
    fn draw_filled_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Color) {
        for j in 0..h {
            match y.checked_add(j) {
                Some(py) => self.hline(x, py, w, color),
                None => break,
            }
        }
    }
}
