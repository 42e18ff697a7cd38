//! # Framebuffer Driver
//!
//! Negotiates a linear 32-bit framebuffer with the VideoCore firmware and
//! draws into it.
//!
//! Key properties:
//! - Pixels are addressed as `y * (pitch / 4) + x`; pitch may exceed
//!   `width * 4` and is authoritative.
//! - `set_pixel` returns false for out-of-bounds coordinates.
//! - No writes occur outside the `width × height` area.

use core::ptr::write_volatile;

use log::{info, warn};

use crate::graphics::{Color, DisplayBackend};
use crate::mailbox::{tags, Mailbox, MailboxError, Message, PropertyBuffer, CHANNEL_PROPERTY};
use crate::mmio::RegisterBus;

/// Only depth this driver draws with
pub const DEPTH_BITS: u32 = 32;

/// Pixel order requested from firmware (1 = RGB)
pub const PIXEL_ORDER_RGB: u32 = 1;

/// Buffer alignment requested with the allocate tag
pub const BUFFER_ALIGNMENT: u32 = 4096;

/// Requested display geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
}

impl DisplayMode {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Why firmware did not hand out a usable framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum NegotiationError {
    #[error("display negotiation failed: {0}")]
    Mailbox(#[from] MailboxError),
    #[error("display negotiation failed: firmware returned no buffer")]
    NullBuffer,
    #[error("display negotiation failed: got {width}x{height}")]
    EmptyGeometry { width: u32, height: u32 },
    #[error("display negotiation failed: depth {depth} is not 32 bpp")]
    UnsupportedDepth { depth: u32 },
    #[error("display negotiation failed: pitch {pitch} too small for width {width}")]
    InvalidPitch { pitch: u32, width: u32 },
    #[error("display negotiation failed: buffer of {size} bytes, {needed} needed")]
    BufferTooSmall { size: u32, needed: u64 },
    #[error("display negotiation failed: no display modes to try")]
    NoModes,
}

/// Framebuffer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferInfo {
    /// Physical base address of framebuffer
    pub base: usize,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Bytes per scanline (may be > width * 4 due to alignment)
    pub pitch: u32,
    /// Bits per pixel
    pub depth: u32,
    /// Total size in bytes
    pub size: u32,
}

impl FramebufferInfo {
    /// Row stride in pixels
    #[inline]
    pub const fn stride(&self) -> usize {
        (self.pitch / 4) as usize
    }

    /// Number of 32-bit words spanned by `height` rows
    pub const fn words(&self) -> usize {
        self.stride() * self.height as usize
    }
}

/// Ask firmware for a framebuffer of the given geometry.
///
/// Stateless: each call builds the whole request from scratch, so a failed
/// attempt can simply be retried with another mode.
pub fn negotiate<B: RegisterBus>(
    mailbox: &Mailbox<B>,
    buffer: &PropertyBuffer,
    mode: DisplayMode,
) -> Result<FramebufferInfo, NegotiationError> {
    let mut msg = Message::begin(buffer);

    // Physical and virtual size identical: no scrolling
    let physical = msg.tag(tags::SET_PHYSICAL_SIZE, 2, &[mode.width, mode.height]);
    msg.tag(tags::SET_VIRTUAL_SIZE, 2, &[mode.width, mode.height]);
    msg.tag(tags::SET_VIRTUAL_OFFSET, 2, &[0, 0]);
    let depth_tag = msg.tag(tags::SET_DEPTH, 1, &[DEPTH_BITS]);
    msg.tag(tags::SET_PIXEL_ORDER, 1, &[PIXEL_ORDER_RGB]);
    let allocate = msg.tag(tags::ALLOCATE_BUFFER, 2, &[BUFFER_ALIGNMENT, 0]);
    let pitch_tag = msg.tag(tags::GET_PITCH, 1, &[0]);
    msg.finish();

    mailbox.call(buffer, CHANNEL_PROPERTY)?;

    for (header, tag) in [(allocate, tags::ALLOCATE_BUFFER), (pitch_tag, tags::GET_PITCH)] {
        if !buffer.tag_acknowledged(header) {
            return Err(MailboxError::TagNotAcknowledged { tag }.into());
        }
    }

    // Extract results
    let width = buffer.get(physical + 3);
    let height = buffer.get(physical + 4);
    let depth = buffer.get(depth_tag + 3);
    let fb_gpu_addr = buffer.get(allocate + 3);
    let fb_size = buffer.get(allocate + 4);
    let pitch = buffer.get(pitch_tag + 3);

    if fb_gpu_addr == 0 || fb_size == 0 {
        return Err(NegotiationError::NullBuffer);
    }
    if width == 0 || height == 0 {
        return Err(NegotiationError::EmptyGeometry { width, height });
    }
    if depth != DEPTH_BITS {
        return Err(NegotiationError::UnsupportedDepth { depth });
    }
    if (pitch as u64) < width as u64 * 4 {
        return Err(NegotiationError::InvalidPitch { pitch, width });
    }
    let needed = pitch as u64 * height as u64;
    if (fb_size as u64) < needed {
        return Err(NegotiationError::BufferTooSmall { size: fb_size, needed });
    }

    if width != mode.width || height != mode.height {
        warn!(
            "requested {}x{}, firmware granted {}x{}",
            mode.width, mode.height, width, height
        );
    }

    Ok(FramebufferInfo {
        base: crate::gpu_to_arm(fb_gpu_addr),
        width,
        height,
        pitch,
        depth,
        size: fb_size,
    })
}

/// Try each mode in order until firmware grants one.
///
/// Returns the first success, or the error of the last attempt.
pub fn negotiate_with_fallback<B: RegisterBus>(
    mailbox: &Mailbox<B>,
    buffer: &PropertyBuffer,
    modes: &[DisplayMode],
) -> Result<FramebufferInfo, NegotiationError> {
    let mut last = NegotiationError::NoModes;
    for &mode in modes {
        match negotiate(mailbox, buffer, mode) {
            Ok(info) => {
                info!(
                    "framebuffer {}x{} @ {:#010x}, pitch={}",
                    info.width, info.height, info.base, info.pitch
                );
                return Ok(info);
            }
            Err(e) => {
                warn!("{}x{} rejected: {}", mode.width, mode.height, e);
                last = e;
            }
        }
    }
    Err(last)
}

/// Framebuffer handle for drawing operations
pub struct Framebuffer<'a> {
    info: FramebufferInfo,
    pixels: &'a mut [u32],
}

impl Framebuffer<'static> {
    /// Map the negotiated framebuffer memory
    ///
    /// # Safety
    /// `info` must come from a successful negotiation on this machine, the
    /// region must be identity-mapped, and no other handle may alias it.
    pub unsafe fn from_info(info: FramebufferInfo) -> Self {
        let pixels = core::slice::from_raw_parts_mut(info.base as *mut u32, info.words());
        Self { info, pixels }
    }
}

impl<'a> Framebuffer<'a> {
    /// Wrap an existing pixel buffer.
    ///
    /// Returns `None` if the geometry violates `pitch >= width * 4` or the
    /// buffer is shorter than `height` rows of `pitch` bytes.
    pub fn new(pixels: &'a mut [u32], width: u32, height: u32, pitch: u32) -> Option<Self> {
        let info = FramebufferInfo {
            base: pixels.as_ptr() as usize,
            width,
            height,
            pitch,
            depth: DEPTH_BITS,
            size: pitch.checked_mul(height)?,
        };
        if (pitch as u64) < width as u64 * 4 || pixels.len() < info.words() {
            return None;
        }
        Some(Self { info, pixels })
    }

    /// Get framebuffer info
    pub fn info(&self) -> &FramebufferInfo {
        &self.info
    }

    /// Get framebuffer dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        (self.info.width, self.info.height)
    }

    /// Read back a pixel
    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        if x >= self.info.width || y >= self.info.height {
            return None;
        }
        Some(Color::from_u32(self.pixels[self.offset(x, y)]))
    }

    /// Raw words, padding columns included
    pub fn as_slice(&self) -> &[u32] {
        self.pixels
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.info.stride() + x as usize
    }

    #[inline]
    fn store(&mut self, offset: usize, packed: u32) {
        unsafe { write_volatile(&mut self.pixels[offset], packed) }
    }

    /// Write a clipped horizontal span [x_start, x_end) on row y
    fn span(&mut self, x: u32, y: u32, len: u32, packed: u32) {
        if y >= self.info.height || x >= self.info.width {
            return;
        }
        let x_end = x.saturating_add(len).min(self.info.width);
        let row = self.offset(0, y);
        for px in x..x_end {
            self.store(row + px as usize, packed);
        }
    }
}

impl DisplayBackend for Framebuffer<'_> {
    fn width(&self) -> u32 {
        self.info.width
    }

    fn height(&self) -> u32 {
        self.info.height
    }

    #[inline]
    fn set_pixel(&mut self, x: u32, y: u32, color: Color) -> bool {
        if x >= self.info.width || y >= self.info.height {
            return false;
        }
        let offset = self.offset(x, y);
        self.store(offset, color.to_u32());
        true
    }

    /// Fill `width × height`, leaving pitch padding untouched
    fn clear(&mut self, color: Color) {
        let packed = color.to_u32();
        for y in 0..self.info.height {
            self.span(0, y, self.info.width, packed);
        }
    }

    fn hline(&mut self, x: u32, y: u32, len: u32, color: Color) {
        self.span(x, y, len, color.to_u32());
    }

    fn vline(&mut self, x: u32, y: u32, len: u32, color: Color) {
        if x >= self.info.width {
            return;
        }
        let packed = color.to_u32();
        let y_end = y.saturating_add(len).min(self.info.height);
        for py in y..y_end {
            let offset = self.offset(x, py);
            self.store(offset, packed);
        }
    }

    fn draw_filled_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: Color) {
        let packed = color.to_u32();
        let y_end = y.saturating_add(h).min(self.info.height);
        for py in y..y_end {
            self.span(x, py, w, packed);
        }
    }
}
