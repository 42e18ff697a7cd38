//! # LibreDash: Bare-Metal Dashboard Library for Raspberry Pi
//!
//! Renders dashboard gauges, value indicators, graphs and labels straight
//! into a framebuffer obtained from the VideoCore firmware, with no OS.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │        Dashboard Model & Renderer        │
//! │  (fixed arena, per-kind draw rules)      │
//! └──────────────┬──────────────────────────┘
//!                │ DisplayBackend
//! ┌──────────────┴──────────────────────────┐
//! │        Framebuffer (pitch-addressed)     │
//! └──────────────┬──────────────────────────┘
//!                │ negotiate
//! ┌──────────────┴──────────────────────────┐
//! │        Mailbox Driver (property tags)    │
//! └──────────────┬──────────────────────────┘
//!                │ RegisterBus
//! ┌──────────────┴──────────────────────────┐
//! │  BCM283x/BCM2711 MMIO  │  VideoCore GPU  │
//! └─────────────────────────────────────────┘
//! ```

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod dashboard;
pub mod demo;
pub mod ecu;
pub mod framebuffer;
pub mod graphics;
pub mod logger;
pub mod mailbox;
pub mod mmio;
pub mod render;
pub mod telemetry;
pub mod uart;

#[cfg(test)]
pub(crate) mod testing;

pub use dashboard::{DashElement, Dashboard, DashboardError, ElementKind, MAX_ELEMENTS};
pub use framebuffer::{Framebuffer, FramebufferInfo, NegotiationError};
pub use graphics::{Color, DisplayBackend};
pub use mailbox::{Mailbox, MailboxError, PropertyBuffer, PROPERTY_BUFFER};
pub use mmio::{Mmio, RegisterBus};

/// Peripheral base address (Raspberry Pi 4, BCM2711)
#[cfg(feature = "rpi4")]
pub const PERIPHERAL_BASE: usize = 0xFE00_0000;

/// Peripheral base address (Raspberry Pi 2/3, BCM2836/BCM2837)
#[cfg(not(feature = "rpi4"))]
pub const PERIPHERAL_BASE: usize = 0x3F00_0000;

/// Mailbox base address
pub const MAILBOX_BASE: usize = PERIPHERAL_BASE + 0xB880;

/// PL011 UART0 base address
pub const UART0_BASE: usize = PERIPHERAL_BASE + 0x20_1000;

/// GPIO base address
pub const GPIO_BASE: usize = PERIPHERAL_BASE + 0x20_0000;

/// GPU bus address to ARM physical address translation
///
/// The top two bits select the VideoCore cache alias and carry no
/// addressing information on the ARM side.
#[inline]
pub const fn gpu_to_arm(gpu_addr: u32) -> usize {
    (gpu_addr & 0x3FFF_FFFF) as usize
}

/// ARM physical address to GPU bus address translation
#[inline]
pub const fn arm_to_gpu(arm_addr: usize) -> u32 {
    // Uncached alias so the GPU sees our writes without a cache flush
    ((arm_addr as u32) & 0x3FFF_FFFF) | 0xC000_0000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_alias_round_trip() {
        assert_eq!(arm_to_gpu(0x0008_0000), 0xC008_0000);
        assert_eq!(gpu_to_arm(0xC008_0000), 0x0008_0000);
        assert_eq!(gpu_to_arm(0x7E00_1000), 0x3E00_1000);
    }

    #[test]
    fn test_register_blocks_follow_peripheral_base() {
        assert_eq!(MAILBOX_BASE - PERIPHERAL_BASE, 0xB880);
        assert_eq!(UART0_BASE - GPIO_BASE, 0x1000);
    }
}
