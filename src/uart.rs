//! # PL011 UART Driver
//!
//! UART0 on GPIO 14/15 (ALT0). Transmit backs the logger; the polled
//! receive side carries the ECU link.
//!
//! A byte that cannot be queued within the spin limit is dropped: console
//! output must never stall the render loop. Receives time out the same way.

use core::fmt;

use crate::mmio::{Mmio, RegisterBus};

/// UART0 register offsets
pub(crate) const UART_DR: usize = 0x00;
pub(crate) const UART_FR: usize = 0x18;
const UART_IBRD: usize = 0x24;
const UART_FBRD: usize = 0x28;
const UART_LCRH: usize = 0x2C;
const UART_CR: usize = 0x30;
const UART_ICR: usize = 0x44;

/// GPIO register offsets
const GPFSEL1: usize = 0x04;
const GPPUD: usize = 0x94;
const GPPUDCLK0: usize = 0x98;

/// Flag register: receive FIFO empty
pub(crate) const FR_RXFE: u32 = 1 << 4;
/// Flag register: transmit FIFO full
pub(crate) const FR_TXFF: u32 = 1 << 5;

/// Line control: FIFOs on, 8 data bits
const LCRH_FEN_8BIT: u32 = (1 << 4) | (3 << 5);

/// Control: UART, TX and RX enabled
const CR_ENABLE: u32 = (1 << 0) | (1 << 8) | (1 << 9);

/// Clear every pending interrupt
const ICR_ALL: u32 = 0x7FF;

/// Polls of the flag register before a byte is dropped
const TX_SPIN_LIMIT: u32 = 100_000;

/// Upper bound on bytes discarded by one `flush_rx`
const RX_FIFO_DRAIN_LIMIT: usize = 4096;

/// Cycles to hold the pull-up/down control signal
const GPIO_SETTLE_CYCLES: u32 = 150;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum UartError {
    #[error("baud rate {baud} not reachable from a {clock_hz} Hz clock")]
    InvalidBaud { baud: u32, clock_hz: u32 },
}

/// Integer and fractional baud divisors: `clock / (16 * baud)` in 16.6
/// fixed point, rounded to nearest.
pub fn baud_divisors(clock_hz: u32, baud: u32) -> Result<(u32, u32), UartError> {
    let invalid = UartError::InvalidBaud { baud, clock_hz };
    if baud == 0 {
        return Err(invalid);
    }
    let scaled = (clock_hz as u64 * 8 / baud as u64 + 1) / 2;
    let integer = (scaled >> 6) as u32;
    if integer == 0 || integer > 0xFFFF {
        return Err(invalid);
    }
    Ok((integer, (scaled & 0x3F) as u32))
}

/// PL011 driver, polled in both directions
pub struct Uart<B: RegisterBus = Mmio> {
    bus: B,
    base: usize,
}

impl<B: RegisterBus> Uart<B> {
    pub const fn new(bus: B, base: usize) -> Self {
        Self { bus, base }
    }

    /// Route GPIO 14/15 to the UART and program 8N1 at `baud`
    pub fn init(&mut self, gpio_base: usize, clock_hz: u32, baud: u32) -> Result<(), UartError> {
        let (integer, fraction) = baud_divisors(clock_hz, baud)?;

        self.write_reg(UART_CR, 0);

        // GPIO 14 and 15 to ALT0
        let mut sel = self.bus.read(gpio_base + GPFSEL1);
        sel &= !((7 << 12) | (7 << 15));
        sel |= (4 << 12) | (4 << 15);
        self.bus.write(gpio_base + GPFSEL1, sel);

        // No pull-up/down on either pin
        self.bus.write(gpio_base + GPPUD, 0);
        settle();
        self.bus.write(gpio_base + GPPUDCLK0, (1 << 14) | (1 << 15));
        settle();
        self.bus.write(gpio_base + GPPUDCLK0, 0);

        self.write_reg(UART_ICR, ICR_ALL);
        self.write_reg(UART_IBRD, integer);
        self.write_reg(UART_FBRD, fraction);
        self.write_reg(UART_LCRH, LCRH_FEN_8BIT);
        self.write_reg(UART_CR, CR_ENABLE);
        Ok(())
    }

    #[inline]
    fn read_reg(&self, offset: usize) -> u32 {
        self.bus.read(self.base + offset)
    }

    #[inline]
    fn write_reg(&self, offset: usize, value: u32) {
        self.bus.write(self.base + offset, value)
    }

    /// Queue one byte; returns false if the FIFO stayed full
    pub fn write_byte(&self, byte: u8) -> bool {
        let mut remaining = TX_SPIN_LIMIT;
        while self.read_reg(UART_FR) & FR_TXFF != 0 {
            if remaining == 0 {
                return false;
            }
            remaining -= 1;
            core::hint::spin_loop();
        }
        self.write_reg(UART_DR, byte as u32);
        true
    }

    /// Whether the receive FIFO holds a byte
    #[inline]
    pub fn has_data(&self) -> bool {
        self.read_reg(UART_FR) & FR_RXFE == 0
    }

    /// Wait up to `spin_limit` polls for a received byte
    pub fn read_byte(&self, spin_limit: u32) -> Option<u8> {
        let mut remaining = spin_limit;
        while !self.has_data() {
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            core::hint::spin_loop();
        }
        Some((self.read_reg(UART_DR) & 0xFF) as u8)
    }

    /// Discard whatever is waiting in the receive FIFO; returns the count
    pub fn flush_rx(&self) -> usize {
        let mut dropped = 0;
        while dropped < RX_FIFO_DRAIN_LIMIT && self.has_data() {
            let _ = self.read_reg(UART_DR);
            dropped += 1;
        }
        dropped
    }

    /// Write a string, expanding `\n` to `\r\n`
    pub fn send_str(&self, s: &str) {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
    }
}

impl<B: RegisterBus> fmt::Write for Uart<B> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.send_str(s);
        Ok(())
    }
}

fn settle() {
    for _ in 0..GPIO_SETTLE_CYCLES {
        core::hint::spin_loop();
    }
}
