//! # MegaSquirt ECU Link
//!
//! Polls a MegaSquirt-compatible engine controller over the PL011 UART.
//!
//! The protocol is one command byte out, a raw reply back:
//!
//! | Command | Reply |
//! |---------|-------|
//! | `S`     | 32-byte signature string |
//! | `A`     | realtime frame, up to 256 bytes, big-endian fields |
//!
//! A reply ends when the line stays quiet for the per-byte timeout.

use heapless::Vec;
use log::{debug, info};

use crate::mmio::{Mmio, RegisterBus};
use crate::telemetry::EngineSample;
use crate::uart::Uart;

pub const CMD_SIGNATURE: u8 = b'S';
pub const CMD_REALTIME: u8 = b'A';

pub const SIGNATURE_LEN: usize = 32;

/// Largest realtime frame kept; later bytes are drained and dropped
pub const MAX_FRAME: usize = 256;

/// Flag-register polls to wait for each reply byte
pub const DEFAULT_BYTE_TIMEOUT: u32 = 100_000;

/// Atmospheric pressure at sea level (kPa)
const ATMOSPHERIC_KPA: f32 = 101.325;

const PSI_PER_KPA: f32 = 0.145_038;

/// Byte offsets of the fields read from an MS2 realtime frame
pub mod offsets {
    /// Manifold pressure, kPa x 10
    pub const MAP: usize = 4;
    /// Engine speed, rev/min
    pub const RPM: usize = 6;
    /// Coolant temperature, °F x 10, signed
    pub const COOLANT: usize = 8;
    /// Throttle position, % x 10
    pub const TPS: usize = 14;
    /// Air/fuel ratio x 10
    pub const AFR: usize = 16;
    /// Battery voltage x 10
    pub const BATTERY: usize = 18;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EcuError {
    #[error("ECU signature incomplete: {received} of 32 bytes")]
    ShortSignature { received: usize },
    #[error("ECU link not connected")]
    NotConnected,
    #[error("ECU sent no realtime data")]
    NoData,
}

pub struct MegaSquirt<B: RegisterBus = Mmio> {
    uart: Uart<B>,
    connected: bool,
    byte_timeout: u32,
    frame: Vec<u8, MAX_FRAME>,
}

impl<B: RegisterBus> MegaSquirt<B> {
    /// Wrap an initialized UART; nothing is sent until [`connect`](Self::connect)
    pub const fn new(uart: Uart<B>) -> Self {
        Self {
            uart,
            connected: false,
            byte_timeout: DEFAULT_BYTE_TIMEOUT,
            frame: Vec::new(),
        }
    }

    pub fn with_byte_timeout(mut self, polls: u32) -> Self {
        self.byte_timeout = polls;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Drop stale input, then require a full signature before polling
    pub fn connect(&mut self) -> Result<[u8; SIGNATURE_LEN], EcuError> {
        let stale = self.uart.flush_rx();
        if stale > 0 {
            debug!("discarded {} stale bytes from the ECU line", stale);
        }

        self.connected = false;
        let signature = self.signature()?;
        self.connected = true;

        let text = core::str::from_utf8(&signature).unwrap_or("<binary>");
        info!("ECU connected: {}", text.trim_end_matches(['\0', ' ']));
        Ok(signature)
    }

    /// Ask for the 32-byte signature string
    pub fn signature(&mut self) -> Result<[u8; SIGNATURE_LEN], EcuError> {
        self.uart.write_byte(CMD_SIGNATURE);

        let mut signature = [0u8; SIGNATURE_LEN];
        for (received, slot) in signature.iter_mut().enumerate() {
            match self.uart.read_byte(self.byte_timeout) {
                Some(byte) => *slot = byte,
                None => return Err(EcuError::ShortSignature { received }),
            }
        }
        Ok(signature)
    }

    /// Request a realtime frame; returns its length.
    ///
    /// The previous frame is discarded even when the request fails.
    pub fn poll(&mut self) -> Result<usize, EcuError> {
        if !self.connected {
            return Err(EcuError::NotConnected);
        }
        self.frame.clear();
        self.uart.write_byte(CMD_REALTIME);

        while let Some(byte) = self.uart.read_byte(self.byte_timeout) {
            if self.frame.push(byte).is_err() {
                let dropped = 1 + self.uart.flush_rx();
                debug!("realtime frame over {} bytes, dropped {}", MAX_FRAME, dropped);
                break;
            }
        }

        if self.frame.is_empty() {
            return Err(EcuError::NoData);
        }
        Ok(self.frame.len())
    }

    /// Raw bytes of the last realtime frame
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    pub fn u8_at(&self, offset: usize) -> Option<u8> {
        self.frame.get(offset).copied()
    }

    pub fn u16_at(&self, offset: usize) -> Option<u16> {
        let end = offset.checked_add(2)?;
        let bytes = self.frame.get(offset..end)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn i16_at(&self, offset: usize) -> Option<i16> {
        self.u16_at(offset).map(|raw| raw as i16)
    }

    pub fn rpm(&self) -> Option<f32> {
        self.u16_at(offsets::RPM).map(f32::from)
    }

    pub fn map_kpa(&self) -> Option<f32> {
        self.tenths(offsets::MAP)
    }

    pub fn coolant_f(&self) -> Option<f32> {
        self.i16_at(offsets::COOLANT).map(|raw| f32::from(raw) / 10.0)
    }

    pub fn throttle_pct(&self) -> Option<f32> {
        self.tenths(offsets::TPS)
    }

    pub fn afr(&self) -> Option<f32> {
        self.tenths(offsets::AFR)
    }

    pub fn battery_v(&self) -> Option<f32> {
        self.tenths(offsets::BATTERY)
    }

    fn tenths(&self, offset: usize) -> Option<f32> {
        self.u16_at(offset).map(|raw| f32::from(raw) / 10.0)
    }

    /// Overwrite the fields present in the last frame.
    ///
    /// Boost is derived from MAP. Oil pressure and vehicle speed are not in
    /// the frame and keep their previous values.
    pub fn apply_to(&self, sample: &mut EngineSample) {
        if let Some(rpm) = self.rpm() {
            sample.rpm = rpm;
        }
        if let Some(map) = self.map_kpa() {
            sample.map_kpa = map;
            sample.boost_psi = boost_psi(map);
        }
        if let Some(coolant) = self.coolant_f() {
            sample.coolant_f = coolant;
        }
        if let Some(tps) = self.throttle_pct() {
            sample.throttle_pct = tps;
        }
        if let Some(afr) = self.afr() {
            sample.afr = afr;
        }
        if let Some(battery) = self.battery_v() {
            sample.battery_v = battery;
        }
    }
}

/// Gauge pressure in psi from absolute manifold pressure; negative is vacuum
pub fn boost_psi(map_kpa: f32) -> f32 {
    (map_kpa - ATMOSPHERIC_KPA) * PSI_PER_KPA
}
