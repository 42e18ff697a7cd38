//! # Memory-Mapped I/O
//!
//! Volatile 32-bit register access. Drivers talk to hardware through the
//! [`RegisterBus`] trait so the same driver code runs against a fake
//! register file in tests.

use core::ptr::{read_volatile, write_volatile};

/// 32-bit register access at absolute addresses.
pub trait RegisterBus {
    /// Read the register at `addr`
    fn read(&self, addr: usize) -> u32;

    /// Write `value` to the register at `addr`
    fn write(&self, addr: usize, value: u32);
}

impl<T: RegisterBus + ?Sized> RegisterBus for &T {
    #[inline]
    fn read(&self, addr: usize) -> u32 {
        (**self).read(addr)
    }

    #[inline]
    fn write(&self, addr: usize, value: u32) {
        (**self).write(addr, value)
    }
}

/// Physical register bus: every access is a volatile load or store.
#[derive(Debug, Clone, Copy)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// Create a handle to the physical register bus
    ///
    /// # Safety
    /// Every address later passed to [`RegisterBus::read`] or
    /// [`RegisterBus::write`] must be a mapped, device-memory register.
    /// Addresses are not validated.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl RegisterBus for Mmio {
    #[inline]
    fn read(&self, addr: usize) -> u32 {
        unsafe { read_volatile(addr as *const u32) }
    }

    #[inline]
    fn write(&self, addr: usize, value: u32) {
        unsafe { write_volatile(addr as *mut u32, value) }
    }
}
