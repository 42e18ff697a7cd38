//! Fake register buses for host tests.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};

use crate::mailbox::{
    PropertyBuffer, MAILBOX_EMPTY, MAILBOX_FULL, MAILBOX_READ, MAILBOX_STATUS, MAILBOX_WRITE,
    MAILBOX_WRITE_STATUS, PROPERTY_BUFFER_WORDS,
};
use crate::mmio::RegisterBus;
use crate::uart::{FR_RXFE, UART_DR, UART_FR};

use log::{Level, LevelFilter, Log, Metadata, Record};

/// Base address the fake answers on
pub const FAKE_MAILBOX_BASE: usize = 0x1000;

type Handler = Box<dyn FnMut(&mut [u32])>;

/// Answers mailbox writes by running `handler` over the property buffer
/// and queueing the echoed message word.
pub struct FakeFirmware {
    buffer: *mut u32,
    handler: RefCell<Handler>,
    pending: RefCell<VecDeque<u32>>,
    writes: RefCell<Vec<u32>>,
    busy_polls: Cell<u32>,
    stray_responses: Cell<u32>,
    responsive: Cell<bool>,
}

impl FakeFirmware {
    pub fn new(buffer: &PropertyBuffer, handler: impl FnMut(&mut [u32]) + 'static) -> Self {
        Self {
            buffer: buffer.as_ptr(),
            handler: RefCell::new(Box::new(handler)),
            pending: RefCell::new(VecDeque::new()),
            writes: RefCell::new(Vec::new()),
            busy_polls: Cell::new(0),
            stray_responses: Cell::new(0),
            responsive: Cell::new(true),
        }
    }

    /// Report FULL on the write side for this many status polls
    pub fn set_busy_polls(&self, polls: u32) {
        self.busy_polls.set(polls);
    }

    /// Queue this many unrelated responses ahead of the real one
    pub fn set_stray_responses(&self, count: u32) {
        self.stray_responses.set(count);
    }

    /// A silent firmware accepts writes and never answers
    pub fn set_responsive(&self, responsive: bool) {
        self.responsive.set(responsive);
    }

    pub fn writes(&self) -> Vec<u32> {
        self.writes.borrow().clone()
    }

    pub fn pending(&self) -> usize {
        self.pending.borrow().len()
    }
}

impl RegisterBus for FakeFirmware {
    fn read(&self, addr: usize) -> u32 {
        match addr - FAKE_MAILBOX_BASE {
            MAILBOX_WRITE_STATUS => {
                let busy = self.busy_polls.get();
                if busy > 0 {
                    if busy != u32::MAX {
                        self.busy_polls.set(busy - 1);
                    }
                    MAILBOX_FULL
                } else {
                    0
                }
            }
            MAILBOX_STATUS => {
                if self.pending.borrow().is_empty() {
                    MAILBOX_EMPTY
                } else {
                    0
                }
            }
            MAILBOX_READ => self.pending.borrow_mut().pop_front().unwrap_or(0),
            other => panic!("unexpected mailbox read at offset {:#x}", other),
        }
    }

    fn write(&self, addr: usize, value: u32) {
        assert_eq!(addr - FAKE_MAILBOX_BASE, MAILBOX_WRITE, "write outside mailbox 1");
        self.writes.borrow_mut().push(value);

        if !self.responsive.get() {
            return;
        }

        // The buffer outlives the fake in every test, and the driver holds
        // no reference into it while the handler runs.
        let words = unsafe { std::slice::from_raw_parts_mut(self.buffer, PROPERTY_BUFFER_WORDS) };
        let mut handler = self.handler.borrow_mut();
        (&mut **handler)(words);

        let mut pending = self.pending.borrow_mut();
        for i in 0..self.stray_responses.get() {
            // Same buffer, other channel; or another buffer entirely
            pending.push_back((value ^ 0x1).wrapping_add(i << 4));
        }
        pending.push_back(value);
    }
}

/// Plain register file: reads return the last written (or preset) value
#[derive(Default)]
pub struct RegisterFile {
    values: RefCell<HashMap<usize, u32>>,
    writes: RefCell<Vec<(usize, u32)>>,
}

impl RegisterFile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a register without recording a write
    pub fn preset(&self, addr: usize, value: u32) {
        self.values.borrow_mut().insert(addr, value);
    }

    pub fn get(&self, addr: usize) -> u32 {
        self.values.borrow().get(&addr).copied().unwrap_or(0)
    }

    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.writes.borrow().clone()
    }
}

impl RegisterBus for RegisterFile {
    fn read(&self, addr: usize) -> u32 {
        self.get(addr)
    }

    fn write(&self, addr: usize, value: u32) {
        self.writes.borrow_mut().push((addr, value));
        self.values.borrow_mut().insert(addr, value);
    }
}

/// Records log output per test thread so parallel tests don't mix
struct CaptureLogger;

static CAPTURE: CaptureLogger = CaptureLogger;

thread_local! {
    static CAPTURED: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

impl Log for CaptureLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        CAPTURED.with(|c| c.borrow_mut().push((record.level(), record.args().to_string())));
    }

    fn flush(&self) {}
}

/// Run `f` and return everything it logged on this thread
pub fn capture_logs(f: impl FnOnce()) -> Vec<(Level, String)> {
    static INSTALL: std::sync::Once = std::sync::Once::new();
    INSTALL.call_once(|| {
        // Nothing else installs a logger under test
        let _ = log::set_logger(&CAPTURE);
        log::set_max_level(LevelFilter::Trace);
    });

    CAPTURED.with(|c| c.borrow_mut().clear());
    f();
    CAPTURED.with(|c| c.borrow_mut().drain(..).collect())
}

type Responder = Box<dyn FnMut(u8) -> Vec<u8>>;

/// Serial peer on a UART: every transmitted byte is handed to `responder`,
/// whose reply lands in the receive FIFO. Registers other than data and
/// flags behave like a [`RegisterFile`].
pub struct FakeSerial {
    base: usize,
    regs: RegisterFile,
    rx: RefCell<VecDeque<u8>>,
    tx: RefCell<Vec<u8>>,
    responder: RefCell<Responder>,
}

impl FakeSerial {
    pub fn new(base: usize, responder: impl FnMut(u8) -> Vec<u8> + 'static) -> Self {
        Self {
            base,
            regs: RegisterFile::new(),
            rx: RefCell::new(VecDeque::new()),
            tx: RefCell::new(Vec::new()),
            responder: RefCell::new(Box::new(responder)),
        }
    }

    /// Bytes already waiting before anything is sent
    pub fn queue_rx(&self, bytes: &[u8]) {
        self.rx.borrow_mut().extend(bytes.iter().copied());
    }

    pub fn sent(&self) -> Vec<u8> {
        self.tx.borrow().clone()
    }
}

impl RegisterBus for FakeSerial {
    fn read(&self, addr: usize) -> u32 {
        if addr == self.base + UART_FR {
            // Transmit side never fills up
            if self.rx.borrow().is_empty() {
                FR_RXFE
            } else {
                0
            }
        } else if addr == self.base + UART_DR {
            self.rx.borrow_mut().pop_front().map_or(0, u32::from)
        } else {
            self.regs.read(addr)
        }
    }

    fn write(&self, addr: usize, value: u32) {
        if addr != self.base + UART_DR {
            self.regs.write(addr, value);
            return;
        }
        let byte = value as u8;
        self.tx.borrow_mut().push(byte);
        let reply = {
            let mut responder = self.responder.borrow_mut();
            (&mut **responder)(byte)
        };
        self.rx.borrow_mut().extend(reply);
    }
}
