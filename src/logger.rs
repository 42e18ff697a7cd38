//! Console logger: `log` records go out over the PL011 UART.
//!
//! Until [`init`] runs, records are discarded.

use core::fmt::{self, Write};

use log::{LevelFilter, Metadata, Record, SetLoggerError};
use spin::Mutex;

use crate::mmio::Mmio;
use crate::uart::Uart;

static CONSOLE: Mutex<Option<Uart<Mmio>>> = Mutex::new(None);

static LOGGER: UartLogger = UartLogger;

pub struct UartLogger;

impl log::Log for UartLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        // Re-entry (a panic while logging) drops the record instead of deadlocking
        let Some(mut console) = CONSOLE.try_lock() else {
            return;
        };
        if let Some(uart) = console.as_mut() {
            let _ = write_record(uart, record);
        }
    }

    fn flush(&self) {}
}

/// Format one record as `[LEVEL] target: message`
pub fn write_record<W: Write>(out: &mut W, record: &Record) -> fmt::Result {
    writeln!(out, "[{:<5}] {}: {}", record.level(), record.target(), record.args())
}

/// Install `uart` as the log sink and set the level filter
pub fn init(uart: Uart<Mmio>, level: LevelFilter) -> Result<(), SetLoggerError> {
    *CONSOLE.lock() = Some(uart);
    log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}
