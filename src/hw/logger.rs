// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! `log` backend writing to the debug USART.
//!
//! Records are written synchronously inside a critical section, one line per record with a CRLF
//! terminator.

use core::cell::RefCell;
use core::fmt::Write;

use cortex_m::interrupt::{self, Mutex};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use stm32f7xx_hal::pac;

use crate::hw::usart::Usart;

/// Debug port type.
pub type DebugUsart = Usart<pac::USART1>;

struct UsartLogger {
    port: Mutex<RefCell<Option<DebugUsart>>>,
}

static LOGGER: UsartLogger = UsartLogger {
    port: Mutex::new(RefCell::new(None)),
};

impl Log for UsartLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        interrupt::free(|cs| {
            if let Some(port) = self.port.borrow(cs).borrow_mut().as_mut() {
                let _ = write!(port, "[{}] {}: {}\r\n", record.level(), record.target(), record.args());
            }
        });
    }

    fn flush(&self) {
        interrupt::free(|cs| {
            if let Some(port) = self.port.borrow(cs).borrow_mut().as_mut() {
                port.flush();
            }
        });
    }
}

/// Install the USART logger. Can only succeed once.
pub fn init(port: DebugUsart, level: LevelFilter) -> Result<(), SetLoggerError> {
    interrupt::free(|cs| {
        LOGGER.port.borrow(cs).replace(Some(port));
    });
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}
