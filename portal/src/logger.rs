//! `log` facade over the host's log capability.

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::host;

struct HostLogger;

static LOGGER: HostLogger = HostLogger;

impl Log for HostLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = std::format!("{} {}", record.target(), record.args());
        unsafe { host::log_write(record.level() as i32, line.as_ptr(), line.len() as i32) }
    }

    fn flush(&self) {}
}

pub fn init() {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Info);
    }
}
