//! Stderr logger for the spatial CLI.
//!
//! Stdout carries the JSON report, so every log record goes to stderr with a
//! local timestamp.

use anyhow::Result;
use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};
use std::io::Write;

pub struct SpatialLogger {
    level: LevelFilter,
}

impl SpatialLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    /// Install the logger with the specified log level
    pub fn init(level: LevelFilter) -> Result<()> {
        log::set_boxed_logger(Box::new(Self::new(level)))
            .map(|()| log::set_max_level(level))
            .map_err(|e| anyhow::anyhow!("Failed to set logger: {}", e))?;

        log::debug!("Logger initialized at level {}", level);
        Ok(())
    }

    fn format(record: &Record) -> String {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        format!(
            "{} {} [{}] {}",
            timestamp,
            record.level(),
            record.target(),
            record.args()
        )
    }
}

impl Log for SpatialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            // A failed write to stderr has nowhere better to go
            let _ = writeln!(std::io::stderr().lock(), "{}", Self::format(record));
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Creates a log entry that separates sections in the log output.
pub fn log_section(name: &str) {
    let separator = "=".repeat(50);
    log::info!("{}", separator);
    log::info!("SECTION: {}", name);
    log::info!("{}", separator);
}
