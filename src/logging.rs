//! # Logging Context
//!
//! Log output goes through a [`LogContext`] that the caller builds and hands
//! to the orchestrator and the upload client. Nothing installs a process-wide
//! logger, so a library user can embed the orchestrator next to their own
//! `log` setup, and tests can observe exactly what one run logged.
//!
//! Records are ordinary `log` records with the target `rucio_register`. The
//! command-line tool renders them with an `env_logger::Logger`, which honors
//! the `RUCIO_REGISTER_LOG` filter syntax (for example
//! `RUCIO_REGISTER_LOG=debug`).

use std::fmt;
use std::sync::{Arc, Mutex};

use log::{Level, LevelFilter, Log, Metadata, Record};

/// Target attached to every record emitted through a [`LogContext`].
pub const TARGET: &str = "rucio_register";

/// Environment variable holding an env_logger filter that overrides the
/// level given on the command line.
pub const LOG_ENV: &str = "RUCIO_REGISTER_LOG";

/// Environment variable controlling log colors (`always`, `never`, `auto`).
pub const LOG_STYLE_ENV: &str = "RUCIO_REGISTER_LOG_STYLE";

/// An explicitly owned logger that components write through.
pub struct LogContext {
    logger: Box<dyn Log>,
}

impl LogContext {
    /// Wraps any `log::Log` implementation.
    pub fn new(logger: Box<dyn Log>) -> Self {
        Self { logger }
    }

    /// Builds the human-readable stderr logger used by the command-line tool.
    pub fn stderr(level: LevelFilter, use_color: bool) -> Self {
        let mut builder = env_logger::Builder::new();
        builder
            .filter_level(level)
            .target(env_logger::Target::Stderr)
            .parse_env(
                env_logger::Env::new()
                    .filter(LOG_ENV)
                    .write_style(LOG_STYLE_ENV),
            );
        if !use_color {
            builder.write_style(env_logger::WriteStyle::Never);
        }
        Self::new(Box::new(builder.build()))
    }

    /// Builds a context that keeps records in memory, together with a handle
    /// for reading them back.
    pub fn in_memory(level: LevelFilter) -> (Self, MemoryLogger) {
        let logger = MemoryLogger::new(level);
        (Self::new(Box::new(logger.clone())), logger)
    }

    /// Whether a record at `level` would be emitted.
    pub fn enabled(&self, level: Level) -> bool {
        self.logger
            .enabled(&Metadata::builder().level(level).target(TARGET).build())
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if !self.enabled(level) {
            return;
        }
        self.logger.log(
            &Record::builder()
                .args(args)
                .level(level)
                .target(TARGET)
                .build(),
        );
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }

    pub fn warn(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warn, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }
}

impl fmt::Debug for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogContext").finish_non_exhaustive()
    }
}

impl Drop for LogContext {
    fn drop(&mut self) {
        self.logger.flush();
    }
}

/// A single record captured by a [`MemoryLogger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedRecord {
    pub level: Level,
    pub message: String,
}

/// A `log::Log` implementation that stores formatted records in memory.
///
/// Clones share the same buffer.
#[derive(Debug, Clone)]
pub struct MemoryLogger {
    level: LevelFilter,
    records: Arc<Mutex<Vec<CapturedRecord>>>,
}

impl MemoryLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self {
            level,
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A snapshot of everything logged so far, oldest first.
    pub fn records(&self) -> Vec<CapturedRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Records at exactly `level` whose message contains `needle`.
    pub fn find(&self, level: Level, needle: &str) -> Vec<CapturedRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.level == level && r.message.contains(needle))
            .collect()
    }
}

impl Log for MemoryLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(CapturedRecord {
                level: record.level(),
                message: record.args().to_string(),
            });
    }

    fn flush(&self) {}
}
