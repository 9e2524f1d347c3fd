//! The host's error/warn/debug reporting sink.
//!
//! Transforms never return row-level failures to the pipeline. They report them here and keep
//! going. Implementations must not panic.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Severity of a reported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warn,
    /// Error-level event (a row or the whole transform could not be processed).
    Error,
}

/// Reporting sink supplied by the host pipeline.
pub trait TransformLogger: Send + Sync {
    /// Record a message.
    fn log(&self, level: LogLevel, message: &str);

    /// Record a debug message.
    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Record an informational message.
    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    /// Record a warning.
    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    /// Record an error.
    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

/// Forwards messages to `tracing`.
#[derive(Debug, Default)]
pub struct TracingLogger;

impl TransformLogger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!("{message}"),
            LogLevel::Info => tracing::info!("{message}"),
            LogLevel::Warn => tracing::warn!("{message}"),
            LogLevel::Error => tracing::error!("{message}"),
        }
    }
}

/// A reported message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    /// Severity.
    pub level: LogLevel,
    /// Message text.
    pub message: String,
}

/// Keeps every message at or above a minimum level in memory.
#[derive(Debug)]
pub struct MemoryLogger {
    min_level: LogLevel,
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogger {
    /// Create a logger recording messages at or above `min_level`.
    pub fn new(min_level: LogLevel) -> Self {
        Self {
            min_level,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Copy of every recorded entry, oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages recorded at exactly `level`.
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .map(|e| e.message)
            .collect()
    }

    /// Recorded error messages.
    pub fn errors(&self) -> Vec<String> {
        self.messages(LogLevel::Error)
    }
}

impl Default for MemoryLogger {
    fn default() -> Self {
        Self::new(LogLevel::Debug)
    }
}

impl TransformLogger for MemoryLogger {
    fn log(&self, level: LogLevel, message: &str) {
        if level < self.min_level {
            return;
        }
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogEntry {
                level,
                message: message.to_string(),
            });
    }
}

/// Fans messages out to a list of loggers.
#[derive(Default)]
pub struct CompositeLogger {
    loggers: Vec<Arc<dyn TransformLogger>>,
}

impl CompositeLogger {
    /// Create a composite logger from a list of loggers.
    pub fn new(loggers: Vec<Arc<dyn TransformLogger>>) -> Self {
        Self { loggers }
    }
}

impl fmt::Debug for CompositeLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeLogger")
            .field("loggers_len", &self.loggers.len())
            .finish()
    }
}

impl TransformLogger for CompositeLogger {
    fn log(&self, level: LogLevel, message: &str) {
        for l in &self.loggers {
            l.log(level, message);
        }
    }
}
