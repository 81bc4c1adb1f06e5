//! Log sink used for retry transitions and transport failures
//!
//! The client reports a small, fixed set of events (transport failures, tier
//! transitions, sleep-mode failures) through [`LogSink`] so embedding
//! applications can route them wherever they like. Everything else the crate
//! emits goes straight to `tracing`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Severity of a sink entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(name)
    }
}

/// Destination for client log events
///
/// Implementations must not fail; errors inside the sink are its own concern.
pub trait LogSink: Send + Sync {
    /// Record a message at the given level
    fn log(&self, message: &str, level: LogLevel);
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn log(&self, message: &str, level: LogLevel) {
        (**self).log(message, level)
    }
}

/// Sink forwarding every entry to the `tracing` subscriber
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, message: &str, level: LogLevel) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "steady", "{}", message),
            LogLevel::Info => tracing::info!(target: "steady", "{}", message),
            LogLevel::Warn => tracing::warn!(target: "steady", "{}", message),
            LogLevel::Error => tracing::error!(target: "steady", "{}", message),
        }
    }
}

/// A recorded sink entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

/// Sink keeping entries in memory, in arrival order
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all entries recorded so far
    pub fn entries(&self) -> Vec<LogEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Entries whose message contains `needle`
    pub fn matching(&self, needle: &str) -> Vec<LogEntry> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.message.contains(needle))
            .collect()
    }
}

impl LogSink for MemorySink {
    fn log(&self, message: &str, level: LogLevel) {
        let entry = LogEntry {
            level,
            message: message.to_string(),
        };
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}
