//! Goals and their injected log

use crate::fields::Configurable;
use parking_lot::Mutex;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Unit of build logic under test
///
/// Fields are bound through [`Configurable::fields`] before `execute` runs.
pub trait Goal: Configurable + Send {
    /// Run the goal
    ///
    /// # Errors
    /// Any failure of the goal's own logic.
    fn execute(&mut self) -> anyhow::Result<()>;

    /// Receive the injected log
    fn set_log(&mut self, log: GoalLog);

    /// Injected log, if any
    fn log(&self) -> Option<&GoalLog>;
}

/// Severity of a [`LogRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Debug
    Debug,
    /// Info
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

/// Message written through a [`GoalLog`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Severity
    pub level: LogLevel,
    /// Text
    pub message: String,
}

/// Log handle given to goals
///
/// Messages are forwarded to `tracing` and kept so tests can inspect them.
/// Clones share one record buffer.
#[derive(Debug, Clone)]
pub struct GoalLog {
    name: Arc<str>,
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl Default for GoalLog {
    fn default() -> Self {
        Self::new("goal")
    }
}

impl GoalLog {
    /// Create log labelled `name`
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            records: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Label attached to forwarded events
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record a message
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Debug => debug!(goal = %self.name, "{message}"),
            LogLevel::Info => info!(goal = %self.name, "{message}"),
            LogLevel::Warn => warn!(goal = %self.name, "{message}"),
            LogLevel::Error => error!(goal = %self.name, "{message}"),
        }
        self.records.lock().push(LogRecord { level, message });
    }

    /// Record a debug message
    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    /// Record an info message
    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    /// Record a warning
    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    /// Record an error
    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Every record so far
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Messages of one level
    #[must_use]
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter(|record| record.level == level)
            .map(|record| record.message.clone())
            .collect()
    }

    /// Whether both handles share one buffer
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.records, &other.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_records() {
        let log = GoalLog::new("test");
        let clone = log.clone();
        clone.info("hello");
        log.warn("careful");
        assert!(log.ptr_eq(&clone));
        assert_eq!(log.records().len(), 2);
        assert_eq!(log.messages(LogLevel::Info), vec!["hello".to_owned()]);
    }

    #[test]
    fn separate_logs_are_distinct() {
        assert!(!GoalLog::new("a").ptr_eq(&GoalLog::new("a")));
    }
}
