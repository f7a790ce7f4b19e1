// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Application-facing logging sink
//!
//! The session layer reports errors and notable events through a
//! [`LoggingService`] supplied by the application. Internal diagnostics
//! go straight to `tracing`.

use parking_lot::RwLock;
use serde_json::{Map, Value};

/// Structured attributes attached to an error log entry
pub type LogAttributes = Map<String, Value>;

/// Logging capability consumed by the session layer
pub trait LoggingService: Send + Sync {
    /// Record an informational message
    fn log_info(&self, message: &str);

    /// Record an error with structured attributes
    fn log_error(&self, message: &str, attributes: &LogAttributes);
}

/// Forwards to `tracing` under the `evaste::session` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLoggingService;

impl LoggingService for TracingLoggingService {
    fn log_info(&self, message: &str) {
        tracing::info!(target: "evaste::session", "{}", message);
    }

    fn log_error(&self, message: &str, attributes: &LogAttributes) {
        let attributes = Value::Object(attributes.clone());
        tracing::error!(target: "evaste::session", %attributes, "{}", message);
    }
}

/// A logged entry kept by [`MemoryLoggingService`]
#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    Info(String),
    Error {
        message: String,
        attributes: LogAttributes,
    },
}

/// Keeps every entry in memory
#[derive(Debug, Default)]
pub struct MemoryLoggingService {
    entries: RwLock<Vec<LogEntry>>,
}

impl MemoryLoggingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries in logging order
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.read().clone()
    }

    /// Only the error entries
    pub fn errors(&self) -> Vec<(String, LogAttributes)> {
        self.entries
            .read()
            .iter()
            .filter_map(|e| match e {
                LogEntry::Error {
                    message,
                    attributes,
                } => Some((message.clone(), attributes.clone())),
                LogEntry::Info(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl LoggingService for MemoryLoggingService {
    fn log_info(&self, message: &str) {
        self.entries.write().push(LogEntry::Info(message.to_string()));
    }

    fn log_error(&self, message: &str, attributes: &LogAttributes) {
        self.entries.write().push(LogEntry::Error {
            message: message.to_string(),
            attributes: attributes.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_logging() {
        let logger = MemoryLoggingService::new();
        logger.log_info("hello");

        let mut attrs = LogAttributes::new();
        attrs.insert("httpErrorStatus".to_string(), Value::from(500));
        logger.log_error("boom", &attrs);

        assert_eq!(logger.entries().len(), 2);
        let errors = logger.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "boom");
        assert_eq!(errors[0].1["httpErrorStatus"], 500);
    }

    #[test]
    fn test_tracing_logging_does_not_panic() {
        let logger = TracingLoggingService;
        logger.log_info("info");
        logger.log_error("error", &LogAttributes::new());
    }
}
