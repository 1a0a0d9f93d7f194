//! # Event Log
//!
//! Human-readable narration of engine activity for the presentation layer.
//! Entries are only ever appended; scroll-back limits are a display concern.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// One narrated line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Chronological, append-only list of [`LogEntry`].
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `message` stamped with the current time and return the entry.
    pub fn append(&mut self, message: impl Into<String>) -> LogEntry {
        let entry = LogEntry {
            timestamp: Utc::now(),
            message: message.into(),
        };
        self.entries.push(entry.clone());
        entry
    }

    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
