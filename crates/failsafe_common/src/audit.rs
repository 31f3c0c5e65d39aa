//! Append-only audit log of control-plane actions.
//!
//! Newest entries first. Entries are never mutated once appended; the only
//! removal is an explicit wholesale clear.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity of an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogSeverity {
    Info,
    Warning,
    Error,
    Success,
}

/// A single timestamped audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub details: String,
    pub severity: LogSeverity,
}

impl LogEntry {
    pub fn new(action: impl Into<String>, details: impl Into<String>, severity: LogSeverity) -> Self {
        Self {
            timestamp: Utc::now(),
            action: action.into(),
            details: details.into(),
            severity,
        }
    }
}

/// Ordered audit log, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditLog {
    entries: Vec<LogEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a log from entries already in newest-first order.
    pub fn from_entries(entries: Vec<LogEntry>) -> Self {
        Self { entries }
    }

    /// Append an entry at the head.
    pub fn append(&mut self, entry: LogEntry) {
        self.entries.insert(0, entry);
    }

    /// Read-only snapshot, newest first.
    pub fn all(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Empty the entire log.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
