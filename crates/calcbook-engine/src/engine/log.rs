//! Per-call execution log.
//!
//! A fresh log is created for every top-level execution and shared (by clone)
//! with nested executions and with script `log(..)` hooks. Every entry is also
//! emitted as a `tracing` debug event.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Append-only, timestamped log shared by one execution tree.
#[derive(Clone, Debug, Default)]
pub struct ExecutionLog {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(target: "calcbook::execution", "{}", message);
        self.entries.lock().push(LogEntry {
            timestamp: Utc::now(),
            message,
        });
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.message.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_entries() {
        let log = ExecutionLog::new();
        let nested = log.clone();
        log.push("outer");
        nested.push("inner");
        assert_eq!(log.messages(), vec!["outer", "inner"]);
        assert!(log.entries()[0].timestamp <= log.entries()[1].timestamp);
    }
}
