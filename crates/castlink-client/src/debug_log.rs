//! In-memory debug log exposed to UI layers.
//!
//! Separate from `tracing`: this log is part of the client's public surface
//! so an in-app debug panel can render it. Entries are appended in order and
//! never evicted.

use std::cell::RefCell;

use serde::Serialize;
use serde_json::Value;

/// Category of a [`DebugLogEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// Lifecycle notes.
    Info,
    /// Outbound message.
    Send,
    /// Response to one of our requests.
    Receive,
    /// Unsolicited host event.
    Event,
    /// Failed operation or rejected input.
    Error,
}

/// One debug log line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugLogEntry {
    /// Wall clock, Unix milliseconds.
    pub timestamp: u64,
    /// Category, serialized as `type`.
    #[serde(rename = "type")]
    pub kind: LogKind,
    /// Short description.
    pub message: String,
    /// Structured context, usually the message JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Append-only list of [`DebugLogEntry`].
#[derive(Debug, Default)]
pub struct DebugLog {
    entries: RefCell<Vec<DebugLogEntry>>,
}

impl DebugLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&self, entry: DebugLogEntry) {
        self.entries.borrow_mut().push(entry);
    }

    /// Copy of every entry, oldest first.
    pub fn entries(&self) -> Vec<DebugLogEntry> {
        self.entries.borrow().clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// True when nothing has been logged.
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_keep_insertion_order() {
        let log = DebugLog::new();
        for (i, kind) in [LogKind::Info, LogKind::Send, LogKind::Receive].into_iter().enumerate() {
            log.push(DebugLogEntry { timestamp: i as u64, kind, message: format!("{i}"), data: None });
        }

        let kinds: Vec<_> = log.entries().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![LogKind::Info, LogKind::Send, LogKind::Receive]);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn entry_serializes_without_empty_data() {
        let entry =
            DebugLogEntry { timestamp: 1, kind: LogKind::Event, message: "x".into(), data: None };
        let json = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(json, serde_json::json!({ "timestamp": 1, "type": "event", "message": "x" }));
    }

    #[test]
    fn category_key_is_type() {
        let entry = DebugLogEntry {
            timestamp: 7,
            kind: LogKind::Error,
            message: "timeout".into(),
            data: Some(serde_json::json!({ "code": "TIMEOUT" })),
        };
        let json = serde_json::to_value(&entry).expect("serialize");
        assert_eq!(json["type"], "error");
        assert!(json.get("kind").is_none());
        assert_eq!(json["data"]["code"], "TIMEOUT");
    }
}
