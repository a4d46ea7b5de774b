//! Message history tracking for debugging and diagnostics.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of message recorded in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// A command received from the bus.
    Command,
    /// A command sent to the bulb.
    Device,
    /// A state report pushed by the bulb.
    Report,
}

/// A recorded message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub msg_type: MessageType,
    pub method: String,
    pub message: Value,
    /// Seconds since history creation
    pub timestamp: f64,
}

/// Bounded record of the traffic of one bulb.
///
/// Keeps the last message per kind and method, plus the most recent entries
/// up to a fixed capacity.
#[derive(Debug, Clone)]
pub struct MessageHistory {
    last: HashMap<MessageType, HashMap<String, Value>>,
    last_error: Option<String>,
    start_time: Instant,
    entries: VecDeque<HistoryEntry>,
    max_entries: usize,
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageHistory {
    pub const DEFAULT_MAX_ENTRIES: usize = 100;

    pub fn new() -> Self {
        Self::with_max_entries(Self::DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            last: HashMap::new(),
            last_error: None,
            start_time: Instant::now(),
            entries: VecDeque::with_capacity(max_entries.min(Self::DEFAULT_MAX_ENTRIES)),
            max_entries,
        }
    }

    pub fn record(&mut self, msg_type: MessageType, method: &str, message: &Value) {
        self.last
            .entry(msg_type)
            .or_default()
            .insert(method.to_string(), message.clone());

        if self.max_entries == 0 {
            return;
        }
        if self.entries.len() == self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            msg_type,
            method: method.to_string(),
            message: message.clone(),
            timestamp: self.start_time.elapsed().as_secs_f64(),
        });
    }

    pub fn record_error(&mut self, error: &str) {
        self.last_error = Some(error.to_string());
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The last message of a kind for a method.
    pub fn last(&self, msg_type: MessageType, method: &str) -> Option<&Value> {
        self.last.get(&msg_type).and_then(|m| m.get(method))
    }

    /// Entries from oldest to newest.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.last.clear();
        self.entries.clear();
        self.last_error = None;
    }

    pub fn summary(&self) -> HistorySummary {
        let count = |t: MessageType| self.last.get(&t).map_or(0, |m| m.len());
        HistorySummary {
            command_count: count(MessageType::Command),
            device_count: count(MessageType::Device),
            report_count: count(MessageType::Report),
            total_entries: self.entries.len(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Summary of message history for diagnostics.
///
/// Counts are of distinct methods seen per kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySummary {
    pub command_count: usize,
    pub device_count: usize,
    pub report_count: usize,
    pub total_entries: usize,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_message() {
        let mut history = MessageHistory::new();
        history.record(MessageType::Command, "setOnOff", &json!([true]));

        assert_eq!(history.len(), 1);
        assert_eq!(
            history.last(MessageType::Command, "setOnOff"),
            Some(&json!([true]))
        );
        assert!(history.last(MessageType::Device, "setOnOff").is_none());
    }

    #[test]
    fn test_record_error() {
        let mut history = MessageHistory::new();
        history.record_error("device timeout");
        assert_eq!(history.last_error(), Some("device timeout"));

        history.clear();
        assert!(history.last_error().is_none());
    }

    #[test]
    fn test_max_entries() {
        let mut history = MessageHistory::with_max_entries(2);
        for i in 0..5 {
            history.record(MessageType::Device, &format!("method{}", i), &json!(i));
        }
        assert_eq!(history.len(), 2);

        let methods: Vec<_> = history.entries().map(|e| e.method.as_str()).collect();
        assert_eq!(methods, ["method3", "method4"]);
        assert_eq!(history.summary().device_count, 5);
    }

    #[test]
    fn test_zero_capacity() {
        let mut history = MessageHistory::with_max_entries(0);
        history.record(MessageType::Report, "state", &json!({}));
        assert!(history.is_empty());
        assert_eq!(history.summary().report_count, 1);
    }
}
