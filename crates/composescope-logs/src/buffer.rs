use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

use composescope_types::LogEntry;

use crate::consumer::LogConsumer;

/// Thread-safe ring buffer for log entries
#[derive(Clone)]
pub struct LogBuffer {
    /// Internal storage
    entries: Arc<RwLock<VecDeque<LogEntry>>>,

    /// Maximum capacity
    capacity: usize,
}

impl LogBuffer {
    /// Create a new log buffer with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Push a new entry, evicting oldest if at capacity
    pub fn push(&self, entry: LogEntry) {
        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.write();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Get all entries
    pub fn all(&self) -> Vec<LogEntry> {
        self.entries.read().iter().cloned().collect()
    }

    /// Get entries produced by one service
    pub fn for_service(&self, service: &str) -> Vec<LogEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.service == service)
            .cloned()
            .collect()
    }

    /// Total entry count
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Export all entries as raw lines
    pub fn export_raw(&self) -> String {
        self.entries
            .read()
            .iter()
            .map(|e| e.line.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Clear all entries
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Get the last N entries
    pub fn tail(&self, n: usize) -> Vec<LogEntry> {
        let entries = self.entries.read();
        let start = entries.len().saturating_sub(n);
        entries.iter().skip(start).cloned().collect()
    }
}

impl LogConsumer for LogBuffer {
    fn log(&self, service: &str, line: &str) {
        self.push(LogEntry::new(service, line));
    }
}

impl std::fmt::Debug for LogBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogBuffer")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
