use std::collections::VecDeque;

use serde::Serialize;

use crate::class::CommandClass;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub class: CommandClass,
    pub time: f64,
    pub description: String,
}

/// Bounded record of recent pushes, newest first. A capacity of zero
/// disables recording.
#[derive(Debug, Clone, Serialize)]
pub struct CommandHistory {
    capacity: usize,
    entries: VecDeque<HistoryEntry>,
}

impl CommandHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn record(&mut self, entry: HistoryEntry) {
        if !self.is_enabled() {
            return;
        }
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    pub fn newest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
