//! Logging seam for the command stack.
//!
//! The controller only ever talks to a [`LogSink`]. [`LogFacade`] forwards to
//! the `log` crate with the category as target; [`MemorySink`] keeps entries
//! around for tests and run reports.

use std::cell::RefCell;

use serde::Serialize;

pub mod category {
    pub const STACK: &str = "ai_command::stack";
    pub const STATE: &str = "ai_command::state";
    pub const COMMAND: &str = "ai_command::command";
    pub const RUNAWAY: &str = "ai_command::runaway";
    pub const HISTORY: &str = "ai_command::history";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn level(self) -> log::Level {
        match self {
            Severity::Debug => log::Level::Debug,
            Severity::Info => log::Level::Info,
            Severity::Warning => log::Level::Warn,
            Severity::Error => log::Level::Error,
        }
    }
}

pub trait LogSink {
    fn log(&self, category: &str, severity: Severity, message: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogFacade;

impl LogSink for LogFacade {
    fn log(&self, category: &str, severity: Severity, message: &str) {
        log::log!(target: category, severity.level(), "{message}");
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub category: String,
    pub severity: Severity,
    pub message: String,
}

/// Records every entry; optionally forwards to the `log` facade as well.
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: RefCell<Vec<LogEntry>>,
    forward: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forwarding() -> Self {
        Self {
            entries: RefCell::new(Vec::new()),
            forward: true,
        }
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|entry| entry.severity == severity)
            .count()
    }

    pub fn find(&self, severity: Severity, needle: &str) -> Option<LogEntry> {
        self.entries
            .borrow()
            .iter()
            .find(|entry| entry.severity == severity && entry.message.contains(needle))
            .cloned()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl LogSink for MemorySink {
    fn log(&self, category: &str, severity: Severity, message: &str) {
        if self.forward {
            LogFacade.log(category, severity, message);
        }
        self.entries.borrow_mut().push(LogEntry {
            category: category.to_string(),
            severity,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_filters_by_severity() {
        let sink = MemorySink::new();
        sink.log(category::STACK, Severity::Debug, "pushed Patrol #1");
        sink.log(category::RUNAWAY, Severity::Warning, "depth 51 exceeds 50");
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.count(Severity::Warning), 1);
        let entry = sink
            .find(Severity::Warning, "exceeds")
            .expect("warning recorded");
        assert_eq!(entry.category, category::RUNAWAY);
        assert!(sink.find(Severity::Error, "exceeds").is_none());
        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn severities_map_onto_log_levels() {
        assert_eq!(Severity::Warning.level(), log::Level::Warn);
        assert!(Severity::Debug < Severity::Error);
    }
}
