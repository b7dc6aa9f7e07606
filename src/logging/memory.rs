//! In-memory [`Log`] implementation that captures messages for inspection.
use std::sync::Mutex;

use super::types::{DirectiveEntry, DirectiveStatus, Log};

/// Severity tag attached to each captured message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Debug output.
    Debug,
    /// Low-priority progress.
    LowInfo,
    /// Directive summaries.
    Info,
    /// Warnings.
    Warn,
    /// Errors.
    Error,
    /// Dry-run previews.
    DryRun,
}

/// A [`Log`] that records every message instead of printing it.
///
/// Used by library consumers that want to render output themselves and by
/// the test suite to assert on exact wording.
#[derive(Debug, Default)]
pub struct MemoryLog {
    messages: Mutex<Vec<(Level, String)>>,
    directives: Mutex<Vec<DirectiveEntry>>,
}

impl MemoryLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: Level, msg: &str) {
        if let Ok(mut guard) = self.messages.lock() {
            guard.push((level, msg.to_string()));
        }
    }

    /// Snapshot of every captured message in emission order.
    #[must_use]
    pub fn messages(&self) -> Vec<(Level, String)> {
        self.messages.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Messages captured at `level`.
    #[must_use]
    pub fn at(&self, level: Level) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    /// Returns `true` if any captured message contains `fragment`.
    #[must_use]
    pub fn contains(&self, fragment: &str) -> bool {
        self.messages
            .lock()
            .is_ok_and(|g| g.iter().any(|(_, m)| m.contains(fragment)))
    }

    /// Snapshot of every recorded directive result.
    #[must_use]
    pub fn directives(&self) -> Vec<DirectiveEntry> {
        self.directives.lock().map_or_else(|_| vec![], |g| g.clone())
    }
}

impl Log for MemoryLog {
    fn debug(&self, msg: &str) {
        self.push(Level::Debug, msg);
    }

    fn lowinfo(&self, msg: &str) {
        self.push(Level::LowInfo, msg);
    }

    fn info(&self, msg: &str) {
        self.push(Level::Info, msg);
    }

    fn warn(&self, msg: &str) {
        self.push(Level::Warn, msg);
    }

    fn error(&self, msg: &str) {
        self.push(Level::Error, msg);
    }

    fn dry_run(&self, msg: &str) {
        self.push(Level::DryRun, msg);
    }

    fn record_directive(&self, name: &str, status: DirectiveStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.directives.lock() {
            guard.push(DirectiveEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }
}
