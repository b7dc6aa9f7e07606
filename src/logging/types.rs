//! Core logging types: directive entries, status, and the [`Log`] trait.

/// Directive execution result for summary reporting.
#[derive(Debug, Clone)]
pub struct DirectiveEntry {
    /// Directive name (e.g. `link`, `shell`).
    pub name: String,
    /// Final status of the directive.
    pub status: DirectiveStatus,
    /// Optional detail message (e.g., skip reason or error description).
    pub message: Option<String>,
}

/// Status of a processed directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveStatus {
    /// Every claiming handler reported success.
    Ok,
    /// The directive was filtered out by `--only` / `--except`.
    Skipped,
    /// The directive ran in dry-run mode; no changes were applied.
    DryRun,
    /// The directive was unclaimed or a handler failed.
    Failed,
}

/// Abstraction over logging backends.
///
/// [`Logger`](super::logger::Logger) routes messages through `tracing`;
/// [`MemoryLog`](super::memory::MemoryLog) captures them for assertions.
/// Every component receives an `Arc<dyn Log>` at construction instead of
/// reaching for a process-wide logger.
pub trait Log: Send + Sync + std::fmt::Debug {
    /// Log a debug message (shown with `-v`).
    fn debug(&self, msg: &str);
    /// Log a low-priority informational message (per-item progress).
    fn lowinfo(&self, msg: &str);
    /// Log an informational message (per-directive summaries).
    fn info(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record a directive result for the summary.
    fn record_directive(&self, name: &str, status: DirectiveStatus, message: Option<&str>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_status_equality() {
        assert_eq!(DirectiveStatus::Ok, DirectiveStatus::Ok);
        assert_ne!(DirectiveStatus::Ok, DirectiveStatus::Failed);
        assert_ne!(DirectiveStatus::Skipped, DirectiveStatus::DryRun);
    }

    #[test]
    fn directive_entry_clone() {
        let entry = DirectiveEntry {
            name: "link".to_string(),
            status: DirectiveStatus::Failed,
            message: Some("2 links failed".to_string()),
        };
        let cloned = entry.clone();
        assert_eq!(cloned.name, entry.name);
        assert_eq!(cloned.status, entry.status);
        assert_eq!(cloned.message, entry.message);
    }
}
