//! Structured logger with dry-run awareness and summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::types::{DirectiveEntry, DirectiveStatus, Log};
use super::utils::log_file_path;

/// Target used for low-priority informational events.
pub(super) const LOWINFO_TARGET: &str = "dotlink::lowinfo";
/// Target used for dry-run action events.
pub(super) const DRY_RUN_TARGET: &str = "dotlink::dry_run";

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
///
/// The `record_directive` method is **not** included because its signature
/// differs from the `fn(&self, &str)` pattern shared by the display methods.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with dry-run awareness and summary collection.
///
/// Messages are emitted as `tracing` events; the subscriber installed by
/// [`init_subscriber`](super::subscriber::init_subscriber) decides what
/// reaches the console and always appends everything to
/// `$XDG_CACHE_HOME/dotlink/run.log`.
#[derive(Debug)]
pub struct Logger {
    directives: Mutex<Vec<DirectiveEntry>>,
    log_file: Option<PathBuf>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Create a new logger.
    ///
    /// Stores the log file path for display in the run summary.  The file
    /// itself is created by the subscriber's file layer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            directives: Mutex::new(Vec::new()),
            log_file: log_file_path(),
        }
    }

    /// Return the log file path, if available.
    #[cfg(test)]
    pub const fn log_path(&self) -> Option<&PathBuf> {
        self.log_file.as_ref()
    }

    /// Return a clone of all recorded directive entries (test-only).
    #[cfg(test)]
    pub(crate) fn directive_entries(&self) -> Vec<DirectiveEntry> {
        self.directives.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a low-priority informational message.
    pub fn lowinfo(&self, msg: &str) {
        tracing::info!(target: LOWINFO_TARGET, "{msg}");
    }

    /// Log a debug message (suppressed on console unless verbose; always
    /// written to the log file).
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN_TARGET, "{msg}");
    }

    /// Record a directive result for the summary.
    pub fn record_directive(&self, name: &str, status: DirectiveStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.directives.lock() {
            guard.push(DirectiveEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Return `true` if any recorded directive has failed (test-only).
    #[cfg(test)]
    pub(crate) fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }

    /// Count the number of failed directives (test-only).
    #[cfg(test)]
    pub(crate) fn failure_count(&self) -> usize {
        self.directives.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|d| d.status == DirectiveStatus::Failed)
                .count()
        })
    }

    /// Print the summary of all recorded directives.
    pub fn print_summary(&self) {
        let directives = match self.directives.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => return,
        };
        if directives.is_empty() {
            return;
        }

        self.info("\x1b[1mSummary\x1b[0m");

        let mut ok = 0u32;
        let mut skipped = 0u32;
        let mut dry_run = 0u32;
        let mut failed = 0u32;

        for directive in &directives {
            let (icon, color) = match directive.status {
                DirectiveStatus::Ok => {
                    ok += 1;
                    ("✓", "\x1b[32m")
                }
                DirectiveStatus::Skipped => {
                    skipped += 1;
                    ("○", "\x1b[33m")
                }
                DirectiveStatus::DryRun => {
                    dry_run += 1;
                    ("~", "\x1b[37m")
                }
                DirectiveStatus::Failed => {
                    failed += 1;
                    ("✗", "\x1b[31m")
                }
            };

            let suffix = directive
                .message
                .as_ref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));

            self.lowinfo(&format!("{color}{icon} {}{suffix}\x1b[0m", directive.name));
        }

        let total = ok + skipped + dry_run + failed;
        self.info(&format!(
            "{total} directives: \x1b[32m{ok} ok\x1b[0m, \x1b[33m{skipped} skipped\x1b[0m, \x1b[37m{dry_run} dry-run\x1b[0m, \x1b[31m{failed} failed\x1b[0m"
        ));

        if let Some(path) = &self.log_file {
            self.lowinfo(&format!("\x1b[2mlog: {}\x1b[0m", path.display()));
        }
    }
}

impl Log for Logger {
    forward_log_methods!(debug, lowinfo, info, warn, error, dry_run);

    fn record_directive(&self, name: &str, status: DirectiveStatus, message: Option<&str>) {
        self.record_directive(name, status, message);
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::logging::isolated_logger;
    use std::fs;

    #[test]
    fn logger_new_has_no_entries() {
        let (log, _tmp, _guard) = isolated_logger();
        assert!(log.directive_entries().is_empty());
    }

    #[test]
    fn record_directive_with_message() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record_directive("shell", DirectiveStatus::Skipped, Some("filtered"));
        let entries = log.directive_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "shell");
        assert_eq!(entries[0].message, Some("filtered".to_string()));
    }

    #[test]
    fn has_failures_detects_failed_directive() {
        let (log, _tmp, _guard) = isolated_logger();
        assert!(!log.has_failures());
        log.record_directive("link", DirectiveStatus::Ok, None);
        assert!(!log.has_failures());
        log.record_directive("shell", DirectiveStatus::Failed, None);
        assert!(log.has_failures());
        assert_eq!(log.failure_count(), 1);
    }

    #[test]
    fn log_trait_delegates_to_logger() {
        let (log, _tmp, _guard) = isolated_logger();
        let log_ref: &dyn Log = &log;
        log_ref.record_directive("via-trait", DirectiveStatus::Ok, None);
        assert_eq!(log.directive_entries().len(), 1);
    }

    #[test]
    fn debug_always_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        let marker = format!("debug-marker-{}", std::process::id());
        log.debug(&marker);
        let path = log.log_path().expect("log path should exist");
        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.contains("[debug]"));
        assert!(contents.contains(&marker));
    }

    #[test]
    fn warn_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        let marker = format!("warn-marker-{}", std::process::id());
        log.warn(&marker);
        let path = log.log_path().expect("log path");
        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.contains("[warn]"));
        assert!(contents.contains(&marker));
    }

    #[test]
    fn dry_run_written_to_file() {
        let (log, _tmp, _guard) = isolated_logger();
        let marker = format!("dryrun-marker-{}", std::process::id());
        log.dry_run(&marker);
        let path = log.log_path().expect("log path");
        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.contains("[dry run]"));
        assert!(contents.contains(&marker));
    }

    #[test]
    fn summary_written_to_file_without_ansi() {
        let (log, _tmp, _guard) = isolated_logger();
        log.record_directive("link", DirectiveStatus::Ok, None);
        log.record_directive("shell", DirectiveStatus::Failed, Some("exit 1"));
        log.print_summary();
        let path = log.log_path().expect("log path");
        let contents = fs::read_to_string(path).unwrap();
        assert!(contents.contains("✗ shell (exit 1)"));
        assert!(contents.contains("2 directives: 1 ok, 0 skipped, 0 dry-run, 1 failed"));
        assert!(!contents.contains('\x1b'));
    }
}
