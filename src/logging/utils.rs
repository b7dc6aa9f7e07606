//! Run log location, ANSI stripping, and timestamps.
use std::fs;
use std::path::PathBuf;

/// Strip ANSI escape sequences from a string.
///
/// CSI sequences run until a final byte in `@`..=`~`; any other escape
/// drops the escape and the byte after it.
pub(super) fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        if chars.next() == Some('[') {
            for inner in chars.by_ref() {
                if ('@'..='~').contains(&inner) {
                    break;
                }
            }
        }
    }
    out
}

/// Path of `run.log` under `$XDG_CACHE_HOME/dotlink/`, falling back to
/// `~/.cache/dotlink/`. The directory is created on demand; `None` if that
/// fails.
pub(super) fn log_file_path() -> Option<PathBuf> {
    let cache = std::env::var_os("XDG_CACHE_HOME").map_or_else(
        || {
            std::env::var_os("HOME")
                .or_else(|| std::env::var_os("USERPROFILE"))
                .map_or_else(|| PathBuf::from("."), PathBuf::from)
                .join(".cache")
        },
        PathBuf::from,
    );
    let dir = cache.join("dotlink");
    fs::create_dir_all(&dir).ok()?;
    Some(dir.join("run.log"))
}

/// Current UTC time as `YYYY-MM-DD HH:MM:SS` (run header).
pub(super) fn format_utc_datetime() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Current UTC time as `HH:MM:SS` (per-line prefix).
pub(super) fn format_utc_time() -> String {
    chrono::Utc::now().format("%H:%M:%S").to_string()
}
