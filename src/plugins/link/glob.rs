//! Glob expansion of link targets.
use glob::{MatchOptions, Pattern};
use std::collections::HashSet;
use std::path::{MAIN_SEPARATOR, Path, PathBuf};

use crate::paths;

// Hidden entries are filtered by `visible` instead: with a literal leading
// dot required, `glob` drops every dot-named child, even for `.*`.
const OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// A target pattern resolved against the base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetGlob {
    /// Absolute, unescaped pattern path (used for prefix arithmetic).
    pattern: PathBuf,
    /// Pattern string handed to the `glob` crate.
    query: String,
    dirs_only: bool,
    recursive: bool,
}

fn ends_with_separator(s: &str) -> bool {
    s.ends_with('/') || (cfg!(windows) && s.ends_with('\\'))
}

fn segments(s: &str) -> Vec<&str> {
    s.split(['/', MAIN_SEPARATOR])
        .filter(|seg| !seg.is_empty())
        .collect()
}

/// Whether the matched segment `name` may stand for pattern segment `pat`.
///
/// `.` and `..` only match themselves; other dot names need a pattern
/// segment that starts with a dot.
fn accepts(pat: &str, name: &str) -> bool {
    if name == "." || name == ".." {
        pat == name
    } else {
        !name.starts_with('.') || pat.starts_with('.')
    }
}

/// Whether `path` lines up with `pattern` without a wildcard standing for a
/// hidden or special entry. `**` never descends into hidden directories.
fn visible(pattern: &[&str], path: &[&str]) -> bool {
    match (pattern.split_first(), path.split_first()) {
        (None, _) => path.is_empty(),
        (Some((&"**", rest)), _) => {
            visible(rest, path)
                || path
                    .split_first()
                    .is_some_and(|(name, tail)| !name.starts_with('.') && visible(pattern, tail))
        }
        (Some(_), None) => false,
        (Some((pat, rest)), Some((name, tail))) => accepts(pat, name) && visible(rest, tail),
    }
}

impl TargetGlob {
    /// Resolve `pattern` (already variable/tilde expanded) against `base`.
    ///
    /// Relative patterns are anchored at `base`, whose own characters are
    /// escaped so they never act as metacharacters. A trailing separator
    /// restricts matches to directories.
    #[must_use]
    pub fn new(pattern: &str, base: &Path) -> Self {
        let dirs_only = ends_with_separator(pattern);
        let trimmed = pattern.trim_end_matches(['/', MAIN_SEPARATOR]);
        let relative = !Path::new(trimmed).is_absolute();
        let query = if relative {
            let escaped = Pattern::escape(&base.to_string_lossy());
            format!("{escaped}{MAIN_SEPARATOR}{trimmed}")
        } else {
            trimmed.to_string()
        };
        let pattern = if relative {
            base.join(trimmed)
        } else {
            PathBuf::from(trimmed)
        };
        Self {
            pattern,
            query,
            dirs_only,
            recursive: trimmed.contains("**"),
        }
    }

    /// Matches of the pattern; unreadable entries are skipped.
    fn raw_matches(&self) -> Vec<PathBuf> {
        let Ok(paths) = glob::glob_with(&self.query, OPTIONS) else {
            return Vec::new();
        };
        let pattern = self.pattern.to_string_lossy();
        let pattern = segments(&pattern);
        paths
            .filter_map(Result::ok)
            .filter(|p| visible(&pattern, &segments(&p.to_string_lossy())))
            .collect()
    }

    /// Expand the pattern, subtract `excludes`, and apply the directory /
    /// regular-file filters.
    #[must_use]
    pub fn expand(&self, excludes: &[TargetGlob]) -> Vec<PathBuf> {
        let excluded: HashSet<PathBuf> = excludes.iter().flat_map(Self::raw_matches).collect();
        let mut matches: Vec<PathBuf> = self
            .raw_matches()
            .into_iter()
            .filter(|p| !excluded.contains(p))
            .filter(|p| {
                if self.dirs_only {
                    p.is_dir()
                } else if self.recursive {
                    p.is_file()
                } else {
                    true
                }
            })
            .collect();
        matches.sort();
        matches
    }

    /// Path of `matched` below the literal part of the pattern.
    ///
    /// `config/*` matching `config/nvim` yields `nvim`; `config/**/*.conf`
    /// matching `config/a/b.conf` yields `a/b.conf`.
    #[must_use]
    pub fn suffix(&self, matched: &Path) -> PathBuf {
        let common = paths::common_prefix(&self.pattern, matched);
        match matched.strip_prefix(&common) {
            Ok(rest) if !rest.as_os_str().is_empty() => rest.to_path_buf(),
            _ => matched.file_name().map(PathBuf::from).unwrap_or_default(),
        }
    }
}
