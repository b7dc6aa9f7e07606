//! Path helpers: environment/tilde expansion and lexical path arithmetic.
//!
//! Everything here is purely lexical except [`absolutize`], which only joins.
//! No function touches the filesystem.
use std::path::{Component, Path, PathBuf};

/// Interpolate `$VAR` and `${VAR}` references from the process environment.
///
/// References to unset variables, and malformed `${` sequences, are left
/// unchanged.
#[must_use]
pub fn expand_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];
        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };
        if !name.is_empty()
            && let Ok(value) = std::env::var(name)
        {
            out.push_str(&value);
        } else {
            out.push_str(&rest[pos..pos + 1 + consumed]);
        }
        rest = &after[consumed..];
    }
    out.push_str(rest);
    out
}

/// Replace a leading `~` (alone or followed by a separator) with `home`.
#[must_use]
pub fn expand_tilde(input: &str, home: &Path) -> String {
    if input == "~" {
        return home.display().to_string();
    }
    match input
        .strip_prefix("~/")
        .or_else(|| input.strip_prefix("~\\"))
    {
        Some(rest) => home.join(rest).display().to_string(),
        None => input.to_string(),
    }
}

/// Full user-path expansion: variables, then tilde, then separators.
#[must_use]
pub fn expand(input: &str, home: &Path) -> PathBuf {
    let expanded = expand_tilde(&expand_vars(input), home);
    #[cfg(windows)]
    let expanded = expanded.replace('/', "\\");
    PathBuf::from(expanded)
}

/// Lexically normalise `path`: drop `.` components and fold `..` into the
/// preceding normal component.
///
/// Leading `..` components of a relative path are kept; `..` directly
/// under the root is dropped.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out: Vec<Component<'_>> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.last() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    if out.is_empty() {
        return PathBuf::from(".");
    }
    out.iter().collect()
}

/// Resolve `path` against `base` if it is relative, then normalise.
#[must_use]
pub fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&base.join(path))
    }
}

/// Lexical relative path from directory `base` to `path`.
///
/// Both arguments should be absolute and normalised.
#[must_use]
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path_parts: Vec<_> = path.components().collect();
    let base_parts: Vec<_> = base.components().collect();
    let shared = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut out = PathBuf::new();
    for _ in shared..base_parts.len() {
        out.push("..");
    }
    for part in path_parts.iter().skip(shared) {
        out.push(part);
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Longest shared leading component sequence of `a` and `b`.
#[must_use]
pub fn common_prefix(a: &Path, b: &Path) -> PathBuf {
    a.components()
        .zip(b.components())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect()
}

/// Returns `true` if `s` contains any glob metacharacter (`*`, `?`, `[`).
#[must_use]
pub fn has_glob_chars(s: &str) -> bool {
    s.contains(['*', '?', '['])
}
