//! `link` directive payload parsing and option resolution.
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;

use super::{Payload, layer, typed};
use crate::error::PayloadError;

const DIRECTIVE: &str = "link";

/// Kind of link to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkType {
    /// Symbolic link.
    #[default]
    Symlink,
    /// Hard link.
    Hardlink,
}

impl fmt::Display for LinkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symlink => f.write_str("symlink"),
            Self::Hardlink => f.write_str("hardlink"),
        }
    }
}

/// Fully resolved options for one link entry.
///
/// Built from the entry's own keys layered over the directive defaults;
/// [`Default`] supplies the built-in values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LinkOptions {
    /// Symbolic or hard link.
    #[serde(rename = "type")]
    pub link_type: LinkType,
    /// Remove an existing non-link file or directory at the link path.
    pub force: bool,
    /// Replace an existing symlink that points somewhere else.
    pub relink: bool,
    /// Create the link's parent directory if missing.
    pub create: bool,
    /// Record the target relative to the link's directory.
    pub relative: bool,
    /// Resolve the base directory through symlinks before joining targets.
    pub canonicalize: bool,
    /// Treat the target as a glob pattern.
    pub glob: bool,
    /// Glob patterns whose matches are excluded.
    pub exclude: Vec<String>,
    /// Prefix prepended to each glob match's file name.
    pub prefix: String,
    /// Shell test gating this entry; non-zero exit skips it.
    #[serde(rename = "if")]
    pub test: Option<String>,
    /// Create the link even if the target does not exist.
    pub ignore_missing: bool,
}

impl Default for LinkOptions {
    fn default() -> Self {
        Self {
            link_type: LinkType::Symlink,
            force: false,
            relink: false,
            create: false,
            relative: false,
            canonicalize: true,
            glob: false,
            exclude: Vec::new(),
            prefix: String::new(),
            test: None,
            ignore_missing: false,
        }
    }
}

/// One parsed entry of a `link` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    /// Link path exactly as written (may contain `~`, variables).
    pub link: String,
    /// Target path as written, or derived from the link name.
    pub target: String,
    /// Resolved options.
    pub options: LinkOptions,
}

/// Rename `canonicalize-path` to `canonicalize`, the key it aliases.
fn normalize_keys(mut map: Map<String, Value>) -> Map<String, Value> {
    if let Some(value) = map.remove("canonicalize-path") {
        map.entry("canonicalize").or_insert(value);
    }
    map
}

/// Target used when an entry gives none: the link's file name with one
/// leading dot removed.
fn derived_target(link: &str) -> String {
    let name = Path::new(link)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.strip_prefix('.').map_or_else(|| name.clone(), str::to_string)
}

/// Parse a `link` payload, layering `defaults` (the `link` entry of the
/// directive defaults) under each entry.
///
/// # Errors
///
/// Returns a [`PayloadError`] if the payload is not a mapping or an entry
/// has the wrong shape.
pub fn parse(data: &Payload, defaults: Option<&Payload>) -> Result<Vec<LinkSpec>, PayloadError> {
    let Value::Object(entries) = data else {
        return Err(PayloadError::new(
            DIRECTIVE,
            "expected a mapping of link paths to targets",
        ));
    };

    // `path` is per-entry only.
    let defaults = defaults.and_then(Value::as_object).map(|d| {
        let mut d = normalize_keys(d.clone());
        d.remove("path");
        Value::Object(d)
    });

    entries
        .iter()
        .map(|(link, value)| {
            let (path, own) = match value {
                Value::Null => (None, Map::new()),
                Value::String(s) => (Some(s.clone()), Map::new()),
                Value::Object(map) => {
                    let mut map = normalize_keys(map.clone());
                    let path = match map.remove("path") {
                        None | Some(Value::Null) => None,
                        Some(Value::String(s)) => Some(s),
                        Some(_) => {
                            return Err(PayloadError::new(
                                DIRECTIVE,
                                format!("`path` of {link} must be a string"),
                            ));
                        }
                    };
                    (path, map)
                }
                _ => {
                    return Err(PayloadError::new(
                        DIRECTIVE,
                        format!("entry {link} must be a path, a mapping, or null"),
                    ));
                }
            };
            let options: LinkOptions = typed(DIRECTIVE, layer(own, defaults.as_ref()))?;
            Ok(LinkSpec {
                link: link.clone(),
                target: path.unwrap_or_else(|| derived_target(link)),
                options,
            })
        })
        .collect()
}
