//! Typed-parse boundary: config files into ordered tasks, and per-directive
//! payload parsers.
pub mod clean;
pub mod create;
pub mod defaults;
pub mod link;
pub mod shell;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, PayloadError};

/// Raw directive payload as read from the config file.
///
/// Parsed into a typed spec (e.g. [`link::LinkSpec`]) by the handler that
/// claims the directive.
pub type Payload = Value;

/// One directive of a task: a name and its untyped payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Directive {
    /// Directive name (e.g. `link`).
    pub name: String,
    /// Payload exactly as written in the config file.
    pub data: Payload,
}

/// One entry of the configuration list, with directives in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Task {
    /// Directives in the order they appear in the task mapping.
    pub directives: Vec<Directive>,
}

/// Load and concatenate the tasks of every config file, in order.
///
/// # Errors
///
/// Returns the first [`ConfigError`] encountered.
pub fn load(paths: &[PathBuf]) -> Result<Vec<Task>, ConfigError> {
    let mut tasks = Vec::new();
    for path in paths {
        tasks.extend(load_file(path)?);
    }
    Ok(tasks)
}

/// Load the tasks of a single config file.
///
/// Files ending in `.json` are parsed as JSON; everything else as YAML.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is malformed, or does not
/// contain a list of task mappings.
pub fn load_file(path: &Path) -> Result<Vec<Task>, ConfigError> {
    let file = path.display().to_string();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: file.clone(),
        source,
    })?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    parse_str(&content, is_json, &file)
}

/// Parse config text into tasks. `file` is used in error messages only.
///
/// # Errors
///
/// Returns an error if the text is malformed or not a list of mappings.
pub fn parse_str(content: &str, is_json: bool, file: &str) -> Result<Vec<Task>, ConfigError> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: Value = if is_json {
        serde_json::from_str(content).map_err(|e| ConfigError::Malformed {
            file: file.to_string(),
            message: e.to_string(),
        })?
    } else {
        serde_yaml::from_str(content).map_err(|e| ConfigError::Malformed {
            file: file.to_string(),
            message: e.to_string(),
        })?
    };
    parse_tasks(value, file)
}

/// Convert a parsed document into tasks.
///
/// `null` (an empty YAML document) yields no tasks.
///
/// # Errors
///
/// Returns an error if `value` is not a sequence of mappings.
pub fn parse_tasks(value: Value, file: &str) -> Result<Vec<Task>, ConfigError> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        _ => return Err(ConfigError::NotASequence(file.to_string())),
    };
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(Task {
                directives: map
                    .into_iter()
                    .map(|(name, data)| Directive { name, data })
                    .collect(),
            }),
            _ => Err(ConfigError::TaskNotAMapping {
                file: file.to_string(),
                index,
            }),
        })
        .collect()
}

/// Overlay `entry` on the directive-level `defaults` mapping.
///
/// Keys present in `entry` win; keys only in `defaults` are inherited.
/// Anything not covered by either falls through to the built-in default of
/// the typed struct it is later deserialized into.
pub(crate) fn layer(entry: Map<String, Value>, defaults: Option<&Payload>) -> Map<String, Value> {
    let mut merged = match defaults {
        Some(Value::Object(d)) => d.clone(),
        _ => Map::new(),
    };
    merged.extend(entry);
    merged
}

/// Deserialize a layered option mapping into `T`, tagging failures with the
/// directive name.
pub(crate) fn typed<T: DeserializeOwned>(
    directive: &str,
    map: Map<String, Value>,
) -> Result<T, PayloadError> {
    serde_json::from_value(Value::Object(map)).map_err(|e| PayloadError::new(directive, e.to_string()))
}
