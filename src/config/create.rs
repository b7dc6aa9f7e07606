//! `create` directive payload: directories to ensure exist.
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{Payload, layer, typed};
use crate::error::PayloadError;

const DIRECTIVE: &str = "create";

/// Options for one directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
struct CreateOptions {
    mode: u32,
}

impl Default for CreateOptions {
    fn default() -> Self {
        Self { mode: 0o777 }
    }
}

/// A directory to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSpec {
    /// Path as written (may contain `~`, variables).
    pub path: String,
    /// Permission bits applied on creation (unix only).
    pub mode: u32,
}

/// Parse a `create` payload: a list of paths, or a mapping of path to
/// `{mode}`.
///
/// # Errors
///
/// Returns a [`PayloadError`] if the payload has the wrong shape.
pub fn parse(data: &Payload, defaults: Option<&Payload>) -> Result<Vec<CreateSpec>, PayloadError> {
    let entries: Vec<(String, Map<String, Value>)> = match data {
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok((s.clone(), Map::new())),
                _ => Err(PayloadError::new(DIRECTIVE, "list entries must be paths")),
            })
            .collect::<Result<_, _>>()?,
        Value::Object(map) => map
            .iter()
            .map(|(path, options)| match options {
                Value::Null => Ok((path.clone(), Map::new())),
                Value::Object(o) => Ok((path.clone(), o.clone())),
                _ => Err(PayloadError::new(
                    DIRECTIVE,
                    format!("options for {path} must be a mapping"),
                )),
            })
            .collect::<Result<_, _>>()?,
        _ => {
            return Err(PayloadError::new(
                DIRECTIVE,
                "expected a list of paths or a mapping",
            ));
        }
    };

    entries
        .into_iter()
        .map(|(path, own)| {
            let options: CreateOptions = typed(DIRECTIVE, layer(own, defaults))?;
            Ok(CreateSpec {
                path,
                mode: options.mode,
            })
        })
        .collect()
}
