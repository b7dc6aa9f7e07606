//! `clean` directive payload: directories to sweep for dead links.
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{Payload, layer, typed};
use crate::error::PayloadError;

const DIRECTIVE: &str = "clean";

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
struct CleanOptions {
    force: bool,
    recursive: bool,
}

/// A directory to clean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanSpec {
    /// Directory as written (may contain `~`, variables).
    pub path: String,
    /// Remove dead links even if they point outside the base directory.
    pub force: bool,
    /// Descend into real (non-link) sub-directories.
    pub recursive: bool,
}

/// Parse a `clean` payload: a list of directories, or a mapping of
/// directory to `{force, recursive}`.
///
/// # Errors
///
/// Returns a [`PayloadError`] if the payload has the wrong shape.
pub fn parse(data: &Payload, defaults: Option<&Payload>) -> Result<Vec<CleanSpec>, PayloadError> {
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
                "expected a list of directories or a mapping",
            ));
        }
    };

    entries
        .into_iter()
        .map(|(path, own)| {
            let options: CleanOptions = typed(DIRECTIVE, layer(own, defaults))?;
            Ok(CleanSpec {
                path,
                force: options.force,
                recursive: options.recursive,
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_form() {
        let specs = parse(&json!(["~", "~/.config"]), None).unwrap();
        assert_eq!(specs.len(), 2);
        assert!(!specs[0].force);
        assert!(!specs[0].recursive);
    }

    #[test]
    fn mapping_form_and_defaults() {
        let defaults = json!({"recursive": true});
        let specs = parse(
            &json!({"~/.config": {"force": true}, "~": null}),
            Some(&defaults),
        )
        .unwrap();
        assert!(specs[0].force && specs[0].recursive);
        assert!(!specs[1].force && specs[1].recursive);
    }

    #[test]
    fn wrong_shape_rejected() {
        assert!(parse(&json!(true), None).is_err());
        assert!(parse(&json!({"~": {"force": 1}}), None).is_err());
    }
}
