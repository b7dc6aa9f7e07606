//! `defaults` directive payload: directive name → default option mapping.
use serde_json::{Map, Value};

use super::Payload;
use crate::error::PayloadError;

/// Validate a `defaults` payload and return it as an owned mapping.
///
/// Each occurrence of the directive replaces the whole default set; no
/// merging with earlier blocks happens here or in the dispatcher.
///
/// # Errors
///
/// Returns a [`PayloadError`] if the payload is not a mapping, or if any
/// value is neither a mapping nor `null`.
pub fn parse(data: &Payload) -> Result<Map<String, Value>, PayloadError> {
    let Value::Object(map) = data else {
        return Err(PayloadError::new(
            "defaults",
            "expected a mapping of directive names to options",
        ));
    };
    let mut out = Map::new();
    for (directive, options) in map {
        match options {
            Value::Object(_) => {
                out.insert(directive.clone(), options.clone());
            }
            Value::Null => {
                out.insert(directive.clone(), Value::Object(Map::new()));
            }
            _ => {
                return Err(PayloadError::new(
                    "defaults",
                    format!("options for `{directive}` must be a mapping"),
                ));
            }
        }
    }
    Ok(out)
}
