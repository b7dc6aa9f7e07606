//! `shell` directive payload: commands to run.
use serde::Deserialize;
use serde_json::{Map, Value};

use super::{Payload, layer, typed};
use crate::error::PayloadError;

const DIRECTIVE: &str = "shell";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ShellOptions {
    command: Option<String>,
    description: Option<String>,
    quiet: bool,
    stdin: bool,
    stdout: bool,
    stderr: bool,
}

/// One command of a `shell` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellCommand {
    /// Command line passed to the shell.
    pub command: String,
    /// Human-readable description logged instead of the command.
    pub description: Option<String>,
    /// Log only the description, never the command.
    pub quiet: bool,
    /// Connect the child's stdin to the terminal.
    pub stdin: bool,
    /// Connect the child's stdout to the terminal.
    pub stdout: bool,
    /// Connect the child's stderr to the terminal.
    pub stderr: bool,
}

/// Turn one list item into an option mapping.
fn entry_map(item: &Value) -> Result<Map<String, Value>, PayloadError> {
    let mut map = Map::new();
    match item {
        Value::String(cmd) => {
            map.insert("command".into(), Value::String(cmd.clone()));
        }
        Value::Array(parts) => match parts.as_slice() {
            [Value::String(cmd)] => {
                map.insert("command".into(), Value::String(cmd.clone()));
            }
            [Value::String(cmd), Value::String(desc)] => {
                map.insert("command".into(), Value::String(cmd.clone()));
                map.insert("description".into(), Value::String(desc.clone()));
            }
            _ => {
                return Err(PayloadError::new(
                    DIRECTIVE,
                    "list commands must be [command] or [command, description]",
                ));
            }
        },
        Value::Object(o) => map.clone_from(o),
        _ => {
            return Err(PayloadError::new(
                DIRECTIVE,
                "each command must be a string, a list, or a mapping",
            ));
        }
    }
    Ok(map)
}

/// Parse a `shell` payload.
///
/// # Errors
///
/// Returns a [`PayloadError`] if the payload is not a list, or an entry is
/// malformed or has no command.
pub fn parse(data: &Payload, defaults: Option<&Payload>) -> Result<Vec<ShellCommand>, PayloadError> {
    let Value::Array(items) = data else {
        return Err(PayloadError::new(DIRECTIVE, "expected a list of commands"));
    };
    // Only stream and quiet settings are inheritable.
    let defaults = defaults.and_then(Value::as_object).map(|d| {
        let mut d = d.clone();
        d.remove("command");
        d.remove("description");
        Value::Object(d)
    });

    items
        .iter()
        .map(|item| {
            let options: ShellOptions = typed(DIRECTIVE, layer(entry_map(item)?, defaults.as_ref()))?;
            let command = options
                .command
                .ok_or_else(|| PayloadError::new(DIRECTIVE, "missing `command`"))?;
            Ok(ShellCommand {
                command,
                description: options.description,
                quiet: options.quiet,
                stdin: options.stdin,
                stdout: options.stdout,
                stderr: options.stderr,
            })
        })
        .collect()
}
