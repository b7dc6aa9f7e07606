//! Domain-specific error types for the link engine and its dispatcher.
//!
//! This module provides a structured error hierarchy using [`thiserror`].
//! Internal modules return typed errors (e.g., [`ConfigError`],
//! [`PayloadError`]) while the command layer at the CLI boundary converts them
//! to [`anyhow::Error`] via the standard `?` operator.
//!
//! # Error hierarchy
//!
//! ```text
//! DotlinkError
//! ├── Config(ConfigError): config file unreadable or not a task list
//! ├── Setup(SetupError): base directory / home directory problems
//! ├── Payload(PayloadError): malformed directive payload
//! └── Plugin(PluginError): external handler registration failures
//! ```
//!
//! Entry-level link failures are absent: the link engine logs
//! them and folds them into its boolean result.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the engine.
///
/// Aggregates domain-specific sub-errors and is convertible to
/// [`anyhow::Error`] for use at CLI command boundaries.
#[derive(Error, Debug)]
pub enum DotlinkError {
    /// Configuration file could not be turned into a task list.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The run could not be set up (fatal, before dispatch).
    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    /// A directive payload did not have the expected shape.
    #[error("Payload error: {0}")]
    Payload(#[from] PayloadError),

    /// An external handler could not be loaded.
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),
}

/// Errors that arise while reading config files into a task list.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An I/O error occurred while reading a config file.
    #[error("IO error reading config file {path}: {source}")]
    Io {
        /// Path to the file that could not be read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not valid YAML or JSON.
    #[error("Could not parse config file {file}: {message}")]
    Malformed {
        /// Path of the offending file.
        file: String,
        /// Parser diagnostic.
        message: String,
    },

    /// The top-level value is not a sequence of tasks.
    #[error("Configuration file {0} must be a list of tasks")]
    NotASequence(String),

    /// A task entry is not a mapping of directive names to payloads.
    #[error("Task {index} in {file} must be a mapping of directives")]
    TaskNotAMapping {
        /// Path of the offending file.
        file: String,
        /// Zero-based task position inside the file.
        index: usize,
    },
}

/// Fatal problems detected before any directive runs.
#[derive(Error, Debug)]
pub enum SetupError {
    /// No `--config-file` was given.
    #[error("No configuration file specified")]
    NoConfigFile,

    /// The base directory does not exist.
    #[error("Nonexistent base directory {0}")]
    MissingBaseDirectory(PathBuf),

    /// The base directory exists but is not a directory.
    #[error("Base directory {0} is not a directory")]
    NotADirectory(PathBuf),

    /// Neither `HOME` nor `USERPROFILE` is set.
    #[error("Cannot determine the home directory: {0}")]
    NoHome(String),
}

/// A directive payload that failed the typed-parse boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {directive} payload: {message}")]
pub struct PayloadError {
    /// Directive whose payload was rejected.
    pub directive: String,
    /// Human-readable description of what was wrong.
    pub message: String,
}

impl PayloadError {
    /// Create a payload error for `directive`.
    #[must_use]
    pub fn new(directive: &str, message: impl Into<String>) -> Self {
        Self {
            directive: directive.to_string(),
            message: message.into(),
        }
    }
}

/// Errors that arise from loading external handler manifests.
#[derive(Error, Debug)]
pub enum PluginError {
    /// The plugin path does not exist.
    #[error("Plugin path {0} does not exist")]
    NotFound(PathBuf),

    /// The manifest could not be read.
    #[error("IO error reading plugin manifest {path}: {source}")]
    Io {
        /// Manifest path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The manifest is not valid TOML or is missing required keys.
    #[error("Invalid plugin manifest {path}: {message}")]
    Manifest {
        /// Manifest path.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },
}
