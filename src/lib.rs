//! Declarative dotfile link reconciliation engine.
//!
//! A run reads one or more config files into an ordered list of tasks, each
//! a mapping of directive names to payloads, and hands them to a
//! [`dispatch::Dispatcher`]. The dispatcher routes every directive to the
//! handlers that claim it:
//!
//! - **[`plugins::link`]**: the link engine (globs, conflicts, relinking)
//! - **[`plugins::create`]**, **[`plugins::clean`]**, **[`plugins::shell`]**:
//!   built-in collaborators
//! - **[`plugins::external`]**: command-backed handlers declared in TOML
//!   manifests
//!
//! Every decision is re-derived from the current filesystem, so re-running
//! the same configuration is safe.
#![deny(clippy::or_fun_call)]
#![deny(clippy::bool_to_int_with_if)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod exec;
pub mod logging;
pub mod paths;
pub mod plugins;
