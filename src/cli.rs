//! Command-line surface.
use clap::{ArgAction, Parser};
use std::io::IsTerminal as _;
use std::path::PathBuf;

use crate::dispatch::RunOptions;
use crate::logging::Verbosity;

/// Build version: `DOTLINK_VERSION` from the build script, else the crate
/// version.
pub const VERSION: &str = match option_env!("DOTLINK_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

/// Command-line entry point for the link reconciliation engine.
#[derive(Parser, Debug)]
#[command(
    name = "dotlink",
    about = "Declaratively link dotfiles into place",
    version = VERSION
)]
pub struct Cli {
    /// Configuration file(s) to run, in order
    #[arg(short = 'c', long = "config-file", num_args = 1.., value_name = "FILE")]
    pub config_file: Vec<PathBuf>,

    /// Base directory for relative paths (default: directory of the first config file)
    #[arg(short = 'd', long, value_name = "DIR")]
    pub base_directory: Option<PathBuf>,

    /// Load directive handlers from a manifest file or directory
    #[arg(short = 'p', long = "plugin", value_name = "PATH")]
    pub plugin: Vec<PathBuf>,

    /// Do not register the built-in link/create/clean/shell handlers
    #[arg(long)]
    pub disable_built_in_plugins: bool,

    /// Run only these directives
    #[arg(long, value_delimiter = ',', num_args = 1.., conflicts_with = "except")]
    pub only: Vec<String>,

    /// Skip these directives
    #[arg(long, value_delimiter = ',', num_args = 1..)]
    pub except: Vec<String>,

    /// Preview changes without applying them
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Enable verbose output (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress most output
    #[arg(short, long)]
    pub quiet: bool,

    /// Suppress almost all output
    #[arg(short = 'Q', long)]
    pub super_quiet: bool,

    /// Force colour output
    #[arg(long, conflicts_with = "no_color")]
    pub force_color: bool,

    /// Disable colour output
    #[arg(long)]
    pub no_color: bool,

    /// Stop at the first failed directive
    #[arg(short = 'x', long)]
    pub exit_on_failure: bool,
}

impl Cli {
    /// Console verbosity; the quietest requested level wins.
    #[must_use]
    pub const fn verbosity(&self) -> Verbosity {
        if self.super_quiet {
            Verbosity::SuperQuiet
        } else if self.quiet {
            Verbosity::Quiet
        } else if self.verbose > 0 {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// Whether to emit ANSI colour codes.
    #[must_use]
    pub fn color(&self) -> bool {
        if self.force_color {
            true
        } else if self.no_color {
            false
        } else {
            std::io::stdout().is_terminal()
        }
    }

    /// Options handed to the dispatcher context.
    #[must_use]
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            dry_run: self.dry_run,
            verbosity: self.verbosity(),
            only: self.only.clone(),
            except: self.except.clone(),
            exit_on_failure: self.exit_on_failure,
            disable_built_in_plugins: self.disable_built_in_plugins,
            plugins: self.plugin.clone(),
        }
    }
}
