//! The one command: load config files and dispatch their tasks.
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::{Cli, VERSION};
use crate::config;
use crate::dispatch::{Context, Dispatcher};
use crate::error::{DotlinkError, SetupError};
use crate::exec::SystemExecutor;
use crate::logging::{Log, Logger};
use crate::paths;
use crate::plugins::{builtin_plugins, external::ManifestLoader};

/// Run the configuration named on the command line.
///
/// # Errors
///
/// Returns an error if setup fails (no config file, bad base directory,
/// unreadable config, no home directory) or if any directive failed.
pub fn run(cli: &Cli, log: &Arc<Logger>) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let home = home_dir().map_err(DotlinkError::from)?;
    run_in(cli, &cwd, home, log)
}

/// The user's home directory from the platform environment variable.
fn home_dir() -> Result<PathBuf, SetupError> {
    let var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    std::env::var(var)
        .ok()
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| SetupError::NoHome(format!("{var} is not set")))
}

/// `-d` if given, else the first config file's directory; relative paths
/// resolve against `cwd`.
fn resolve_base_directory(
    config_files: &[PathBuf],
    explicit: Option<&Path>,
    cwd: &Path,
) -> Result<PathBuf, SetupError> {
    let first = config_files.first().ok_or(SetupError::NoConfigFile)?;
    let base = match explicit {
        Some(dir) => paths::absolutize(dir, cwd),
        None => paths::absolutize(first, cwd)
            .parent()
            .map_or_else(|| cwd.to_path_buf(), Path::to_path_buf),
    };
    if !base.exists() {
        return Err(SetupError::MissingBaseDirectory(base));
    }
    if !base.is_dir() {
        return Err(SetupError::NotADirectory(base));
    }
    Ok(base)
}

fn run_in(cli: &Cli, cwd: &Path, home: PathBuf, log: &Arc<Logger>) -> Result<()> {
    log.debug(&format!("dotlink {VERSION}"));
    let options = cli.run_options();
    let base = resolve_base_directory(&cli.config_file, cli.base_directory.as_deref(), cwd)
        .map_err(DotlinkError::from)?;
    log.debug(&format!("base directory: {}", base.display()));

    let files: Vec<PathBuf> = cli
        .config_file
        .iter()
        .map(|f| paths::absolutize(f, cwd))
        .collect();
    let tasks = config::load(&files).map_err(DotlinkError::from)?;
    log.debug(&format!("loaded {} task(s)", tasks.len()));

    let shared: Arc<dyn Log> = Arc::clone(log) as Arc<dyn Log>;
    let builtins = if options.disable_built_in_plugins {
        Vec::new()
    } else {
        builtin_plugins(&shared)
    };
    let plugin_paths: Vec<PathBuf> = options
        .plugins
        .iter()
        .map(|p| paths::absolutize(p, cwd))
        .collect();
    let exit_on_failure = options.exit_on_failure;

    let context =
        Context::new(base, home, options, Arc::new(SystemExecutor)).with_plugins(builtins);
    let loader = ManifestLoader::new(Arc::clone(&shared));
    let mut dispatcher = Dispatcher::new(context, Box::new(loader), shared);

    let mut success = dispatcher.load_plugins(&plugin_paths);
    if success || !exit_on_failure {
        success &= dispatcher.dispatch(&tasks);
    }

    log.print_summary();

    if success {
        log.info("All tasks executed successfully");
        Ok(())
    } else {
        anyhow::bail!("Some tasks were not executed successfully");
    }
}
