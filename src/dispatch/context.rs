//! Run-scoped state shared with every handler.
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Payload;
use crate::exec::Executor;
use crate::logging::Verbosity;
use crate::plugins::Plugin;

/// Command-line options that shape a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Preview changes without touching the filesystem.
    pub dry_run: bool,
    /// Console verbosity.
    pub verbosity: Verbosity,
    /// Run only these directives (empty: no restriction).
    pub only: Vec<String>,
    /// Skip these directives.
    pub except: Vec<String>,
    /// Abort the whole run on the first failed directive.
    pub exit_on_failure: bool,
    /// Start with an empty handler registry.
    pub disable_built_in_plugins: bool,
    /// Extra plugin paths given on the command line.
    pub plugins: Vec<PathBuf>,
}

impl RunOptions {
    /// Returns `true` if `--only` / `--except` exclude `directive`.
    #[must_use]
    pub fn filters_out(&self, directive: &str) -> bool {
        let listed = |names: &[String]| names.iter().any(|n| n == directive);
        (!self.only.is_empty() && !listed(&self.only)) || listed(&self.except)
    }
}

/// Immutable snapshot of the per-directive default options.
///
/// Cloning is cheap and every clone observes the same values forever; a
/// later `defaults` directive installs a new snapshot rather than editing
/// this one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectiveDefaults(Arc<Map<String, Value>>);

impl DirectiveDefaults {
    /// Wrap a directive → options mapping.
    #[must_use]
    pub fn new(map: Map<String, Value>) -> Self {
        Self(Arc::new(map))
    }

    /// Default options for `directive`, if any were set.
    #[must_use]
    pub fn get(&self, directive: &str) -> Option<&Payload> {
        self.0.get(directive)
    }

    /// Returns `true` if no defaults are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Shared context for directive handling.
///
/// Handlers only ever see `&Context`. The two mutation points, replacing
/// the defaults and appending to the registry, are crate-private and driven
/// by the [`Dispatcher`](super::Dispatcher) between directives.
#[derive(Debug)]
pub struct Context {
    base_directory: PathBuf,
    home: PathBuf,
    defaults: DirectiveDefaults,
    options: Arc<RunOptions>,
    plugins: Vec<Arc<dyn Plugin>>,
    executor: Arc<dyn Executor>,
}

impl Context {
    /// Create a context with an empty handler registry and no defaults.
    #[must_use]
    pub fn new(
        base_directory: PathBuf,
        home: PathBuf,
        options: RunOptions,
        executor: Arc<dyn Executor>,
    ) -> Self {
        Self {
            base_directory,
            home,
            defaults: DirectiveDefaults::default(),
            options: Arc::new(options),
            plugins: Vec::new(),
            executor,
        }
    }

    /// Seed the registry with `plugins`.
    #[must_use]
    pub fn with_plugins(mut self, plugins: Vec<Arc<dyn Plugin>>) -> Self {
        self.plugins.extend(plugins);
        self
    }

    /// The run's base directory.
    ///
    /// With `canonicalize`, symlinks in the path are resolved; if that
    /// fails (e.g. the directory vanished) the literal path is returned.
    #[must_use]
    pub fn base_directory(&self, canonicalize: bool) -> PathBuf {
        if canonicalize {
            dunce::canonicalize(&self.base_directory).unwrap_or_else(|_| self.base_directory.clone())
        } else {
            self.base_directory.clone()
        }
    }

    /// The user's home directory, used for `~` expansion.
    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Snapshot of the current directive defaults.
    #[must_use]
    pub fn defaults(&self) -> DirectiveDefaults {
        self.defaults.clone()
    }

    /// The run options.
    #[must_use]
    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Shorthand for `options().dry_run`.
    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// Snapshot of the handler registry, in registration order.
    #[must_use]
    pub fn plugins(&self) -> Vec<Arc<dyn Plugin>> {
        self.plugins.clone()
    }

    /// Command runner for `if` tests, shell commands and external handlers.
    #[must_use]
    pub fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }

    /// Replace the directive defaults wholesale.
    pub(crate) fn set_defaults(&mut self, defaults: Map<String, Value>) {
        self.defaults = DirectiveDefaults::new(defaults);
    }

    /// Append handlers to the registry.
    pub(crate) fn register_plugins(&mut self, plugins: Vec<Arc<dyn Plugin>>) {
        self.plugins.extend(plugins);
    }
}
