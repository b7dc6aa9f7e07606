//! Directive handlers: the [`Plugin`] capability contract, the built-in
//! handler set, and loading of external handlers.
pub mod clean;
pub mod create;
pub mod external;
pub mod link;
pub mod shell;

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use crate::config::Payload;
use crate::dispatch::Context;
use crate::logging::Log;

/// A directive handler.
///
/// The dispatcher calls [`handle`](Plugin::handle) on every registered
/// plugin whose [`can_handle`](Plugin::can_handle) accepts the directive
/// name and ANDs the results.
pub trait Plugin: Send + Sync + std::fmt::Debug {
    /// Name used in log messages.
    fn name(&self) -> &str;

    /// Returns `true` if this plugin processes `directive`.
    fn can_handle(&self, directive: &str) -> bool;

    /// Whether [`handle`](Plugin::handle) honours dry-run mode.
    ///
    /// Plugins that return `false` are skipped entirely during a dry run.
    fn supports_dry_run(&self) -> bool {
        false
    }

    /// Process one occurrence of `directive`.
    ///
    /// Returns `Ok(false)` for ordinary failures that have already been
    /// logged.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed payloads or unexpected conditions;
    /// the dispatcher logs it and fails the directive.
    fn handle(&self, directive: &str, data: &Payload, ctx: &Context) -> Result<bool>;
}

/// Turns a filesystem path into handlers.
///
/// Injected into the [`Dispatcher`](crate::dispatch::Dispatcher) so the
/// loading mechanism can be swapped out; the production implementation is
/// [`external::ManifestLoader`].
pub trait PluginLoader: Send + Sync + std::fmt::Debug {
    /// Load every handler defined at `path` (a file or a directory).
    ///
    /// # Errors
    ///
    /// Returns an error if `path` does not exist or cannot be parsed.
    fn load(&self, path: &Path) -> Result<Vec<Arc<dyn Plugin>>>;
}

/// The handlers registered unless `--disable-built-in-plugins` is given.
#[must_use]
pub fn builtin_plugins(log: &Arc<dyn Log>) -> Vec<Arc<dyn Plugin>> {
    vec![
        Arc::new(link::Link::new(Arc::clone(log))),
        Arc::new(create::Create::new(Arc::clone(log))),
        Arc::new(clean::Clean::new(Arc::clone(log))),
        Arc::new(shell::Shell::new(Arc::clone(log))),
    ]
}

/// Fail loudly if a plugin is routed a directive it never claimed.
fn ensure_directive(plugin: &str, expected: &str, directive: &str) -> Result<()> {
    if directive == expected {
        Ok(())
    } else {
        anyhow::bail!("{plugin} cannot handle directive {directive}")
    }
}
