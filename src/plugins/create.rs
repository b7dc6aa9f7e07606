//! `create` handler: ensure directories exist.
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

use super::{Plugin, ensure_directive};
use crate::config::{Payload, create::parse};
use crate::dispatch::Context;
use crate::logging::Log;
use crate::paths;

const DIRECTIVE: &str = "create";

/// Creates directories listed in a `create` directive.
#[derive(Debug)]
pub struct Create {
    log: Arc<dyn Log>,
}

impl Create {
    /// Create the handler.
    #[must_use]
    pub const fn new(log: Arc<dyn Log>) -> Self {
        Self { log }
    }

    /// Ensure one directory exists. Returns `false` if creation failed.
    fn create_one(&self, path: &Path, mode: u32, dry_run: bool) -> bool {
        if path.exists() {
            self.log.lowinfo(&format!("Path exists {}", path.display()));
            return true;
        }
        if dry_run {
            self.log.dry_run(&format!("Would create path {}", path.display()));
            return true;
        }
        self.log.lowinfo(&format!("Creating path {}", path.display()));
        match make_dir(path, mode) {
            Ok(()) => true,
            Err(e) => {
                self.log
                    .warn(&format!("Failed to create path {}: {e}", path.display()));
                false
            }
        }
    }
}

#[cfg(unix)]
fn make_dir(path: &Path, mode: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt as _;
    std::fs::create_dir_all(path)?;
    // Applied after creation so the umask does not narrow it.
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn make_dir(path: &Path, _mode: u32) -> std::io::Result<()> {
    std::fs::create_dir_all(path)
}

impl Plugin for Create {
    fn name(&self) -> &str {
        DIRECTIVE
    }

    fn can_handle(&self, directive: &str) -> bool {
        directive == DIRECTIVE
    }

    fn supports_dry_run(&self) -> bool {
        true
    }

    fn handle(&self, directive: &str, data: &Payload, ctx: &Context) -> Result<bool> {
        ensure_directive(DIRECTIVE, DIRECTIVE, directive)?;
        let defaults = ctx.defaults();
        let specs = parse(data, defaults.get(DIRECTIVE))?;
        let base = ctx.base_directory(false);

        let mut success = true;
        for spec in &specs {
            let path = paths::absolutize(&paths::expand(&spec.path, ctx.home()), &base);
            success &= self.create_one(&path, spec.mode, ctx.dry_run());
        }

        if success {
            self.log.info("All paths have been set up");
        } else {
            self.log.error("Some paths were not successfully set up");
        }
        Ok(success)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::dispatch::RunOptions;
    use crate::exec::SystemExecutor;
    use crate::logging::MemoryLog;
    use serde_json::json;

    fn setup(dry_run: bool) -> (tempfile::TempDir, Context, Arc<MemoryLog>, Create) {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = Context::new(
            tmp.path().to_path_buf(),
            tmp.path().join("home"),
            RunOptions {
                dry_run,
                ..RunOptions::default()
            },
            Arc::new(SystemExecutor),
        );
        let log = Arc::new(MemoryLog::new());
        let plugin = Create::new(log.clone());
        (tmp, ctx, log, plugin)
    }

    #[test]
    fn creates_missing_directories() {
        let (tmp, ctx, log, plugin) = setup(false);
        let ok = plugin
            .handle("create", &json!(["~/downloads", "nested/a/b"]), &ctx)
            .unwrap();
        assert!(ok);
        assert!(tmp.path().join("home/downloads").is_dir());
        assert!(tmp.path().join("nested/a/b").is_dir());
        assert!(log.contains("All paths have been set up"));
    }

    #[test]
    fn existing_path_is_reported() {
        let (tmp, ctx, log, plugin) = setup(false);
        std::fs::create_dir(tmp.path().join("present")).unwrap();
        assert!(plugin.handle("create", &json!(["present"]), &ctx).unwrap());
        assert!(log.contains("Path exists"));
    }

    #[test]
    fn dry_run_does_not_create() {
        let (tmp, ctx, log, plugin) = setup(true);
        assert!(plugin.handle("create", &json!(["later"]), &ctx).unwrap());
        assert!(!tmp.path().join("later").exists());
        assert!(log.contains("Would create path"));
    }

    #[cfg(unix)]
    #[test]
    fn mode_is_applied() {
        use std::os::unix::fs::PermissionsExt as _;
        let (tmp, ctx, _log, plugin) = setup(false);
        assert!(plugin
            .handle("create", &json!({"private": {"mode": 0o700}}), &ctx)
            .unwrap());
        let mode = std::fs::metadata(tmp.path().join("private"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn wrong_directive_is_an_error() {
        let (_tmp, ctx, _log, plugin) = setup(false);
        assert!(plugin.handle("link", &json!([]), &ctx).is_err());
    }
}
