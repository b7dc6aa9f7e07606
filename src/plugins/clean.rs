//! `clean` handler: remove dangling symlinks.
use anyhow::{Context as _, Result};
use std::path::Path;
use std::sync::Arc;

use super::{Plugin, ensure_directive};
use crate::config::{Payload, clean::parse};
use crate::dispatch::Context;
use crate::logging::Log;
use crate::paths;

const DIRECTIVE: &str = "clean";

/// Removes dead links from the directories listed in a `clean` directive.
#[derive(Debug)]
pub struct Clean {
    log: Arc<dyn Log>,
}

/// Per-directory settings threaded through the recursive walk.
struct Sweep<'a> {
    force: bool,
    recursive: bool,
    dry_run: bool,
    bases: [&'a Path; 2],
}

impl Clean {
    /// Create the handler.
    #[must_use]
    pub const fn new(log: Arc<dyn Log>) -> Self {
        Self { log }
    }

    /// Sweep `dir`, returning `false` if any removal failed.
    fn sweep(&self, dir: &Path, sweep: &Sweep<'_>) -> Result<bool> {
        if !dir.is_dir() {
            self.log
                .debug(&format!("Ignoring nonexistent directory {}", dir.display()));
            return Ok(true);
        }

        let mut entries = std::fs::read_dir(dir)
            .with_context(|| format!("reading {}", dir.display()))?
            .map(|e| e.map(|entry| entry.path()))
            .collect::<std::io::Result<Vec<_>>>()
            .with_context(|| format!("reading {}", dir.display()))?;
        entries.sort();

        let mut success = true;
        for path in entries {
            let Ok(meta) = std::fs::symlink_metadata(&path) else {
                continue;
            };
            if meta.is_dir() {
                if sweep.recursive {
                    success &= self.sweep(&path, sweep)?;
                }
                continue;
            }
            if !meta.file_type().is_symlink() || path.exists() {
                continue;
            }

            let recorded = std::fs::read_link(&path)
                .with_context(|| format!("reading link {}", path.display()))?;
            let parent = path.parent().unwrap_or(dir);
            let dest = paths::absolutize(&recorded, parent);
            let inside = sweep.bases.iter().any(|base| dest.starts_with(base));

            if !(inside || sweep.force) {
                self.log.lowinfo(&format!(
                    "Link {} -> {} not removed.",
                    path.display(),
                    dest.display()
                ));
                continue;
            }
            if sweep.dry_run {
                self.log.dry_run(&format!(
                    "Would remove invalid link {} -> {}",
                    path.display(),
                    dest.display()
                ));
                continue;
            }
            self.log.lowinfo(&format!(
                "Removing invalid link {} -> {}",
                path.display(),
                dest.display()
            ));
            if let Err(e) = std::fs::remove_file(&path) {
                self.log
                    .warn(&format!("Failed to remove {}: {e}", path.display()));
                success = false;
            }
        }
        Ok(success)
    }
}

impl Plugin for Clean {
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
        let literal = ctx.base_directory(false);
        let canonical = ctx.base_directory(true);

        let mut success = true;
        for spec in &specs {
            let dir = paths::absolutize(&paths::expand(&spec.path, ctx.home()), &literal);
            let sweep = Sweep {
                force: spec.force,
                recursive: spec.recursive,
                dry_run: ctx.dry_run(),
                bases: [&literal, &canonical],
            };
            success &= self.sweep(&dir, &sweep)?;
        }

        if success {
            self.log.info("All targets have been cleaned");
        } else {
            self.log.error("Some targets were not successfully cleaned");
        }
        Ok(success)
    }
}
