//! `link` handler: the link reconciliation engine.
//!
//! Each entry of a `link` payload is resolved to one [`LinkOperation`], or
//! to one per glob match, and handed to [`Linker::apply`].
pub mod glob;
pub mod ops;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use self::glob::TargetGlob;
use self::ops::{LinkOperation, Linker};
use super::{Plugin, ensure_directive};
use crate::config::link::{LinkSpec, parse};
use crate::config::Payload;
use crate::dispatch::Context;
use crate::exec::ShellIo;
use crate::logging::Log;
use crate::paths;

const DIRECTIVE: &str = "link";

/// Handler for the `link` directive.
#[derive(Debug)]
pub struct Link {
    log: Arc<dyn Log>,
}

impl Link {
    /// Create the handler.
    #[must_use]
    pub const fn new(log: Arc<dyn Log>) -> Self {
        Self { log }
    }

    /// Run an `if` test. Spawn failures count as a failed test.
    fn test_passes(&self, test: &str, ctx: &Context) -> bool {
        match ctx
            .executor()
            .shell(test, &ctx.base_directory(false), &ShellIo::default())
        {
            Ok(result) => result.success,
            Err(e) => {
                self.log.debug(&format!("Test `{test}` could not run: {e:#}"));
                false
            }
        }
    }

    /// Reconcile one entry; returns `false` if any of its links failed.
    fn process(&self, spec: &LinkSpec, ctx: &Context, linker: &Linker<'_>) -> bool {
        let o = &spec.options;
        let link_name = paths::expand_vars(&spec.link);
        let link_path = paths::absolutize(
            &paths::expand(&spec.link, ctx.home()),
            &ctx.base_directory(false),
        );

        if let Some(test) = &o.test
            && !self.test_passes(test, ctx)
        {
            self.log.info(&format!("Skipping {link_name}"));
            return true;
        }

        let target = paths::expand(&spec.target, ctx.home());
        let base = ctx.base_directory(o.canonicalize);
        let operation = |link_name: String, link_path: PathBuf, target_name: String, target_path: PathBuf| {
            LinkOperation {
                link_name,
                link_path,
                target_name,
                target_path,
                link_type: o.link_type,
                relative: o.relative,
                force: o.force,
                relink: o.relink,
                create: o.create,
                ignore_missing: o.ignore_missing,
            }
        };

        if o.glob && paths::has_glob_chars(&spec.target) {
            let pattern = TargetGlob::new(&target.to_string_lossy(), &base);
            let excludes: Vec<_> = o
                .exclude
                .iter()
                .map(|e| TargetGlob::new(&paths::expand(e, ctx.home()).to_string_lossy(), &base))
                .collect();
            let matches = pattern.expand(&excludes);
            if matches.is_empty() {
                self.log
                    .debug(&format!("Glob {} matched nothing for {link_name}", spec.target));
                return true;
            }
            self.log.debug(&format!(
                "Globs from '{}': {}",
                spec.target,
                matches
                    .iter()
                    .map(|m| m.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));

            let mut success = true;
            for matched in matches {
                let item = format!("{}{}", o.prefix, pattern.suffix(&matched).display());
                let target_name = matched
                    .strip_prefix(&base)
                    .unwrap_or(&matched)
                    .display()
                    .to_string();
                let op = operation(
                    Path::new(&link_name).join(&item).display().to_string(),
                    link_path.join(&item),
                    target_name,
                    matched,
                );
                success &= linker.apply(&op);
            }
            return success;
        }

        let target_path = paths::absolutize(&target, &base);
        if o.create && !linker.create_parent(&link_path) {
            return false;
        }
        if !target_path.exists() && !o.ignore_missing {
            self.log.warn(&format!(
                "Nonexistent target {link_name} -> {}",
                spec.target
            ));
            return false;
        }
        // Parent already handled above.
        linker.apply(&LinkOperation {
            create: false,
            ..operation(link_name, link_path, spec.target.clone(), target_path)
        })
    }
}

impl Plugin for Link {
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
        let linker = Linker::new(self.log.as_ref(), ctx.dry_run());

        let mut success = true;
        for spec in &specs {
            success &= self.process(spec, ctx, &linker);
        }

        if success {
            self.log.info("All links have been set up");
        } else {
            self.log.error("Some links were not successfully set up");
        }
        Ok(success)
    }
}
