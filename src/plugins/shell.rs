//! `shell` handler: run commands in the base directory.
use anyhow::Result;
use std::sync::Arc;

use super::{Plugin, ensure_directive};
use crate::config::{Payload, shell::ShellCommand, shell::parse};
use crate::dispatch::Context;
use crate::exec::ShellIo;
use crate::logging::Log;

const DIRECTIVE: &str = "shell";

/// Runs the commands of a `shell` directive.
#[derive(Debug)]
pub struct Shell {
    log: Arc<dyn Log>,
}

impl Shell {
    /// Create the handler.
    #[must_use]
    pub const fn new(log: Arc<dyn Log>) -> Self {
        Self { log }
    }

    fn announce(&self, cmd: &ShellCommand) {
        match (&cmd.description, cmd.quiet) {
            (Some(desc), true) => self.log.lowinfo(desc),
            (Some(desc), false) => self.log.lowinfo(&format!("{desc} [{}]", cmd.command)),
            (None, false) => self.log.lowinfo(&cmd.command),
            (None, true) => {}
        }
    }
}

impl Plugin for Shell {
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
        let commands = parse(data, defaults.get(DIRECTIVE))?;
        let cwd = ctx.base_directory(true);

        let mut success = true;
        for cmd in &commands {
            if ctx.dry_run() {
                self.log.dry_run(&format!("Would run command {}", cmd.command));
                continue;
            }
            self.announce(cmd);
            let io = ShellIo {
                stdin: cmd.stdin,
                stdout: cmd.stdout,
                stderr: cmd.stderr,
                input: None,
            };
            let ok = match ctx.executor().shell(&cmd.command, &cwd, &io) {
                Ok(result) => result.success,
                Err(e) => {
                    self.log.debug(&format!("{e:#}"));
                    false
                }
            };
            if !ok {
                self.log.warn(&format!("Command [{}] failed", cmd.command));
                success = false;
            }
        }

        if success {
            self.log.info("All commands have been executed");
        } else {
            self.log.error("Some commands were not successfully executed");
        }
        Ok(success)
    }
}
