//! Shell command execution behind an injectable [`Executor`] trait.
use anyhow::{Context as _, Result};
use std::io::Write as _;
use std::path::Path;
use std::process::{Command, Stdio};

/// Result of a command execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecResult {
    /// Whether the command exited with status zero.
    pub success: bool,
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
}

/// Which standard streams a shell command is connected to.
///
/// Streams that are not enabled are redirected to the null device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellIo {
    /// Inherit the parent's stdin.
    pub stdin: bool,
    /// Inherit the parent's stdout.
    pub stdout: bool,
    /// Inherit the parent's stderr.
    pub stderr: bool,
    /// Feed this text to the child's stdin instead of inheriting it.
    pub input: Option<String>,
}

impl ShellIo {
    /// All three streams inherited from the parent.
    #[must_use]
    pub fn inherit() -> Self {
        Self {
            stdin: true,
            stdout: true,
            stderr: true,
            input: None,
        }
    }
}

/// Abstraction over running shell commands.
///
/// Handlers call through this trait so tests can substitute a recording
/// implementation. The production implementation is [`SystemExecutor`].
pub trait Executor: Send + Sync + std::fmt::Debug {
    /// Run `command` through the user's shell in `cwd`.
    ///
    /// A non-zero exit is reported through [`ExecResult::success`], not as
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the shell cannot be spawned or waited on.
    fn shell(&self, command: &str, cwd: &Path, io: &ShellIo) -> Result<ExecResult>;
}

/// Production [`Executor`] that spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

/// Build a [`Command`] that runs `command` through the platform shell.
fn shell_command(command: &str) -> Command {
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    }
    #[cfg(not(windows))]
    {
        let shell = std::env::var("SHELL")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "sh".to_string());
        let mut cmd = Command::new(shell);
        cmd.args(["-c", command]);
        cmd
    }
}

fn stdio(inherit: bool) -> Stdio {
    if inherit {
        Stdio::inherit()
    } else {
        Stdio::null()
    }
}

impl Executor for SystemExecutor {
    fn shell(&self, command: &str, cwd: &Path, io: &ShellIo) -> Result<ExecResult> {
        let mut cmd = shell_command(command);
        cmd.current_dir(cwd)
            .stdout(stdio(io.stdout))
            .stderr(stdio(io.stderr));
        if io.input.is_some() {
            cmd.stdin(Stdio::piped());
        } else {
            cmd.stdin(stdio(io.stdin));
        }

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to execute: {command}"))?;

        if let Some(input) = &io.input
            && let Some(mut stdin) = child.stdin.take()
        {
            // The child may exit without reading its input.
            if let Err(e) = stdin.write_all(input.as_bytes())
                && e.kind() != std::io::ErrorKind::BrokenPipe
            {
                return Err(e).with_context(|| format!("failed to write stdin of: {command}"));
            }
        }

        let status = child
            .wait()
            .with_context(|| format!("failed to wait for: {command}"))?;
        Ok(ExecResult {
            success: status.success(),
            code: status.code(),
        })
    }
}
