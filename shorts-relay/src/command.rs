//! External command execution.
//!
//! The fetcher and the registrar both drive `yt-dlp`. They do so through
//! [`CommandRunner`] so tests can substitute canned output for a real binary.

use async_trait::async_trait;
use tracing::debug;

use crate::{Error, Result};

/// Output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Last few stderr lines, for error messages.
    pub fn stderr_tail(&self) -> String {
        process_utils::tail_lines(&self.stderr, process_utils::STDERR_TAIL_LINES)
    }

    /// Human-readable failure description for a non-zero exit.
    pub fn failure_message(&self) -> String {
        let code = self
            .exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        let tail = self.stderr_tail();
        if tail.is_empty() {
            format!("exited with {code}")
        } else {
            format!("exited with {code}: {tail}")
        }
    }
}

/// Runs an external program to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` and capture its output.
    ///
    /// Fails only when the program cannot be started; a non-zero exit is
    /// reported through [`CommandOutput::exit_code`].
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput>;
}

/// [`CommandRunner`] that spawns real child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput> {
        debug!(program = %program, args = ?args, "Running external command");

        let output = process_utils::run_captured(program, args)
            .await
            .map_err(|e| Error::process(program, e))?;

        Ok(CommandOutput {
            exit_code: output.code(),
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}
