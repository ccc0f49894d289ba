//! Process runner implementation
//!
//! Spawns the isolate binary directly and captures its streams.

use std::io;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, Output};
use tracing::debug;

use super::{RunOutcome, Runner};

/// Default isolate binary name, resolved through `PATH`
pub const DEFAULT_ISOLATE_BIN: &str = "isolate";

/// Runner that executes the isolate tool as a child process
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    /// Program to execute
    program: String,
    /// Arguments placed before every subcommand (e.g. `isolate` for `sudo isolate`)
    base_args: Vec<String>,
}

impl ProcessRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
        }
    }

    pub fn with_base_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.base_args = args.into_iter().map(|a| a.into()).collect();
        self
    }

    /// Create from a whitespace-separated command line such as `sudo isolate`.
    /// Returns `None` for a blank command.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program).with_base_args(parts))
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(DEFAULT_ISOLATE_BIN)
    }
}

impl Runner for ProcessRunner {
    fn run(&self, args: &[String]) -> io::Result<RunOutcome> {
        debug!("Running {} with args: {:?}", self.program(), args);

        let output = Command::new(&self.program)
            .args(&self.base_args)
            .args(args)
            .output()?;

        let outcome = RunOutcome::from(output);
        debug!(
            "{} exited with {:?} (signal {:?}), {} bytes stdout, {} bytes stderr",
            self.program,
            outcome.exit_code,
            outcome.signal,
            outcome.stdout.len(),
            outcome.stderr.len()
        );
        Ok(outcome)
    }

    fn program(&self) -> String {
        let mut parts = vec![self.program.as_str()];
        parts.extend(self.base_args.iter().map(String::as_str));
        parts.join(" ")
    }
}

impl From<Output> for RunOutcome {
    fn from(output: Output) -> Self {
        Self {
            exit_code: output.status.code(),
            signal: output.status.signal(),
            stdout: output.stdout,
            stderr: output.stderr,
        }
    }
}
