//! Runner module - Tool invocation layer
//!
//! Every call to the isolate binary (`--init`, `--run`, `--cleanup`) goes
//! through a [`Runner`]:
//! - `ProcessRunner`: spawns the real tool and blocks until it exits
//!
//! The runner module does NOT:
//! - Build isolate arguments (see `sandbox::options`)
//! - Interpret exit codes or output
//! - Retry failed invocations

pub mod process;

use std::io;

/// Raw result of one tool invocation, exactly as the process produced it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOutcome {
    /// Exit code (`None` if the process was killed by a signal)
    pub exit_code: Option<i32>,
    /// Terminating signal, if any
    pub signal: Option<i32>,
    /// Captured stdout bytes
    pub stdout: Vec<u8>,
    /// Captured stderr bytes
    pub stderr: Vec<u8>,
}

impl RunOutcome {
    /// Check if the process exited with code 0
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Stdout followed by stderr, as surfaced in init/cleanup errors
    pub fn combined_output(&self) -> String {
        let mut combined = self.stdout_lossy();
        combined.push_str(&self.stderr_lossy());
        combined
    }
}

/// Runner trait for invoking the isolate tool
pub trait Runner: Send + Sync {
    /// Run the tool with `args` appended to its base command line and wait for it
    fn run(&self, args: &[String]) -> io::Result<RunOutcome>;

    /// Human-readable command name, used in logs and errors
    fn program(&self) -> String;
}

// Re-exports
pub use process::ProcessRunner;

#[cfg(test)]
pub(crate) mod testing {
    //! Recording runner used by unit tests in place of the real tool

    use super::{RunOutcome, Runner};
    use std::io;
    use std::sync::Mutex;

    type Responder = Box<dyn Fn(&[String]) -> io::Result<RunOutcome> + Send + Sync>;

    pub(crate) struct MockRunner {
        calls: Mutex<Vec<Vec<String>>>,
        respond: Responder,
    }

    impl MockRunner {
        pub(crate) fn new(
            respond: impl Fn(&[String]) -> io::Result<RunOutcome> + Send + Sync + 'static,
        ) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                respond: Box::new(respond),
            }
        }

        /// Runner that answers `--init` with `workdir` and succeeds on everything else
        pub(crate) fn with_workdir(workdir: &std::path::Path) -> Self {
            let workdir = format!("{}\n", workdir.display());
            Self::new(move |args| {
                if args.first().map(String::as_str) == Some("--init") {
                    Ok(ok(workdir.as_bytes()))
                } else {
                    Ok(ok(b""))
                }
            })
        }

        pub(crate) fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }

        pub(crate) fn count(&self, subcommand: &str) -> usize {
            self.calls()
                .iter()
                .filter(|c| c.first().map(String::as_str) == Some(subcommand))
                .count()
        }
    }

    impl Runner for MockRunner {
        fn run(&self, args: &[String]) -> io::Result<RunOutcome> {
            self.calls.lock().unwrap().push(args.to_vec());
            (self.respond)(args)
        }

        fn program(&self) -> String {
            "mock-isolate".to_string()
        }
    }

    pub(crate) fn ok(stdout: &[u8]) -> RunOutcome {
        RunOutcome {
            exit_code: Some(0),
            signal: None,
            stdout: stdout.to_vec(),
            stderr: Vec::new(),
        }
    }

    pub(crate) fn failed(code: i32, stderr: &str) -> RunOutcome {
        RunOutcome {
            exit_code: Some(code),
            signal: None,
            stdout: Vec::new(),
            stderr: stderr.as_bytes().to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_output_order() {
        let outcome = RunOutcome {
            exit_code: Some(1),
            signal: None,
            stdout: b"out ".to_vec(),
            stderr: b"err".to_vec(),
        };
        assert!(!outcome.is_success());
        assert_eq!(outcome.combined_output(), "out err");
    }

    #[test]
    fn test_signaled_is_not_success() {
        let outcome = RunOutcome {
            exit_code: None,
            signal: Some(9),
            ..Default::default()
        };
        assert!(!outcome.is_success());
    }
}
