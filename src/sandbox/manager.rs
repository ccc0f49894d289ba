//! Sandbox manager
//!
//! Creates isolate boxes with `isolate --init` and guarantees they are torn
//! down again on every exit path.

use std::ops::Deref;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::isolate_box::IsolateBox;
use super::options::IsolateOptions;
use crate::error::{Result, SandboxError, ScopeError};
use crate::runner::{ProcessRunner, Runner};

/// Factory for isolate boxes sharing one set of options
#[derive(Clone)]
pub struct SandboxManager {
    options: IsolateOptions,
    release_on_exit: bool,
    runner: Arc<dyn Runner>,
}

impl SandboxManager {
    /// Manager using the `isolate` binary from `PATH`
    pub fn new(options: IsolateOptions) -> Self {
        Self::with_runner(options, Arc::new(ProcessRunner::default()))
    }

    pub fn with_runner(options: IsolateOptions, runner: Arc<dyn Runner>) -> Self {
        Self {
            options,
            release_on_exit: true,
            runner,
        }
    }

    /// Whether boxes are cleaned up when the scope ends (default: true).
    ///
    /// With `false` the box and its work directory are left behind for
    /// inspection.
    pub fn release_on_exit(mut self, release: bool) -> Self {
        self.release_on_exit = release;
        self
    }

    pub fn options(&self) -> &IsolateOptions {
        &self.options
    }

    /// Initialise a new box. The caller owns its teardown.
    pub fn init(&self) -> Result<IsolateBox> {
        let mut args = vec!["--init".to_string()];
        args.extend(self.options.as_args());

        debug!("Initializing isolate box with args: {:?}", args);

        let outcome = self.runner.run(&args).map_err(|e| SandboxError::Init {
            code: None,
            output: format!("failed to run {}: {}", self.runner.program(), e),
        })?;

        if !outcome.is_success() {
            return Err(SandboxError::Init {
                code: outcome.exit_code,
                output: outcome.combined_output(),
            });
        }

        let work_dir = outcome.stdout_lossy().trim().to_string();
        if work_dir.is_empty() {
            return Err(SandboxError::Init {
                code: outcome.exit_code,
                output: "isolate did not report a work directory".to_string(),
            });
        }

        let sandbox = IsolateBox::new(
            self.options.clone(),
            PathBuf::from(work_dir),
            self.runner.clone(),
        );
        info!("Created isolate sandbox: {}", sandbox);
        Ok(sandbox)
    }

    /// Initialise a box wrapped in a guard that tears it down when dropped
    pub fn acquire(&self) -> Result<SandboxGuard> {
        let sandbox = self.init()?;
        Ok(SandboxGuard {
            sandbox,
            armed: self.release_on_exit,
        })
    }

    /// Run `f` against a fresh box and tear the box down afterwards.
    ///
    /// Teardown happens whether `f` returns `Ok`, `Err` or panics. If both `f`
    /// and the teardown fail, both errors are returned with `f`'s as primary.
    pub fn scope<T, E, F>(&self, f: F) -> std::result::Result<T, ScopeError<E>>
    where
        F: FnOnce(&IsolateBox) -> std::result::Result<T, E>,
    {
        let guard = self.acquire().map_err(ScopeError::Init)?;
        let outcome = f(&guard);
        let teardown = guard.finish();

        match (outcome, teardown) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(cleanup)) => Err(ScopeError::Cleanup(cleanup)),
            (Err(body), Ok(())) => Err(ScopeError::Body(body)),
            (Err(body), Err(cleanup)) => Err(ScopeError::BodyAndCleanup { body, cleanup }),
        }
    }
}

/// Run `f` in a box created with the default runner, cleaning up afterwards
pub fn with_isolate<T, E, F>(
    options: IsolateOptions,
    f: F,
) -> std::result::Result<T, ScopeError<E>>
where
    F: FnOnce(&IsolateBox) -> std::result::Result<T, E>,
{
    SandboxManager::new(options).scope(f)
}

/// Initialised box that is cleaned up when the guard goes out of scope.
///
/// Prefer [`SandboxGuard::finish`] on the normal path: `Drop` cannot report a
/// failed teardown and only logs it.
#[derive(Debug)]
pub struct SandboxGuard {
    sandbox: IsolateBox,
    armed: bool,
}

impl SandboxGuard {
    /// Tear the box down now (unless release-on-exit is disabled) and report the result
    pub fn finish(mut self) -> Result<()> {
        if !std::mem::replace(&mut self.armed, false) {
            info!("Keeping isolate sandbox for inspection: {}", self.sandbox);
            return Ok(());
        }
        self.sandbox.cleanup()
    }
}

impl Deref for SandboxGuard {
    type Target = IsolateBox;

    fn deref(&self) -> &IsolateBox {
        &self.sandbox
    }
}

impl Drop for SandboxGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if std::thread::panicking() {
            warn!("Cleaning up isolate sandbox during unwind: {}", self.sandbox);
        }
        if let Err(e) = self.sandbox.cleanup() {
            error!("Failed to clean up isolate sandbox {}: {}", self.sandbox, e);
        }
    }
}
