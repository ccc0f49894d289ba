//! Session management for the [isolate](https://github.com/ioi/isolate) sandbox.
//!
//! A box is created with `isolate --init`, populated with host files, used to
//! run programs with `isolate --run`, and always released with
//! `isolate --cleanup`:
//!
//! ```no_run
//! use isolate_sandbox::{with_isolate, IsolateOptions};
//!
//! let options = IsolateOptions {
//!     box_id: Some(10),
//!     ..Default::default()
//! };
//! let outcome = with_isolate(options, |sandbox| {
//!     sandbox.add_file("test.sh", None)?;
//!     sandbox.run(&["/bin/bash", "test.sh"])
//! })?;
//! assert_eq!(outcome.stdout_lossy().trim(), "Hello World");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Logging goes through `tracing`; the library never installs a subscriber.

pub mod config;
pub mod error;
pub mod runner;
pub mod sandbox;

pub use error::{Result, SandboxError, ScopeError};
pub use runner::{ProcessRunner, RunOutcome, Runner};
pub use sandbox::{
    with_isolate, IsolateBox, IsolateMeta, IsolateOptions, IsolateStatus, Quota, SandboxGuard,
    SandboxManager,
};
