//! Sandbox module - Isolate session lifecycle
//!
//! This module provides a minimal abstraction over the isolate sandbox.
//! It handles:
//! - Translating `IsolateOptions` into isolate directives
//! - Box initialization and guaranteed cleanup
//! - Copying host files into the box without escaping it
//! - Raw command execution returning `RunOutcome`
//!
//! The sandbox module does NOT:
//! - Enforce limits itself (isolate does)
//! - Interpret program output or exit codes
//! - Allocate box IDs (callers pick distinct ones)

pub mod fs;
pub mod isolate_box;
pub mod manager;
pub mod meta;
pub mod options;

// Re-exports for convenience
pub use isolate_box::IsolateBox;
pub use manager::{with_isolate, SandboxGuard, SandboxManager};
pub use meta::{parse_meta, IsolateMeta, IsolateStatus};
pub use options::{IsolateOptions, Quota};
