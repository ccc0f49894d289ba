//! Error types for sandbox sessions

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while creating, using or tearing down an isolate box
#[derive(Debug, Error)]
pub enum SandboxError {
    /// Destination resolves outside the box directory
    #[error("destination '{}' is not within the sandbox box directory '{}'", .destination.display(), .box_dir.display())]
    PathEscape {
        destination: PathBuf,
        box_dir: PathBuf,
    },

    /// Host source file does not exist
    #[error("source file '{}' does not exist", .0.display())]
    SourceNotFound(PathBuf),

    /// `isolate --init` failed or its output was unusable
    #[error("failed to initialize isolate box: [{}] {output}", display_code(.code))]
    Init { code: Option<i32>, output: String },

    /// `isolate --cleanup` exited non-zero
    #[error("failed to clean up isolate box: ({}) {output}", display_code(.code))]
    Cleanup { code: Option<i32>, output: String },

    /// Emptying the box failed and `isolate --cleanup` failed as well
    #[error("{empty} (isolate cleanup also failed: {tool})")]
    Teardown {
        #[source]
        empty: Box<SandboxError>,
        tool: Box<SandboxError>,
    },

    /// The tool could not be started at all
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl SandboxError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    }
}

/// Result type for sandbox operations
pub type Result<T> = std::result::Result<T, SandboxError>;

/// Outcome of a scoped session that did not complete cleanly.
///
/// `E` is the error type of the caller's logic. When both the caller and the
/// teardown fail, the caller's error stays primary and is what `source()`
/// returns; the teardown failure is carried alongside it.
#[derive(Debug)]
pub enum ScopeError<E> {
    /// No box was created
    Init(SandboxError),
    /// Caller logic failed, teardown succeeded (or was disabled)
    Body(E),
    /// Caller logic succeeded, teardown failed
    Cleanup(SandboxError),
    /// Both failed
    BodyAndCleanup { body: E, cleanup: SandboxError },
}

impl<E> ScopeError<E> {
    /// The caller's error, if caller logic failed
    pub fn body(&self) -> Option<&E> {
        match self {
            ScopeError::Body(body) | ScopeError::BodyAndCleanup { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn into_body(self) -> Option<E> {
        match self {
            ScopeError::Body(body) | ScopeError::BodyAndCleanup { body, .. } => Some(body),
            _ => None,
        }
    }

    /// The teardown error, if teardown failed
    pub fn cleanup_error(&self) -> Option<&SandboxError> {
        match self {
            ScopeError::Cleanup(cleanup) | ScopeError::BodyAndCleanup { cleanup, .. } => {
                Some(cleanup)
            }
            _ => None,
        }
    }
}

impl<E: fmt::Display> fmt::Display for ScopeError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeError::Init(e) => write!(f, "{}", e),
            ScopeError::Body(e) => write!(f, "{}", e),
            ScopeError::Cleanup(e) => write!(f, "{}", e),
            ScopeError::BodyAndCleanup { body, cleanup } => {
                write!(f, "{} (teardown also failed: {})", body, cleanup)
            }
        }
    }
}

impl<E> std::error::Error for ScopeError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ScopeError::Init(e) | ScopeError::Cleanup(e) => Some(e),
            ScopeError::Body(e) | ScopeError::BodyAndCleanup { body: e, .. } => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_init_error_carries_output() {
        let err = SandboxError::Init {
            code: Some(2),
            output: "Box 10 is currently in use".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to initialize isolate box: [2] Box 10 is currently in use"
        );
    }

    #[test]
    fn test_body_and_cleanup_keeps_body_primary() {
        let err: ScopeError<SandboxError> = ScopeError::BodyAndCleanup {
            body: SandboxError::SourceNotFound(PathBuf::from("/missing")),
            cleanup: SandboxError::Cleanup {
                code: Some(1),
                output: "busy".to_string(),
            },
        };

        let message = err.to_string();
        assert!(message.starts_with("source file '/missing' does not exist"));
        assert!(message.contains("teardown also failed"));
        assert!(matches!(
            err.source().and_then(|s| s.downcast_ref::<SandboxError>()),
            Some(SandboxError::SourceNotFound(_))
        ));
        assert!(err.cleanup_error().is_some());
        assert!(matches!(
            err.into_body(),
            Some(SandboxError::SourceNotFound(_))
        ));
    }
}
