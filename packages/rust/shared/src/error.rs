//! Error types for treesum.
//!
//! Library crates use [`SynthesisError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all treesum operations.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// Invalid options, templates, or input, rejected before any model call.
    #[error("config error: {message}")]
    Config { message: String },

    /// The model service could not produce a response (network, auth, quota).
    #[error("invocation failed: {0}")]
    Invocation(String),

    /// The response payload did not contain the expected answer text.
    #[error("malformed response: {message}")]
    MalformedResponse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SynthesisError>;

impl SynthesisError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an invocation error from any displayable message.
    pub fn invocation(msg: impl Into<String>) -> Self {
        Self::Invocation(msg.into())
    }

    /// Create a malformed-response error from any displayable message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
