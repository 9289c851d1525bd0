//! Error types for jsondocgen.
//!
//! Library crates use [`DocGenError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Variants map onto how far a failure reaches: `Parse` and `Introspection`
//! stay inside a single catalog item, everything else ends the run.

use std::path::PathBuf;

/// Top-level error type for all jsondocgen operations.
#[derive(Debug, thiserror::Error)]
pub enum DocGenError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Description markup is malformed or could not be read.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Runtime facts for an item could not be obtained.
    #[error("introspection error: {0}")]
    Introspection(String),

    /// The catalog or the type family could not be enumerated.
    #[error("registry error: {0}")]
    Registry(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON encoding or decoding failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Data validation error (malformed snapshot, inconsistent inputs, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DocGenError>;

impl DocGenError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create an introspection error from any displayable message.
    pub fn introspection(msg: impl Into<String>) -> Self {
        Self::Introspection(msg.into())
    }

    /// Create a registry error from any displayable message.
    pub fn registry(msg: impl Into<String>) -> Self {
        Self::Registry(msg.into())
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
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

    /// Whether this error is scoped to a single catalog item.
    pub fn is_item_scoped(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Introspection(_))
    }
}

impl From<serde_json::Error> for DocGenError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
