//! Error types for SocialSync.
//!
//! Library crates use [`SocialSyncError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all SocialSync operations.
#[derive(Debug, thiserror::Error)]
pub enum SocialSyncError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// The store or a platform API could not be reached, or refused the request.
    #[error("connection error: {0}")]
    Connection(String),

    /// A raw record or payload is missing fields the normalizer expects.
    #[error("data shape error: {message}")]
    DataShape { message: String },

    /// The delete or insert phase of a staged merge failed.
    #[error("merge into {table} failed: {message}")]
    MergeTransaction { table: String, message: String },

    /// Any other database error (queries, migrations, report logs).
    #[error("storage error: {0}")]
    Storage(String),

    /// Report generation error (LLM API or response parsing).
    #[error("report error: {0}")]
    Report(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Invalid caller input (unknown platform, bad table spec, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SocialSyncError>;

impl SocialSyncError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a data shape error from any displayable message.
    pub fn data_shape(msg: impl Into<String>) -> Self {
        Self::DataShape {
            message: msg.into(),
        }
    }

    /// Create a merge error for the given destination table.
    pub fn merge(table: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::MergeTransaction {
            table: table.into(),
            message: msg.into(),
        }
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
}
