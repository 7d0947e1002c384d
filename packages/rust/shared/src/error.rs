//! Error types for trackfill.
//!
//! Library crates use [`TrackfillError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Per-lookup failures are not represented here: they never abort a job and
//! are collapsed to [`crate::Outcome::NotFound`] inside the fetch executor.

use std::path::PathBuf;

/// Top-level error type for all trackfill operations that can fail a job.
#[derive(Debug, thiserror::Error)]
pub enum TrackfillError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network setup error (HTTP client construction, endpoint URLs).
    #[error("network error: {0}")]
    Network(String),

    /// Tabular file could not be read or written.
    #[error("table error: {0}")]
    Table(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No input file matched the lookup rules.
    #[error("no file starting with '{prefix}' found in {dir:?}")]
    InputNotFound { dir: PathBuf, prefix: String },

    /// File extension is not a supported tabular format.
    #[error("unsupported file format '{extension}': only csv and xlsx are supported")]
    UnsupportedFormat { extension: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TrackfillError>;

impl TrackfillError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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
