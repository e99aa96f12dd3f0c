//! Error taxonomy for the aggregation and backup core.
//!
//! Fatal errors live in [`Error`] and abort the current operation.
//! Per-file copy failures during a backup are deliberately NOT part of
//! this enum: they are collected in the snapshot report so one bad file
//! cannot abort the rest of the batch.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors surfaced by the core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A malformed attempt event (negative score, empty article, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A filesystem read or write failed.
    #[error("I/O failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A persisted score document exists but does not match the schema.
    /// Legacy or hand-edited files fail fast here instead of propagating
    /// corrupt aggregates.
    #[error("malformed score document {path}: {message}")]
    Schema { path: PathBuf, message: String },

    /// The version-control status query failed (not a repository, metadata
    /// inaccessible). Fatal to the backup operation, no fallback.
    #[error("change detection failed: {0}")]
    ChangeDetection(#[from] git2::Error),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn schema(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::Schema {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_display() {
        let err = Error::InvalidInput("score must be non-negative".to_string());
        assert_eq!(err.to_string(), "invalid input: score must be non-negative");
    }

    #[test]
    fn test_io_display_includes_path() {
        let err = Error::io(
            "data/speed-quiz",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("data/speed-quiz"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_schema_display_includes_path() {
        let err = Error::schema("data/民法.json", "correct exceeds answered");
        let msg = err.to_string();
        assert!(msg.contains("民法.json"));
        assert!(msg.contains("correct exceeds answered"));
    }

    #[test]
    fn test_git_error_converts_to_change_detection() {
        let err: Error = git2::Error::from_str("not a repository").into();
        assert!(matches!(err, Error::ChangeDetection(_)));
        assert!(err.to_string().contains("not a repository"));
    }
}
