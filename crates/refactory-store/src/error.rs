//! Error types for snapshot persistence.
//!
//! A [`StoreError`] never touches simulation state: callers log it or show
//! it to the operator and carry on with the world they already have.

use std::path::PathBuf;

/// Errors that can occur while saving or loading a snapshot.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No snapshot exists at the path.
    #[error("no snapshot at {}", path.display())]
    NotFound {
        /// Where the snapshot was expected.
        path: PathBuf,
    },

    /// Reading, writing or renaming the file failed.
    #[error("snapshot I/O error at {}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not a valid snapshot.
    #[error("corrupt snapshot at {}: {source}", path.display())]
    Corrupt {
        /// File involved.
        path: PathBuf,
        /// Decoder error.
        source: serde_json::Error,
    },

    /// The world could not be encoded.
    #[error("snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The snapshot decoded but breaks a world invariant.
    #[error("snapshot rejected: {0}")]
    Invalid(String),
}
