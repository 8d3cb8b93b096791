//! Error types for rmate-store.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from mirror-file operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure, with the path it happened at.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The mirror file already exists — another session owns this path.
    #[error("mirror file already exists: {path}")]
    AlreadyExists { path: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
