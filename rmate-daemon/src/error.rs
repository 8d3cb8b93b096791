//! Error types for rmate-daemon.

use std::path::PathBuf;

use thiserror::Error;

/// Error surface for daemon startup and the accept loop. Per-open failures
/// never reach this type; the session recovers from them by emitting a
/// `close` frame.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// I/O error with the path (or socket role) it happened at.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not bind the listener socket.
    #[error("could not bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Another daemon instance already answers on the Unix socket.
    #[error("daemon already running at {socket}")]
    AlreadyRunning { socket: PathBuf },

    /// Could not install the SIGINT/SIGTERM handlers.
    #[error("could not install signal handlers: {0}")]
    Signals(#[source] std::io::Error),

    /// Base-directory setup failed.
    #[error(transparent)]
    Store(#[from] rmate_store::StoreError),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
