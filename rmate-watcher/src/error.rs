//! Error types for rmate-watcher.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while setting up a watch. Runtime errors inside the watch
/// thread are logged, never propagated.
#[derive(Debug, Error)]
pub enum WatcherError {
    /// Could not create the OS notification instance (inotify fd / kqueue).
    #[error("could not initialize file notification: {0}")]
    Init(#[source] std::io::Error),

    /// Could not register the target file with the notification instance.
    #[error("could not watch {path}: {source}")]
    Register {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The watch thread itself could not be spawned.
    #[error("could not spawn watch thread: {0}")]
    Thread(#[source] std::io::Error),
}
