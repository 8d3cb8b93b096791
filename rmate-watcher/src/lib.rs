//! Per-file modification watcher built on OS-native change notification —
//! inotify on Linux, kqueue on macOS and the BSDs.
//!
//! [`FileWatcher::spawn`] registers the file synchronously (so registration
//! errors surface to the caller) and starts one background thread that
//! invokes the callback on every reported modification. Callbacks are
//! sequential for a given watcher. [`FileWatcher::stop`] is idempotent and
//! joins the thread before returning; events the OS queued before the stop
//! request are still delivered, so a final editor write is never dropped.
//!
//! Events are not coalesced: one editor save may invoke the callback
//! several times. Callers must make their handler idempotent.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub mod error;

pub use error::WatcherError;

#[cfg(target_os = "linux")]
mod inotify;
#[cfg(target_os = "linux")]
use inotify as backend;

#[cfg(any(
    target_os = "macos",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
mod kqueue;
#[cfg(any(
    target_os = "macos",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "dragonfly"
))]
use kqueue as backend;

#[cfg(not(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "freebsd",
    target_os = "openbsd",
    target_os = "dragonfly"
)))]
compile_error!("rmate-watcher requires inotify (Linux) or kqueue (macOS/BSD)");

/// How long one backend poll may block before the stop flag is rechecked.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Handle to one running file watch.
#[derive(Debug)]
pub struct FileWatcher {
    should_stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    path: PathBuf,
}

impl FileWatcher {
    /// Watch `path`, invoking `callback` on every reported modification.
    ///
    /// The file must exist. Registration happens on the calling thread so
    /// setup failures are returned, not logged.
    pub fn spawn<F>(path: impl Into<PathBuf>, callback: F) -> Result<Self, WatcherError>
    where
        F: Fn(&Path) + Send + 'static,
    {
        let path = path.into();
        let watch = backend::Watch::register(&path)?;
        let should_stop = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&should_stop);
        let thread_path = path.clone();
        let thread = thread::Builder::new()
            .name("rmate-watch".to_owned())
            .spawn(move || watch_loop(watch, thread_path, flag, callback))
            .map_err(WatcherError::Thread)?;

        Ok(Self {
            should_stop,
            thread: Some(thread),
            path,
        })
    }

    /// Stop watching. Sets the stop flag and joins the watch thread; the
    /// backend descriptors are closed by the thread on its way out, after
    /// the final event drain. Idempotent.
    pub fn stop(&mut self) {
        self.should_stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                tracing::error!(path = %self.path.display(), "watch thread panicked");
            }
        }
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn watch_loop<F>(mut watch: backend::Watch, path: PathBuf, should_stop: Arc<AtomicBool>, callback: F)
where
    F: Fn(&Path),
{
    loop {
        if should_stop.load(Ordering::SeqCst) {
            // Deliver whatever the OS queued before the stop request.
            match watch.drain() {
                Ok(events) if events > 0 => callback(&path),
                Ok(_) => {}
                Err(err) => tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "final event drain failed",
                ),
            }
            break;
        }

        match watch.wait(POLL_INTERVAL) {
            Ok(true) => callback(&path),
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "watch loop read failed; stopping watcher",
                );
                break;
            }
        }
    }
    // `watch` drops here: descriptors close only once the loop is done
    // with them.
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn watched_file() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("watched.txt");
        fs::write(&path, b"initial").expect("fixture");
        (tmp, path)
    }

    #[test]
    fn modification_invokes_callback() {
        let (_tmp, path) = watched_file();
        let (tx, rx) = mpsc::channel();
        let mut watcher = FileWatcher::spawn(&path, move |p: &Path| {
            let _ = tx.send(p.to_path_buf());
        })
        .expect("spawn watcher");

        fs::write(&path, b"modified").expect("modify");

        let reported = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("callback within timeout");
        assert_eq!(reported, path);
        watcher.stop();
    }

    #[test]
    fn stop_is_idempotent() {
        let (_tmp, path) = watched_file();
        let mut watcher = FileWatcher::spawn(&path, |_: &Path| {}).expect("spawn watcher");
        watcher.stop();
        watcher.stop();
    }

    #[test]
    fn no_callbacks_after_stop_returns() {
        let (_tmp, path) = watched_file();
        let (tx, rx) = mpsc::channel();
        let mut watcher = FileWatcher::spawn(&path, move |_: &Path| {
            let _ = tx.send(());
        })
        .expect("spawn watcher");

        watcher.stop();
        // The sender lives in the dropped closure; a write after stop must
        // not reach it.
        fs::write(&path, b"late write").expect("modify");
        assert!(
            rx.recv_timeout(Duration::from_millis(300)).is_err(),
            "no events may be delivered after stop() returned"
        );
    }

    #[test]
    fn write_just_before_stop_is_still_delivered() {
        let (_tmp, path) = watched_file();
        let (tx, rx) = mpsc::channel();
        let mut watcher = FileWatcher::spawn(&path, move |_: &Path| {
            let _ = tx.send(());
        })
        .expect("spawn watcher");

        fs::write(&path, b"final save").expect("modify");
        watcher.stop();

        assert!(
            rx.try_recv().is_ok(),
            "events queued before stop() must be drained before it returns"
        );
    }

    #[test]
    fn missing_file_fails_registration() {
        let tmp = TempDir::new().expect("tempdir");
        let err = FileWatcher::spawn(tmp.path().join("absent"), |_: &Path| {})
            .expect_err("registration must fail");
        assert!(matches!(err, WatcherError::Register { .. }));
    }
}
