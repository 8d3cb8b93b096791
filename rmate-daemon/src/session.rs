//! Per-connection session orchestration.
//!
//! One session thread per accepted connection. The session writes the
//! greeting, then reads `open` commands in wire order. Each successful open
//! owns one mirror file, at most one watcher, and one editor thread:
//!
//! ```text
//! open ─► create mirror ─► write_exclusive ─► [watcher] ─► editor thread
//!                                                              │ editor exits
//!                                                              │ watcher.stop()   (joined)
//!                                                              │ write_close
//!                                                              ▼ prune
//! ```
//!
//! The client socket is written from watcher callbacks and editor threads
//! alike; a per-connection mutex serializes every frame. Because the
//! watcher is joined before `close` is written, no `save` for a token can
//! follow its `close`.

use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use rmate_protocol::{write_close, write_greeting, write_save, CommandReader, OpenRequest, Token};
use rmate_store as store;
use rmate_watcher::FileWatcher;

use crate::config::Config;
use crate::editor;
use crate::net::ClientStream;

type SharedWriter = Arc<Mutex<ClientStream>>;

/// Run one connection to completion. Never panics the caller; all errors
/// end in cleanup.
pub fn run(stream: ClientStream, config: Arc<Config>) {
    tracing::info!("client connected");
    match serve(stream, config) {
        Ok(()) => tracing::info!("client session finished"),
        Err(err) => tracing::error!(error = %err, "client session aborted"),
    }
}

fn serve(stream: ClientStream, config: Arc<Config>) -> Result<(), std::io::Error> {
    let writer: SharedWriter = Arc::new(Mutex::new(stream.try_clone()?));
    write_greeting(&mut *lock(&writer), env!("CARGO_PKG_VERSION"))?;

    let mut reader = CommandReader::new(BufReader::new(stream));
    let mut editors: Vec<JoinHandle<()>> = Vec::new();

    loop {
        match reader.next_open() {
            Ok(Some(request)) => handle_open(request, &config, &writer, &mut editors),
            Ok(None) => break,
            Err(err) => {
                // Protocol errors end parsing; in-flight editors still run
                // to completion below.
                tracing::warn!(error = %err, "command stream ended abnormally");
                break;
            }
        }
    }

    // Drain: the socket stays open until every editor has exited, its
    // close frame is written, and its mirror file is pruned.
    for handle in editors {
        if handle.join().is_err() {
            tracing::error!("editor thread panicked");
        }
    }
    Ok(())
}

/// Handle one `open`. Failures are local: the client gets a `close` for
/// the token and the session keeps serving.
fn handle_open(
    request: OpenRequest,
    config: &Arc<Config>,
    writer: &SharedWriter,
    editors: &mut Vec<JoinHandle<()>>,
) {
    let token = request.token.clone();
    tracing::info!(
        token = %token,
        display_name = %request.display_name,
        real_path = %request.real_path,
        data_on_save = request.data_on_save,
        "open request",
    );
    if request.selection.is_some() || request.file_type.is_some() || request.re_activate {
        tracing::debug!(
            selection = request.selection.as_deref(),
            file_type = request.file_type.as_deref(),
            re_activate = request.re_activate,
            "open metadata",
        );
    }

    let temp_path =
        match store::create_mirror(&config.base_dir, request.host(), &request.real_path) {
            Ok(path) => path,
            Err(err) => {
                tracing::error!(token = %token, error = %err, "could not derive mirror path");
                send_close(writer, &token);
                return;
            }
        };

    match store::write_exclusive(&temp_path, request.data.as_deref().unwrap_or_default()) {
        Ok(()) => {}
        Err(store::StoreError::AlreadyExists { .. }) => {
            tracing::info!(
                token = %token,
                path = %temp_path.display(),
                "file already being edited; rejecting duplicate open",
            );
            send_close(writer, &token);
            return;
        }
        Err(err) => {
            tracing::error!(token = %token, error = %err, "could not create mirror file");
            send_close(writer, &token);
            return;
        }
    }

    // The watcher must be running before the editor starts so no early
    // save is missed.
    let watcher = if request.data_on_save {
        match spawn_watcher(&temp_path, &token, writer) {
            Ok(watcher) => Some(watcher),
            Err(err) => {
                tracing::error!(token = %token, error = %err, "could not watch mirror file; abandoning open");
                send_close(writer, &token);
                prune_logged(&config.base_dir, &temp_path);
                return;
            }
        }
    } else {
        None
    };

    let thread_config = Arc::clone(config);
    let thread_writer = Arc::clone(writer);
    let spawned = thread::Builder::new()
        .name(format!("rmate-edit-{token}"))
        .spawn(move || edit_and_close(thread_config, thread_writer, token, temp_path, watcher));

    match spawned {
        Ok(handle) => editors.push(handle),
        Err(err) => {
            // The closure (and with it the watcher) is gone; unwind like a
            // watcher failure. `token`/`temp_path` moved into it, so the
            // request is rederived for cleanup.
            tracing::error!(error = %err, "could not spawn editor thread");
            let token = request.token.clone();
            let temp_path = store::mirror_path(&config.base_dir, request.host(), &request.real_path);
            send_close(writer, &token);
            prune_logged(&config.base_dir, &temp_path);
        }
    }
}

/// Editor thread body: block on the editor, stop the watcher, emit
/// `close`, prune the mirror file.
fn edit_and_close(
    config: Arc<Config>,
    writer: SharedWriter,
    token: Token,
    temp_path: PathBuf,
    mut watcher: Option<FileWatcher>,
) {
    match editor::run_blocking(&config.editor_command, &temp_path) {
        Ok(_status) => {}
        Err(err) => {
            // The client must still see a close; cleanup continues below.
            tracing::error!(token = %token, error = %err, "editor launch failed");
        }
    }

    // Join the watcher before close: its queued saves flush now, and none
    // can be written afterwards.
    if let Some(watcher) = watcher.as_mut() {
        watcher.stop();
    }

    send_close(&writer, &token);
    prune_logged(&config.base_dir, &temp_path);
    tracing::info!(token = %token, "file session finished");
}

fn spawn_watcher(
    temp_path: &Path,
    token: &Token,
    writer: &SharedWriter,
) -> Result<FileWatcher, rmate_watcher::WatcherError> {
    let callback_writer = Arc::clone(writer);
    let callback_token = token.clone();
    FileWatcher::spawn(temp_path, move |path: &Path| {
        // Re-read on every event: events are not coalesced, and a fresh
        // read makes repeated callbacks idempotent. Errors leave the
        // session live.
        let contents = match store::read_all(path) {
            Ok(contents) => contents,
            Err(err) => {
                tracing::warn!(
                    token = %callback_token,
                    error = %err,
                    "could not read modified mirror file",
                );
                return;
            }
        };
        let mut writer = lock(&callback_writer);
        match write_save(&mut *writer, &callback_token, &contents) {
            Ok(()) => tracing::debug!(
                token = %callback_token,
                bytes = contents.len(),
                "save frame sent",
            ),
            Err(err) => tracing::warn!(
                token = %callback_token,
                error = %err,
                "could not write save frame",
            ),
        }
    })
}

fn send_close(writer: &SharedWriter, token: &Token) {
    if let Err(err) = write_close(&mut *lock(writer), token) {
        tracing::warn!(token = %token, error = %err, "could not write close frame");
    }
}

fn prune_logged(base_dir: &Path, temp_path: &Path) {
    if let Err(err) = store::prune(base_dir, temp_path) {
        tracing::warn!(
            path = %temp_path.display(),
            error = %err,
            "could not prune mirror file",
        );
    }
}

/// A poisoned writer mutex only means another thread panicked mid-write;
/// keep going with the inner value rather than cascading the panic.
fn lock(writer: &SharedWriter) -> MutexGuard<'_, ClientStream> {
    writer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
