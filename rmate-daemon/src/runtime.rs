//! Daemon lifecycle: startup, accept loop, graceful shutdown.

use std::fs;
use std::io::ErrorKind;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rmate_store as store;

use crate::config::{Bind, Config};
use crate::error::DaemonError;
use crate::net::Listener;
use crate::session;
use crate::signals;

/// Start the daemon and block the calling thread until shutdown.
///
/// Startup order matters: the base directory is initialized and leftovers
/// are quarantined before the listener is bound, so no client can race the
/// recovery pass.
pub fn start_blocking(config: Config) -> Result<(), DaemonError> {
    init_tracing();

    store::init_base(&config.base_dir)?;
    store::quarantine_leftovers(&config.base_dir)?;

    signals::install().map_err(DaemonError::Signals)?;

    let listener = Listener::bind(&config.bind)?;
    tracing::info!(
        listen = %listener.local_display(),
        base_dir = %config.base_dir.display(),
        editor = %config.editor_command,
        "rmate launcher ready",
    );

    let config = Arc::new(config);
    let mut sessions: Vec<JoinHandle<()>> = Vec::new();

    loop {
        if signals::shutdown_requested() {
            tracing::info!("shutdown requested; leaving accept loop");
            break;
        }

        let stream = match listener.accept_interruptible() {
            Ok(stream) => stream,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::ConnectionAborted => continue,
            Err(err) => {
                tracing::error!(error = %err, "accept failed");
                continue;
            }
        };

        reap_finished(&mut sessions);

        let session_config = Arc::clone(&config);
        match thread::Builder::new()
            .name("rmate-session".to_owned())
            .spawn(move || session::run(stream, session_config))
        {
            Ok(handle) => sessions.push(handle),
            Err(err) => tracing::error!(error = %err, "could not spawn session thread"),
        }
    }

    if let Bind::Unix { path } = &config.bind {
        let _ = fs::remove_file(path);
    }

    // Sessions are never cancelled: wait for every editor to come home.
    for handle in sessions {
        if handle.join().is_err() {
            tracing::error!("session thread panicked");
        }
    }
    tracing::info!("daemon stopped");
    Ok(())
}

/// Drop handles of sessions that already finished so the list does not
/// grow for the daemon's whole lifetime.
fn reap_finished(sessions: &mut Vec<JoinHandle<()>>) {
    let mut index = 0;
    while index < sessions.len() {
        if sessions[index].is_finished() {
            let handle = sessions.swap_remove(index);
            if handle.join().is_err() {
                tracing::error!("session thread panicked");
            }
        } else {
            index += 1;
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
