//! Blocking editor subprocess.

use std::path::Path;
use std::process::{Command, ExitStatus};
use std::time::{Duration, Instant};

use thiserror::Error;

/// A successful exit faster than this usually means the editor command
/// forgot a `--wait`-style flag and returned before editing happened.
pub const FAST_EXIT_THRESHOLD: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("could not launch editor shell: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Run the configured editor on `path` and wait for it to exit.
///
/// The command line is handed to `/bin/sh -c` with the file path appended
/// as a quoted argument; stdin/stdout/stderr are inherited.
pub fn run_blocking(editor_command: &str, path: &Path) -> Result<ExitStatus, EditorError> {
    let command_line = format!("{editor_command} \"{}\"", path.display());
    tracing::debug!(command = %command_line, "launching editor");

    let started = Instant::now();
    let status = Command::new("/bin/sh")
        .arg("-c")
        .arg(&command_line)
        .status()
        .map_err(EditorError::Spawn)?;
    let elapsed = started.elapsed();

    if !status.success() {
        tracing::warn!(
            %status,
            path = %path.display(),
            "editor exited with failure status",
        );
    } else if elapsed < FAST_EXIT_THRESHOLD {
        tracing::warn!(
            elapsed_ms = elapsed.as_millis() as u64,
            path = %path.display(),
            "editor returned almost immediately; does it wait for the file to close?",
        );
    }

    Ok(status)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
