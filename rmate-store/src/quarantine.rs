//! Startup recovery of leftover mirror directories.
//!
//! An unclean shutdown can leave host directories with user edits behind.
//! Instead of deleting them, startup moves every top-level directory into
//! `_recovered/<YYYYMMDD-HHMMSS>/` so nothing is lost.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::Local;

use crate::error::{io_err, StoreError};

/// Directory quarantined leftovers are moved under; never itself recovered.
pub const RECOVERED_DIR: &str = "_recovered";

/// Move every top-level directory of `base_dir` (except [`RECOVERED_DIR`])
/// into `base_dir/_recovered/<timestamp>/<orig_name>`.
///
/// The timestamp directory is created once per call. Failures on
/// individual entries are logged and skipped. Non-directory entries (the
/// listener socket, stray files) are left in place.
pub fn quarantine_leftovers(base_dir: &Path) -> Result<(), StoreError> {
    let entries = match fs::read_dir(base_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(io_err(base_dir, err)),
    };

    let mut leftovers = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(base_dir, e))?;
        let path = entry.path();
        if !path.is_dir() || entry.file_name() == RECOVERED_DIR {
            continue;
        }
        leftovers.push(path);
    }

    if leftovers.is_empty() {
        return Ok(());
    }

    let stamp = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let dest_root = base_dir.join(RECOVERED_DIR).join(&stamp);
    fs::create_dir_all(&dest_root).map_err(|e| io_err(&dest_root, e))?;

    for path in leftovers {
        let Some(name) = path.file_name() else {
            continue;
        };
        let dest = dest_root.join(name);
        match fs::rename(&path, &dest) {
            Ok(()) => tracing::info!(
                from = %path.display(),
                to = %dest.display(),
                "quarantined leftover mirror directory",
            ),
            Err(err) => tracing::warn!(
                path = %path.display(),
                error = %err,
                "could not quarantine leftover directory; skipping",
            ),
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
