//! Filesystem operations on mirror files.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{io_err, StoreError};
use crate::mirror::mirror_path;

/// Create the base directory; best-effort `0700` so mirror contents are
/// private to the user.
pub fn init_base(base_dir: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(base_dir).map_err(|e| io_err(base_dir, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(err) = fs::set_permissions(base_dir, fs::Permissions::from_mode(0o700)) {
            tracing::warn!(
                path = %base_dir.display(),
                error = %err,
                "could not restrict base directory permissions",
            );
        }
    }

    Ok(())
}

/// Derive the mirror path and create its parent directories. The file
/// itself is not created — that is [`write_exclusive`]'s job.
pub fn create_mirror(
    base_dir: &Path,
    host: &str,
    remote_path: &str,
) -> Result<PathBuf, StoreError> {
    let path = mirror_path(base_dir, host, remote_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    Ok(path)
}

/// Create `path` exclusively and write `bytes`.
///
/// `O_CREAT|O_EXCL` semantics make this the collision signal between
/// concurrent opens of the same remote file: the loser gets
/// [`StoreError::AlreadyExists`].
pub fn write_exclusive(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|err| {
            if err.kind() == ErrorKind::AlreadyExists {
                StoreError::AlreadyExists {
                    path: path.to_path_buf(),
                }
            } else {
                io_err(path, err)
            }
        })?;
    file.write_all(bytes).map_err(|e| io_err(path, e))?;
    Ok(())
}

/// Read the whole file: stat the size, then read until that many bytes (or
/// EOF) so short reads never truncate a payload.
pub fn read_all(path: &Path) -> Result<Vec<u8>, StoreError> {
    let mut file = fs::File::open(path).map_err(|e| io_err(path, e))?;
    let size = file.metadata().map_err(|e| io_err(path, e))?.len() as usize;

    let mut buf = vec![0u8; size];
    let mut filled = 0;
    while filled < size {
        let n = file
            .read(&mut buf[filled..])
            .map_err(|e| io_err(path, e))?;
        if n == 0 {
            // File shrank under us; return what exists now.
            buf.truncate(filled);
            break;
        }
        filled += n;
    }
    Ok(buf)
}

/// Delete `temp_path`, then remove empty ancestor directories upward until
/// the first non-empty one or `base_dir` itself.
///
/// Refuses (logs and returns) when `temp_path` is not lexically under
/// `base_dir`.
pub fn prune(base_dir: &Path, temp_path: &Path) -> Result<(), StoreError> {
    if !temp_path.starts_with(base_dir) || temp_path == base_dir {
        tracing::warn!(
            path = %temp_path.display(),
            base = %base_dir.display(),
            "refusing to prune path outside the base directory",
        );
        return Ok(());
    }

    match fs::remove_file(temp_path) {
        Ok(()) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(err) => return Err(io_err(temp_path, err)),
    }

    let mut current = temp_path.parent();
    while let Some(dir) = current {
        if dir == base_dir || !dir.starts_with(base_dir) {
            break;
        }
        if !is_empty_dir(dir)? {
            break;
        }
        match fs::remove_dir(dir) {
            Ok(()) => {}
            // Lost a race with a concurrent create; the dir is in use.
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(_) => break,
        }
        current = dir.parent();
    }

    Ok(())
}

fn is_empty_dir(dir: &Path) -> Result<bool, StoreError> {
    let mut entries = fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    Ok(entries.next().is_none())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
