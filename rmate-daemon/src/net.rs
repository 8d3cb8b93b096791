//! Listener bootstrap and the signal-interruptible accept.
//!
//! `std`'s `accept` retries on `EINTR`, which would swallow the shutdown
//! signal; [`Listener::accept_interruptible`] calls `accept(2)` directly so
//! `EINTR` surfaces as `io::ErrorKind::Interrupted` for the accept loop to
//! act on.

use std::fs;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::os::fd::{AsRawFd, FromRawFd};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::Path;
use std::ptr;

use crate::config::Bind;
use crate::error::DaemonError;

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum Listener {
    Unix(UnixListener),
    Tcp(TcpListener),
}

impl Listener {
    /// Bind per the configuration: Unix sockets replace a stale socket
    /// file (refusing when a live daemon answers) and are chmod'd `0600`;
    /// TCP binds the configured address.
    pub fn bind(bind: &Bind) -> Result<Self, DaemonError> {
        match bind {
            Bind::Unix { path } => {
                prepare_socket_path(path)?;
                let listener = UnixListener::bind(path).map_err(|source| DaemonError::Bind {
                    addr: path.display().to_string(),
                    source,
                })?;
                restrict_socket_permissions(path)?;
                Ok(Self::Unix(listener))
            }
            Bind::Tcp { ip, port } => {
                let listener =
                    TcpListener::bind((*ip, *port)).map_err(|source| DaemonError::Bind {
                        addr: format!("{ip}:{port}"),
                        source,
                    })?;
                Ok(Self::Tcp(listener))
            }
        }
    }

    /// `accept(2)` on the raw descriptor. `EINTR` maps to
    /// `ErrorKind::Interrupted` so the caller can consult the shutdown
    /// flag.
    pub fn accept_interruptible(&self) -> io::Result<ClientStream> {
        let fd = match self {
            Self::Unix(listener) => listener.as_raw_fd(),
            Self::Tcp(listener) => listener.as_raw_fd(),
        };

        let client = unsafe { libc::accept(fd, ptr::null_mut(), ptr::null_mut()) };
        if client < 0 {
            return Err(io::Error::last_os_error());
        }

        // SAFETY: accept returned a fresh, owned descriptor.
        Ok(match self {
            Self::Unix(_) => ClientStream::Unix(unsafe { UnixStream::from_raw_fd(client) }),
            Self::Tcp(_) => ClientStream::Tcp(unsafe { TcpStream::from_raw_fd(client) }),
        })
    }

    /// Human-readable bind address for startup logging.
    pub fn local_display(&self) -> String {
        match self {
            Self::Unix(listener) => listener
                .local_addr()
                .ok()
                .and_then(|addr| addr.as_pathname().map(|p| p.display().to_string()))
                .unwrap_or_else(|| "<unix socket>".to_owned()),
            Self::Tcp(listener) => listener
                .local_addr()
                .map(|addr| addr.to_string())
                .unwrap_or_else(|_| "<tcp socket>".to_owned()),
        }
    }
}

/// Make way for the Unix listener: create the parent directory, probe an
/// existing socket file, and remove it when nothing answers.
fn prepare_socket_path(path: &Path) -> Result<(), DaemonError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| crate::error::io_err(parent, e))?;
        }
    }

    if !path.exists() {
        return Ok(());
    }

    if UnixStream::connect(path).is_ok() {
        return Err(DaemonError::AlreadyRunning {
            socket: path.to_path_buf(),
        });
    }

    tracing::warn!(socket = %path.display(), "removing stale socket file before bind");
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(crate::error::io_err(path, err)),
    }
}

#[cfg(unix)]
fn restrict_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|e| crate::error::io_err(path, e))
}

// ---------------------------------------------------------------------------
// ClientStream
// ---------------------------------------------------------------------------

/// One accepted client connection, Unix or TCP.
pub enum ClientStream {
    Unix(UnixStream),
    Tcp(TcpStream),
}

impl ClientStream {
    /// Second handle to the same socket, for the reader/writer split.
    pub fn try_clone(&self) -> io::Result<Self> {
        Ok(match self {
            Self::Unix(stream) => Self::Unix(stream.try_clone()?),
            Self::Tcp(stream) => Self::Tcp(stream.try_clone()?),
        })
    }
}

impl Read for ClientStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Unix(stream) => stream.read(buf),
            Self::Tcp(stream) => stream.read(buf),
        }
    }
}

impl Write for ClientStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Unix(stream) => stream.write(buf),
            Self::Tcp(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Unix(stream) => stream.flush(),
            Self::Tcp(stream) => stream.flush(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
