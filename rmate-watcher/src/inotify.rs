//! inotify backend (Linux).
//!
//! One non-blocking, close-on-exec inotify instance per watch. Reads are
//! polled: an empty queue sleeps [`POLL_INTERVAL`](crate::POLL_INTERVAL)
//! so the owner's stop flag is observed promptly.

use std::ffi::CString;
use std::io;
use std::mem;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::error::WatcherError;

/// Content-modifying events we care about.
const EVENT_MASK: u32 = libc::IN_MODIFY
    | libc::IN_ATTRIB
    | libc::IN_CLOSE_WRITE
    | libc::IN_MOVED_FROM
    | libc::IN_MOVED_TO
    | libc::IN_CREATE
    | libc::IN_DELETE;

pub(crate) struct Watch {
    fd: libc::c_int,
    wd: libc::c_int,
}

impl Watch {
    pub(crate) fn register(path: &Path) -> Result<Self, WatcherError> {
        let fd = unsafe { libc::inotify_init1(libc::IN_NONBLOCK | libc::IN_CLOEXEC) };
        if fd < 0 {
            return Err(WatcherError::Init(io::Error::last_os_error()));
        }

        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
            WatcherError::Register {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::InvalidInput),
            }
        })?;
        let wd = unsafe { libc::inotify_add_watch(fd, c_path.as_ptr(), EVENT_MASK) };
        if wd < 0 {
            let source = io::Error::last_os_error();
            unsafe { libc::close(fd) };
            return Err(WatcherError::Register {
                path: path.to_path_buf(),
                source,
            });
        }

        Ok(Self { fd, wd })
    }

    /// Poll once. Returns `true` when at least one relevant event arrived;
    /// sleeps `interval` when the queue was empty.
    pub(crate) fn wait(&mut self, interval: Duration) -> io::Result<bool> {
        let events = self.drain()?;
        if events == 0 {
            thread::sleep(interval);
            return Ok(false);
        }
        Ok(true)
    }

    /// Consume every queued event without blocking; returns how many
    /// matched the watch mask.
    pub(crate) fn drain(&mut self) -> io::Result<usize> {
        let mut relevant = 0;
        loop {
            // u64 array keeps the buffer aligned for inotify_event.
            let mut buf = [0u64; 512];
            let n = unsafe {
                libc::read(
                    self.fd,
                    buf.as_mut_ptr().cast::<libc::c_void>(),
                    mem::size_of_val(&buf),
                )
            };
            if n < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::WouldBlock {
                    return Ok(relevant);
                }
                return Err(err);
            }
            if n == 0 {
                return Ok(relevant);
            }
            relevant += count_relevant(bytes_of(&buf, n as usize));
        }
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        unsafe {
            libc::inotify_rm_watch(self.fd, self.wd);
            libc::close(self.fd);
        }
    }
}

fn bytes_of(buf: &[u64; 512], len: usize) -> &[u8] {
    // SAFETY: reinterpreting the filled prefix of an initialized buffer.
    unsafe { std::slice::from_raw_parts(buf.as_ptr().cast::<u8>(), len) }
}

/// Walk a raw inotify event buffer, counting events whose mask intersects
/// [`EVENT_MASK`].
fn count_relevant(mut bytes: &[u8]) -> usize {
    const HEADER: usize = mem::size_of::<libc::inotify_event>();
    let mut relevant = 0;
    while bytes.len() >= HEADER {
        // SAFETY: the kernel guarantees whole events; read unaligned to be
        // safe against arbitrary offsets after variable-length names.
        let event: libc::inotify_event =
            unsafe { std::ptr::read_unaligned(bytes.as_ptr().cast()) };
        if event.mask & EVENT_MASK != 0 {
            relevant += 1;
        }
        let advance = HEADER + event.len as usize;
        if advance > bytes.len() {
            break;
        }
        bytes = &bytes[advance..];
    }
    relevant
}
