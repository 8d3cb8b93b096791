//! kqueue backend (macOS and BSDs).
//!
//! The target file is opened read-only and registered as an
//! `EVFILT_VNODE` event with `EV_CLEAR`, so each `kevent` call reports
//! fresh activity only. Waits use a bounded timeout so the owner's stop
//! flag is observed promptly.

use std::ffi::CString;
use std::io;
use std::mem;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::ptr;
use std::time::Duration;

use crate::error::WatcherError;

/// Content-modifying vnode events we care about.
const NOTE_MASK: u32 = libc::NOTE_WRITE | libc::NOTE_EXTEND | libc::NOTE_ATTRIB;

pub(crate) struct Watch {
    kq: libc::c_int,
    file_fd: libc::c_int,
}

impl Watch {
    pub(crate) fn register(path: &Path) -> Result<Self, WatcherError> {
        let c_path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
            WatcherError::Register {
                path: path.to_path_buf(),
                source: io::Error::from(io::ErrorKind::InvalidInput),
            }
        })?;

        let file_fd = unsafe { libc::open(c_path.as_ptr(), libc::O_RDONLY) };
        if file_fd < 0 {
            return Err(WatcherError::Register {
                path: path.to_path_buf(),
                source: io::Error::last_os_error(),
            });
        }

        let kq = unsafe { libc::kqueue() };
        if kq < 0 {
            let source = io::Error::last_os_error();
            unsafe { libc::close(file_fd) };
            return Err(WatcherError::Init(source));
        }

        let change = libc::kevent {
            ident: file_fd as _,
            filter: libc::EVFILT_VNODE,
            flags: libc::EV_ADD | libc::EV_ENABLE | libc::EV_CLEAR,
            fflags: NOTE_MASK,
            data: 0,
            udata: ptr::null_mut(),
        };
        let rc = unsafe { libc::kevent(kq, &change, 1, ptr::null_mut(), 0, ptr::null()) };
        if rc < 0 {
            let source = io::Error::last_os_error();
            unsafe {
                libc::close(kq);
                libc::close(file_fd);
            }
            return Err(WatcherError::Register {
                path: path.to_path_buf(),
                source,
            });
        }

        Ok(Self { kq, file_fd })
    }

    /// Wait up to `timeout` for one event. Returns `true` when a relevant
    /// vnode event fired.
    pub(crate) fn wait(&mut self, timeout: Duration) -> io::Result<bool> {
        match self.poll(Some(timeout))? {
            Some(fflags) => Ok(fflags & NOTE_MASK != 0),
            None => Ok(false),
        }
    }

    /// Consume every pending event without blocking; returns how many
    /// matched the note mask.
    pub(crate) fn drain(&mut self) -> io::Result<usize> {
        let mut relevant = 0;
        while let Some(fflags) = self.poll(Some(Duration::ZERO))? {
            if fflags & NOTE_MASK != 0 {
                relevant += 1;
            }
        }
        Ok(relevant)
    }

    /// One `kevent` call; `Some(fflags)` when an event arrived.
    fn poll(&mut self, timeout: Option<Duration>) -> io::Result<Option<u32>> {
        let ts = timeout.map(|t| libc::timespec {
            tv_sec: t.as_secs() as libc::time_t,
            tv_nsec: t.subsec_nanos() as libc::c_long,
        });
        let ts_ptr = ts
            .as_ref()
            .map_or(ptr::null(), |ts| ts as *const libc::timespec);

        let mut event: libc::kevent = unsafe { mem::zeroed() };
        let rc = unsafe { libc::kevent(self.kq, ptr::null(), 0, &mut event, 1, ts_ptr) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(None);
            }
            return Err(err);
        }
        if rc == 0 {
            return Ok(None);
        }
        Ok(Some(event.fflags))
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.kq);
            libc::close(self.file_fd);
        }
    }
}
