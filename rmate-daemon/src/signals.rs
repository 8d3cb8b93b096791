//! Process-wide shutdown flag, driven by SIGINT/SIGTERM.
//!
//! The handler performs a single atomic store; all shutdown logic runs on
//! the accept thread. Handlers are installed without `SA_RESTART` so a
//! blocking `accept(2)` is interrupted and surfaces `EINTR`.

use std::io;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Whether a shutdown signal has been observed.
pub fn shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::SeqCst)
}

/// Request shutdown from inside the process (tests, future admin paths).
pub fn request_shutdown() {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

extern "C" fn handle_signal(_signal: libc::c_int) {
    SHUTDOWN.store(true, Ordering::SeqCst);
}

/// Install the SIGINT and SIGTERM handlers.
pub fn install() -> io::Result<()> {
    unsafe {
        let mut action: libc::sigaction = mem::zeroed();
        let handler: extern "C" fn(libc::c_int) = handle_signal;
        action.sa_sigaction = handler as usize;
        libc::sigemptyset(&mut action.sa_mask);
        // No SA_RESTART: accept(2) must return EINTR.
        action.sa_flags = 0;

        for signal in [libc::SIGINT, libc::SIGTERM] {
            if libc::sigaction(signal, &action, ptr::null_mut()) != 0 {
                return Err(io::Error::last_os_error());
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
