//! Mirror-file store for the rmate launcher.
//!
//! Every remote file a client opens is materialized as a temp file under a
//! per-host directory inside the base directory:
//!
//! ```text
//! <base_dir>/
//!   _recovered/<YYYYMMDD-HHMMSS>/<old-host-dir>/...   quarantined on startup
//!   <sanitized-host>/<mirrored/remote/path/file>      live temp files
//! ```
//!
//! - [`mirror`] — path derivation and host sanitization
//! - [`store`] — base-dir init, exclusive create, full read, upward prune
//! - [`quarantine`] — startup recovery of leftover host directories
//! - [`error`] — [`StoreError`]

pub mod error;
pub mod mirror;
pub mod quarantine;
pub mod store;

pub use error::StoreError;
pub use mirror::{mirror_path, sanitize_host};
pub use quarantine::{quarantine_leftovers, RECOVERED_DIR};
pub use store::{create_mirror, init_base, prune, read_all, write_exclusive};
