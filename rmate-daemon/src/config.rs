//! Daemon configuration, built once from the environment.
//!
//! ```text
//! RMATE_EDITOR    required; shell command that blocks until editing ends
//! RMATE_SOCKET    Unix socket path       (default $HOME/.rmate_launcher/rmate.sock)
//! RMATE_IP        TCP bind address       (default 127.0.0.1)
//! RMATE_PORT      TCP bind port          (default 52698)
//! RMATE_BASE_DIR  mirror-file directory  (default $HOME/.rmate_launcher)
//! ```
//!
//! Unix mode is selected when `RMATE_SOCKET` is set or nothing TCP-specific
//! is configured; TCP mode when `RMATE_IP` or `RMATE_PORT` is set without
//! `RMATE_SOCKET`.

use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_PORT: u16 = 52698;
pub const DEFAULT_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
pub const BASE_DIR_NAME: &str = ".rmate_launcher";
pub const SOCKET_FILE: &str = "rmate.sock";

/// Where the daemon listens for client connections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bind {
    Unix { path: PathBuf },
    Tcp { ip: IpAddr, port: u16 },
}

/// Immutable per-process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shell command invoked per file; must block until editing completes.
    pub editor_command: String,
    pub bind: Bind,
    /// Absolute directory mirror files live under.
    pub base_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("RMATE_EDITOR must be set to a blocking editor command")]
    MissingEditor,

    #[error("cannot determine home directory; set $HOME (or RMATE_BASE_DIR and RMATE_SOCKET)")]
    MissingHome,
}

impl Config {
    /// Build the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable lookup. Tests use
    /// this to avoid touching the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let editor_command = lookup("RMATE_EDITOR").ok_or(ConfigError::MissingEditor)?;

        // Home is only required when a default path needs it.
        let home = || {
            lookup("HOME")
                .map(PathBuf::from)
                .or_else(dirs::home_dir)
                .ok_or(ConfigError::MissingHome)
        };

        let socket = lookup("RMATE_SOCKET");
        let ip = lookup("RMATE_IP");
        let port = lookup("RMATE_PORT");

        let bind = if socket.is_some() || (ip.is_none() && port.is_none()) {
            let path = match socket {
                Some(path) => PathBuf::from(path),
                None => home()?.join(BASE_DIR_NAME).join(SOCKET_FILE),
            };
            Bind::Unix { path }
        } else {
            Bind::Tcp {
                ip: parse_or_default(ip, "RMATE_IP", DEFAULT_IP),
                port: parse_or_default(port, "RMATE_PORT", DEFAULT_PORT),
            }
        };

        let base_dir = match lookup("RMATE_BASE_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => home()?.join(BASE_DIR_NAME),
        };

        Ok(Self {
            editor_command,
            bind,
            base_dir,
        })
    }
}

/// Parse an optional variable, warning and falling back on garbage.
fn parse_or_default<T>(value: Option<String>, name: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    let Some(raw) = value else {
        return default;
    };
    match raw.parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            tracing::warn!(%name, value = %raw, fallback = %default, "unparseable value; using default");
            default
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
