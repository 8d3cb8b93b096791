//! rmate_launcher — local daemon for the rmate remote-editing protocol.
//!
//! # Usage
//!
//! ```text
//! rmate_launcher [--help|-h]
//! ```
//!
//! All configuration comes from the environment; see the `--help` output.

use anyhow::{Context, Result};
use clap::Parser;

use rmate_daemon::{runtime, Config};

#[derive(Parser, Debug)]
#[command(
    name = "rmate_launcher",
    version,
    about = "Local launcher daemon for the rmate remote-editing protocol",
    long_about = "Local launcher daemon for the rmate remote-editing protocol.\n\
        \n\
        Listens for rmate clients (usually reverse-tunneled over SSH), mirrors\n\
        each announced file into a local temp file, opens it in your editor,\n\
        streams modifications back, and closes the file when the editor exits.\n\
        \n\
        Environment:\n\
        \x20 RMATE_EDITOR    required; shell command that blocks until editing ends\n\
        \x20 RMATE_SOCKET    Unix socket path (default $HOME/.rmate_launcher/rmate.sock)\n\
        \x20 RMATE_IP        TCP bind address (default 127.0.0.1)\n\
        \x20 RMATE_PORT      TCP bind port (default 52698)\n\
        \x20 RMATE_BASE_DIR  mirror-file directory (default $HOME/.rmate_launcher)"
)]
struct Cli {}

fn main() -> Result<()> {
    let _cli = Cli::parse();

    let config = Config::from_env().context("invalid configuration")?;
    runtime::start_blocking(config).context("daemon exited with error")?;
    Ok(())
}
