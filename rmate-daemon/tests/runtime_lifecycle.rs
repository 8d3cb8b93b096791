//! Daemon lifecycle: bind, greet, quarantine on startup, cooperative
//! shutdown with the socket file removed.

use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use rmate_daemon::config::{Bind, Config};
use rmate_daemon::{runtime, signals};
use tempfile::TempDir;

fn wait_for_socket(path: &Path) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !path.exists() {
        assert!(Instant::now() < deadline, "daemon never bound its socket");
        thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn daemon_greets_quarantines_and_shuts_down() {
    let tmp = TempDir::new().expect("tempdir");
    let base_dir = tmp.path().join("base");
    let socket = base_dir.join("rmate.sock");

    // Leftover host directory from a "previous run".
    fs::create_dir_all(base_dir.join("stale-host")).expect("fixture");
    fs::write(base_dir.join("stale-host/f.txt"), b"old edits").expect("fixture");

    let config = Config {
        editor_command: "true".to_owned(),
        bind: Bind::Unix {
            path: socket.clone(),
        },
        base_dir: base_dir.clone(),
    };
    let daemon = thread::spawn(move || runtime::start_blocking(config));

    wait_for_socket(&socket);

    // Quarantine ran before the listener came up.
    assert!(!base_dir.join("stale-host").exists());
    let batches: Vec<_> = fs::read_dir(base_dir.join("_recovered"))
        .expect("read _recovered")
        .map(|e| e.expect("entry").path())
        .collect();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        fs::read(batches[0].join("stale-host/f.txt")).expect("recovered file"),
        b"old edits"
    );

    // A client gets the greeting and a clean end-of-session.
    let mut client = UnixStream::connect(&socket).expect("connect");
    client.write_all(b".\n").expect("send terminator");
    let mut reader = BufReader::new(client);
    let mut greeting = String::new();
    reader.read_line(&mut greeting).expect("read greeting");
    assert!(
        greeting.starts_with("RMate Launcher "),
        "unexpected greeting: {greeting:?}"
    );

    // Cooperative shutdown: set the flag, then poke the accept loop. The
    // poke connection drops immediately so its session sees EOF.
    signals::request_shutdown();
    let _ = UnixStream::connect(&socket);

    daemon
        .join()
        .expect("daemon thread")
        .expect("clean daemon exit");
    assert!(!socket.exists(), "socket file removed on shutdown");
}
