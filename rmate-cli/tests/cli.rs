//! CLI surface tests for the `rmate_launcher` binary.

use std::process::Command;

use assert_cmd::prelude::*;
use predicates::str::contains;

fn launcher() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("rmate_launcher"));
    cmd.env_clear();
    cmd
}

#[test]
fn help_exits_zero_and_documents_environment() {
    launcher()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("RMATE_EDITOR"))
        .stdout(contains("RMATE_SOCKET"));
}

#[test]
fn short_help_works_too() {
    launcher().arg("-h").assert().success();
}

#[test]
fn missing_editor_fails_startup() {
    launcher()
        .env("HOME", "/tmp")
        .assert()
        .failure()
        .stderr(contains("RMATE_EDITOR"));
}

#[test]
fn unknown_flags_are_rejected() {
    launcher().arg("--bogus").assert().failure();
}
