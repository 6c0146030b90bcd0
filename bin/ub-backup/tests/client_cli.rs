//! Runs the real `ub-backup` client against the real `ubackuper` server,
//! connected by a genuine child process pipe rather than an in-process
//! fake peer.

use std::fs;

use assert_cmd::Command;
use predicates::str::contains;

#[test]
fn local_backup_round_trips_a_small_tree() {
    let src = tempfile::tempdir().unwrap();
    fs::write(src.path().join("a.txt"), b"hello").unwrap();

    let backup_dir = tempfile::tempdir().unwrap();
    let ubackuper_path = assert_cmd::cargo::cargo_bin("ubackuper");

    let mut cmd = Command::cargo_bin("ub-backup").unwrap();
    cmd.arg("--local")
        .arg("--print-statistics")
        .arg("--ubts-path")
        .arg(&ubackuper_path)
        .arg(src.path())
        .arg(backup_dir.path());

    cmd.assert().success().stdout(contains("files seen:")).stdout(contains("snapshot:"));

    let relative = src.path().strip_prefix("/").unwrap();
    let snapshot = fs::read_dir(backup_dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| !p.file_name().unwrap().to_string_lossy().starts_with('('))
        .expect("the client's REMOVE_OLD/THANK_YOU sequence must leave one committed snapshot");
    let written = fs::read(snapshot.join(relative).join("a.txt")).unwrap();
    assert_eq!(written, b"hello");
}
