//! Drives the actual compiled `ubackuper` binary over real stdin/stdout,
//! rather than calling the engine crate's APIs in-process.

use std::fs;

use assert_cmd::Command;
use predicates::str::contains;
use protocol::{Record, Timestamp};

fn ts(s: &str) -> Timestamp {
    Timestamp::parse(s).unwrap()
}

#[test]
fn one_file_session_writes_to_disk_and_exits_clean() {
    let backup_dir = tempfile::tempdir().unwrap();

    let mut input = Vec::new();
    input.extend(
        Record::Dir { path: "tmp".into(), mode: 0o755, uid: 0, gid: 0, ctime: ts("2024-01-01T00:00:00") }.encode(),
    );
    input.extend(
        Record::File {
            path: "tmp/a.txt".into(),
            mode: 0o644,
            uid: 0,
            gid: 0,
            mtime: ts("2024-01-01T00:00:00"),
            ctime: ts("2024-01-01T00:00:00"),
        }
        .encode(),
    );
    input.extend(Record::Body { size: 5 }.encode());
    input.extend(b"hello");
    input.extend(Record::ThankYou.encode());

    let mut cmd = Command::cargo_bin("ubackuper").unwrap();
    let assert = cmd.arg(backup_dir.path()).write_stdin(input).assert();

    assert.success().stdout(contains("OK").and(contains("CHANGED")));

    let snapshot = fs::read_dir(backup_dir.path())
        .unwrap()
        .map(|e| e.unwrap().path())
        .find(|p| !p.file_name().unwrap().to_string_lossy().starts_with('('))
        .expect("a committed snapshot directory must exist");
    assert_eq!(fs::read(snapshot.join("tmp").join("a.txt")).unwrap(), b"hello");
}

#[test]
fn malformed_line_replies_ng_but_still_commits() {
    let backup_dir = tempfile::tempdir().unwrap();

    let mut input = Vec::new();
    input.extend_from_slice(b"BOGUS\r\n");
    input.extend(Record::ThankYou.encode());

    let mut cmd = Command::cargo_bin("ubackuper").unwrap();
    let assert = cmd.arg(backup_dir.path()).write_stdin(input).assert();

    // A failed record reports NG but the session still ends in a committed
    // snapshot; the process exit code reflects the failure.
    assert.failure().stdout(contains("NG"));
    let committed = fs::read_dir(backup_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().into_string().unwrap())
        .filter(|n| !n.starts_with('('))
        .count();
    assert_eq!(committed, 1);
}
