use std::fs;
use std::os::unix::fs::symlink;

use camino::Utf8Path;
use filetime::{set_file_mtime, FileTime};
use protocol::{Record, Reply, Timestamp};
use walk::{backup_tree, Peer, SessionStats, WalkOptions};

/// A `Peer` that always answers `CHANGED` to `FILE` and `OK` to everything
/// else, recording every record it was asked to send.
struct RecordingPeer {
    sent: Vec<Record>,
    pending_body: bool,
}

impl RecordingPeer {
    fn new() -> Self {
        RecordingPeer { sent: Vec::new(), pending_body: false }
    }
}

impl Peer for RecordingPeer {
    fn send_raw(&mut self, bytes: &[u8]) -> Result<(), walk::WalkError> {
        if self.pending_body {
            // Raw BODY payload bytes; not a parseable record, ignore.
            self.pending_body = false;
            return Ok(());
        }
        let (record, _) = Record::decode(bytes).expect("walker must emit well-formed records");
        if matches!(record, Record::Body { .. }) {
            self.pending_body = true;
        }
        self.sent.push(record);
        Ok(())
    }

    fn recv_reply(&mut self) -> Result<Reply, walk::WalkError> {
        match self.sent.last() {
            Some(Record::File { .. }) => Ok(Reply::Changed),
            _ => Ok(Reply::Ok(None)),
        }
    }
}

#[test]
fn walking_a_small_tree_emits_ancestors_then_contents_in_order() {
    let src = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(src.path()).unwrap().to_owned();

    let project = root.join("project");
    fs::create_dir(project.as_std_path()).unwrap();
    fs::write(project.join("a.txt").as_std_path(), b"hello").unwrap();
    symlink("a.txt", project.join("link").as_std_path()).unwrap();

    let options = WalkOptions { root: root.clone(), disable_skipped_socket_warning: false };
    let mut peer = RecordingPeer::new();
    let mut stats = SessionStats::new();

    backup_tree(&project, &options, &mut peer, &mut stats).unwrap();

    let verbs: Vec<&'static str> = peer.sent.iter().map(Record::verb).collect();
    // project itself, then its two children, each preceded by nothing since
    // `project` is a direct child of `root`.
    assert_eq!(verbs.first(), Some(&"DIR"));
    assert!(verbs.contains(&"FILE"));
    assert!(verbs.contains(&"SYMLINK"));
    assert!(verbs.contains(&"BODY"), "a CHANGED file must be followed by its BODY");

    assert_eq!(stats.directories, 1);
    assert_eq!(stats.files_seen, 1);
    assert_eq!(stats.files_changed, 1);
    assert_eq!(stats.symlinks, 1);
    assert_eq!(stats.skipped, 0);
}

/// Pins a file's mtime with `filetime` so the emitted `FILE` record's
/// timestamp field is deterministic rather than "whenever the test ran".
#[test]
fn file_mtime_is_reported_exactly_as_pinned() {
    let src = tempfile::tempdir().unwrap();
    let root = Utf8Path::from_path(src.path()).unwrap().to_owned();
    let file = root.join("a.txt");
    fs::write(file.as_std_path(), b"hello").unwrap();

    let pinned = Timestamp::parse("2024-06-15T12:30:00").unwrap();
    set_file_mtime(file.as_std_path(), FileTime::from_system_time(pinned.to_system_time())).unwrap();

    let options = WalkOptions { root: root.clone(), disable_skipped_socket_warning: false };
    let mut peer = RecordingPeer::new();
    let mut stats = SessionStats::new();
    backup_tree(&root, &options, &mut peer, &mut stats).unwrap();

    let file_record = peer
        .sent
        .iter()
        .find(|r| matches!(r, Record::File { .. }))
        .expect("FILE record must have been sent");
    match file_record {
        Record::File { mtime, .. } => assert_eq!(*mtime, pinned),
        _ => unreachable!(),
    }
}
