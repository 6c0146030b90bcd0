//! Drives the walker straight into the engine without a real transport, to
//! exercise the protocol codec, walker, and snapshot engine together the way
//! a real session would, minus the child process.

use std::fs;
use std::io::{Cursor, Read};

use camino::Utf8Path;
use engine::{commit, dispatch, start_session, Outcome, SessionContext};
use protocol::{Record, Reply};
use walk::{backup_tree, Peer, SessionStats, WalkOptions};

struct LoopbackPeer<'a> {
    ctx: &'a mut SessionContext,
    last_record: Option<Record>,
    pending_body: Option<u64>,
    body_buf: Vec<u8>,
}

impl Peer for LoopbackPeer<'_> {
    fn send_raw(&mut self, bytes: &[u8]) -> Result<(), walk::WalkError> {
        if self.pending_body.is_some() {
            self.body_buf.extend_from_slice(bytes);
            return Ok(());
        }
        let (record, _) = Record::decode(bytes).map_err(walk::WalkError::Protocol)?;
        if let Record::Body { size } = &record {
            self.pending_body = Some(*size);
            self.body_buf.clear();
        }
        self.last_record = Some(record);
        Ok(())
    }

    fn recv_reply(&mut self) -> Result<Reply, walk::WalkError> {
        let record = self.last_record.take().expect("send_raw must precede recv_reply");
        self.pending_body = None;
        let mut body: Box<dyn Read> = if matches!(record, Record::Body { .. }) {
            Box::new(Cursor::new(std::mem::take(&mut self.body_buf)))
        } else {
            Box::new(std::io::empty())
        };
        match dispatch(self.ctx, record, body.as_mut()) {
            Ok(Outcome::Reply(reply)) => Ok(reply),
            Ok(Outcome::ThankYou) => Ok(Reply::Ok(None)),
            Err(e) => Err(walk::WalkError::Transport(std::io::Error::other(e.to_string()))),
        }
    }
}

#[test]
fn backup_tree_feeds_the_engine_end_to_end() {
    let src = tempfile::tempdir().unwrap();
    let src_root = Utf8Path::from_path(src.path()).unwrap().to_owned();
    fs::write(src_root.join("a.txt").as_std_path(), b"hello").unwrap();

    let backup_root = tempfile::tempdir().unwrap();
    let backup_root = Utf8Path::from_path(backup_root.path()).unwrap().to_owned();
    let mut ctx = start_session(&backup_root).unwrap();
    let dest_dir = ctx.dest_dir.clone();

    {
        let mut peer = LoopbackPeer { ctx: &mut ctx, last_record: None, pending_body: None, body_buf: Vec::new() };
        // Default root ("/"), matching an ordinary client invocation where
        // SRC_DIR is reported relative to the filesystem root.
        let options = WalkOptions { root: Utf8Path::new("/").to_owned(), disable_skipped_socket_warning: false };
        let mut stats = SessionStats::new();
        backup_tree(&src_root, &options, &mut peer, &mut stats).unwrap();
        assert_eq!(stats.files_changed, 1);
    }

    let mut empty = std::io::empty();
    match dispatch(&mut ctx, Record::ThankYou, &mut empty).unwrap() {
        Outcome::ThankYou => {}
        _ => panic!("THANK_YOU must end the session"),
    }

    let relative = Utf8Path::new(src_root.as_str().trim_start_matches('/'));
    let written = fs::read(dest_dir.join(relative).join("a.txt").as_std_path()).unwrap();
    assert_eq!(written, b"hello");

    let committed = commit(&ctx).unwrap();
    assert!(committed.as_std_path().is_dir());
    assert!(!dest_dir.as_std_path().exists());
}
