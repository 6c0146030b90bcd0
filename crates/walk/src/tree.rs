use std::fs::{self, File};
use std::io::Read;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::os::unix::io::AsFd;

use camino::{Utf8Path, Utf8PathBuf};
use protocol::{Record, Reply, Timestamp};

use crate::error::WalkError;
use crate::path::relative_to_root;
use crate::peer::Peer;
use crate::stats::SessionStats;

const READ_CHUNK: usize = 64 * 1024;

/// Options controlling one [`backup_tree`] invocation.
pub struct WalkOptions {
    /// The walker's normalized root, used to compute root-relative paths.
    pub root: Utf8PathBuf,
    /// Suppress the warning for skipped Unix-domain sockets specifically.
    pub disable_skipped_socket_warning: bool,
}

/// Walks `abs_path` (a single `SRC_DIR` argument, already normalized),
/// emitting records for its ancestors up to (but not including) `options`'s
/// configured root, then recursively for the subtree rooted at `abs_path`
/// itself.
pub fn backup_tree(
    abs_path: &Utf8Path,
    options: &WalkOptions,
    peer: &mut dyn Peer,
    stats: &mut SessionStats,
) -> Result<(), WalkError> {
    for ancestor in ancestors_between(&options.root, abs_path) {
        emit_dir(&ancestor, options, peer, stats)?;
    }
    walk_dir(abs_path, options, peer, stats)
}

/// Directories strictly between `root` and `target`, topmost (closest to
/// `root`) first. `target` itself is never included — callers emit it
/// through the ordinary recursive walk.
fn ancestors_between(root: &Utf8Path, target: &Utf8Path) -> Vec<Utf8PathBuf> {
    let Ok(relative) = relative_to_root(target, root) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut acc = root.to_owned();
    let components: Vec<&str> = relative.as_str().split('/').filter(|c| !c.is_empty()).collect();
    // Exclude the final component: that's `target` itself.
    for component in components.iter().take(components.len().saturating_sub(1)) {
        acc.push(component);
        out.push(acc.clone());
    }
    out
}

fn lstat(path: &Utf8Path) -> std::io::Result<fs::Metadata> {
    fs::symlink_metadata(path.as_std_path())
}

fn emit_dir(
    path: &Utf8Path,
    options: &WalkOptions,
    peer: &mut dyn Peer,
    stats: &mut SessionStats,
) -> Result<(), WalkError> {
    let meta = match lstat(path) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "lstat failed, skipping");
            stats.skipped += 1;
            return Ok(());
        }
    };
    let rel = relative_to_root(path, &options.root)?;
    let record = Record::Dir {
        path: rel,
        mode: meta.mode() & 0o777,
        uid: meta.uid(),
        gid: meta.gid(),
        ctime: Timestamp::from_system_time(ctime_of(&meta)),
    };
    let reply = peer.request(&record)?;
    reply.validate_for("DIR").map_err(WalkError::Protocol)?;
    if matches!(reply, Reply::Ng) {
        tracing::warn!(path = %path, "server rejected DIR");
    }
    stats.directories += 1;
    Ok(())
}

fn walk_dir(
    path: &Utf8Path,
    options: &WalkOptions,
    peer: &mut dyn Peer,
    stats: &mut SessionStats,
) -> Result<(), WalkError> {
    let meta = match lstat(path) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "lstat failed, skipping directory");
            stats.skipped += 1;
            return Ok(());
        }
    };
    let rel = relative_to_root(path, &options.root)?;
    let record = Record::Dir {
        path: rel,
        mode: meta.mode() & 0o777,
        uid: meta.uid(),
        gid: meta.gid(),
        ctime: Timestamp::from_system_time(ctime_of(&meta)),
    };
    let reply = peer.request(&record)?;
    reply.validate_for("DIR").map_err(WalkError::Protocol)?;
    stats.directories += 1;
    if matches!(reply, Reply::Ng) {
        tracing::warn!(path = %path, "server rejected DIR, not descending");
        return Ok(());
    }

    let entries = match fs::read_dir(path.as_std_path()) {
        Ok(e) => e,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "opendir failed, skipping");
            stats.skipped += 1;
            return Ok(());
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "readdir entry failed, skipping");
                stats.skipped += 1;
                continue;
            }
        };
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name == "." || name == ".." {
            continue;
        }
        if name == ".meta" {
            tracing::warn!(path = %path, "skipping reserved .meta entry found in source tree");
            continue;
        }
        let child = path.join(name.as_ref());
        visit_entry(&child, options, peer, stats)?;
    }

    Ok(())
}

fn visit_entry(
    path: &Utf8Path,
    options: &WalkOptions,
    peer: &mut dyn Peer,
    stats: &mut SessionStats,
) -> Result<(), WalkError> {
    let meta = match lstat(path) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "lstat failed, skipping");
            stats.skipped += 1;
            return Ok(());
        }
    };
    let file_type = meta.file_type();

    if file_type.is_dir() {
        walk_dir(path, options, peer, stats)
    } else if file_type.is_symlink() {
        emit_symlink(path, &meta, options, peer, stats)
    } else if file_type.is_file() {
        emit_file(path, &meta, options, peer, stats)
    } else {
        warn_skipped(path, &meta, options);
        stats.skipped += 1;
        Ok(())
    }
}

fn warn_skipped(path: &Utf8Path, meta: &fs::Metadata, options: &WalkOptions) {
    let file_type = meta.file_type();
    let kind = if file_type.is_block_device() {
        "block device"
    } else if file_type.is_char_device() {
        "character device"
    } else if file_type.is_fifo() {
        "FIFO"
    } else if file_type.is_socket() {
        if options.disable_skipped_socket_warning {
            return;
        }
        "socket"
    } else if is_whiteout(meta) {
        "whiteout"
    } else {
        "unsupported entry"
    };
    tracing::warn!(path = %path, kind, "skipping entry");
}

/// BSD union-filesystem whiteout marker (`S_IFWHT`). `std::fs::FileType`
/// has no accessor for it, so this checks the raw mode bits directly;
/// Linux filesystems never set this bit, so the check is a no-op there.
fn is_whiteout(meta: &fs::Metadata) -> bool {
    const S_IFMT: u32 = 0o170000;
    const S_IFWHT: u32 = 0o160000;
    meta.mode() & S_IFMT == S_IFWHT
}

fn emit_symlink(
    path: &Utf8Path,
    meta: &fs::Metadata,
    options: &WalkOptions,
    peer: &mut dyn Peer,
    stats: &mut SessionStats,
) -> Result<(), WalkError> {
    let target = match fs::read_link(path.as_std_path()) {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "readlink failed, skipping");
            stats.skipped += 1;
            return Ok(());
        }
    };
    let Some(target) = target.to_str() else {
        tracing::warn!(path = %path, "symlink target is not valid UTF-8, skipping");
        stats.skipped += 1;
        return Ok(());
    };
    let rel = relative_to_root(path, &options.root)?;
    let record = Record::Symlink {
        path: rel,
        mode: meta.mode() & 0o777,
        uid: meta.uid(),
        gid: meta.gid(),
        ctime: Timestamp::from_system_time(ctime_of(meta)),
        target: target.into(),
    };
    let reply = peer.request(&record)?;
    reply.validate_for("SYMLINK").map_err(WalkError::Protocol)?;
    if matches!(reply, Reply::Ng) {
        tracing::warn!(path = %path, "server rejected SYMLINK");
    }
    stats.symlinks += 1;
    Ok(())
}

fn emit_file(
    path: &Utf8Path,
    meta: &fs::Metadata,
    options: &WalkOptions,
    peer: &mut dyn Peer,
    stats: &mut SessionStats,
) -> Result<(), WalkError> {
    let mut file = match File::open(path.as_std_path()) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "open failed, skipping");
            stats.skipped += 1;
            return Ok(());
        }
    };

    if let Err(e) = rustix::fs::flock(file.as_fd(), rustix::fs::FlockOperation::NonBlockingLockShared) {
        tracing::warn!(path = %path, error = %e, "flock contended, skipping");
        stats.skipped += 1;
        return Ok(());
    }

    let rel = relative_to_root(path, &options.root)?;
    let record = Record::File {
        path: rel,
        mode: meta.mode() & 0o777,
        uid: meta.uid(),
        gid: meta.gid(),
        mtime: Timestamp::from_system_time(meta.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH)),
        ctime: Timestamp::from_system_time(ctime_of(meta)),
    };
    let reply = peer.request(&record)?;
    reply.validate_for("FILE").map_err(WalkError::Protocol)?;

    stats.files_seen += 1;
    match reply {
        Reply::Changed => {
            stats.files_changed += 1;
            let size = meta.len();
            peer.send_raw(&Record::Body { size }.encode())?;
            stream_body(&mut file, size, peer, stats)?;
            let reply = peer.recv_reply()?;
            if matches!(reply, Reply::Ng) {
                tracing::warn!(path = %path, "server rejected BODY");
            }
        }
        Reply::Unchanged => {}
        other => return Err(WalkError::UnexpectedReply { verb: "FILE", reply: format!("{other:?}") }),
    }

    let _ = rustix::fs::flock(file.as_fd(), rustix::fs::FlockOperation::Unlock);
    Ok(())
}

/// Sends exactly `size` bytes read from `file`. Short reads are retried; if
/// the file shrank since it was stat'd, the remainder is zero-padded so the
/// peer still receives exactly `size` bytes and the wire stays in sync.
fn stream_body(
    file: &mut File,
    size: u64,
    peer: &mut dyn Peer,
    stats: &mut SessionStats,
) -> Result<(), WalkError> {
    let mut remaining = size;
    let mut buf = vec![0u8; READ_CHUNK.min(size.max(1) as usize)];
    while remaining > 0 {
        let want = (remaining as usize).min(buf.len());
        let n = file.read(&mut buf[..want])?;
        if n == 0 {
            tracing::warn!(remaining, "file shrank during transfer, zero-padding remainder");
            let zeros = vec![0u8; remaining as usize];
            peer.send_raw(&zeros)?;
            stats.bytes_sent += remaining;
            remaining = 0;
            break;
        }
        peer.send_raw(&buf[..n])?;
        stats.bytes_sent += n as u64;
        remaining -= n as u64;
    }
    Ok(())
}

#[cfg(unix)]
fn ctime_of(meta: &fs::Metadata) -> std::time::SystemTime {
    std::time::UNIX_EPOCH + std::time::Duration::new(meta.ctime().max(0) as u64, meta.ctime_nsec().max(0) as u32)
}
