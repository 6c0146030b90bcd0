use std::fs::{self, File};
use std::io::{Read, Write};

use camino::Utf8Path;
use metadata::{sidecar_path, write_or_link_sidecar, MetaSidecar};
use protocol::{Record, Reply};

use crate::context::SessionContext;
use crate::error::EngineError;
use crate::retention;

/// What the caller should do after dispatching one record.
pub enum Outcome {
    /// Send this reply and keep reading records.
    Reply(Reply),
    /// `THANK_YOU` was received; the caller should commit the snapshot
    /// (see [`crate::commit`]) and stop reading.
    ThankYou,
}

/// Dispatches one decoded [`Record`] to its handler.
///
/// `body_source` supplies the raw bytes for a `BODY` record; it is unused
/// for every other verb. A handler's `Err` is the caller's cue to reply
/// `NG` and keep the session alive — only [`crate::start_session`]'s own
/// failures are fatal.
pub fn dispatch(
    ctx: &mut SessionContext,
    record: Record,
    body_source: &mut dyn Read,
) -> Result<Outcome, EngineError> {
    let reply = match record {
        Record::Dir { path, mode, uid, gid, ctime } => {
            let reply = handle_dir(ctx, &path, mode, uid, gid, ctime.to_system_time())?;
            tracing::info!(path = %path, "DIR accepted");
            reply
        }
        Record::File { path, mode, uid, gid, mtime, ctime } => {
            let reply = handle_file(ctx, &path, mode, uid, gid, mtime.to_system_time(), ctime.to_system_time())?;
            tracing::info!(path = %path, reply = ?reply, "FILE accepted");
            reply
        }
        Record::Symlink { path, mode, uid, gid, ctime, target } => {
            let reply = handle_symlink(ctx, &path, mode, uid, gid, ctime.to_system_time(), &target)?;
            tracing::info!(path = %path, "SYMLINK accepted");
            reply
        }
        Record::Body { size } => handle_body(ctx, size, body_source)?,
        Record::Name => Reply::Ok(Some(ctx.dest_dir.to_string())),
        Record::DiskTotal => handle_disk_total(ctx)?,
        Record::DiskUsage => handle_disk_usage(ctx)?,
        Record::RemoveOld => {
            retention::prune(&ctx.backup_root)?;
            tracing::info!("old snapshots pruned");
            Reply::Ok(None)
        }
        Record::ThankYou => {
            tracing::info!("THANK_YOU received, ending session");
            return Ok(Outcome::ThankYou);
        }
    };
    Ok(Outcome::Reply(reply))
}

fn parent_is_staged(ctx: &SessionContext, relative: &Utf8Path) -> bool {
    match relative.parent() {
        None => true,
        Some(parent) if parent.as_str().is_empty() => true,
        Some(parent) => ctx.staged_path(parent).as_std_path().is_dir(),
    }
}

fn entry_name(relative: &Utf8Path) -> &str {
    relative.file_name().unwrap_or(relative.as_str())
}

fn write_sidecar_for(
    ctx: &SessionContext,
    relative: &Utf8Path,
    mode: u32,
    uid: u32,
    gid: u32,
    ctime: std::time::SystemTime,
) -> Result<(), EngineError> {
    let parent = relative.parent().unwrap_or(Utf8Path::new(""));
    let name = entry_name(relative);
    let new_meta = sidecar_path(&ctx.staged_path(parent), name);
    let prev_meta = ctx.prior_path(parent).map(|p| sidecar_path(&p, name));
    let sidecar = MetaSidecar { mode, uid, gid };
    write_or_link_sidecar(prev_meta.as_deref(), &new_meta, ctime, &sidecar)?;
    Ok(())
}

fn handle_dir(
    ctx: &mut SessionContext,
    path: &Utf8Path,
    mode: u32,
    uid: u32,
    gid: u32,
    ctime: std::time::SystemTime,
) -> Result<Reply, EngineError> {
    let dest = ctx.staged_path(path);
    fs::create_dir(dest.as_std_path())?;
    fs::create_dir(dest.join(".meta").as_std_path())?;
    write_sidecar_for(ctx, path, mode, uid, gid, ctime)?;
    Ok(Reply::Ok(None))
}

fn handle_file(
    ctx: &mut SessionContext,
    path: &Utf8Path,
    mode: u32,
    uid: u32,
    gid: u32,
    mtime: std::time::SystemTime,
    ctime: std::time::SystemTime,
) -> Result<Reply, EngineError> {
    if !parent_is_staged(ctx, path) {
        return Err(EngineError::MissingParent { verb: "FILE", path: path.to_string() });
    }

    ctx.current_file = Some(path.to_owned());
    let dest = ctx.staged_path(path);
    let prev = ctx.prior_path(path);

    let changed = match &prev {
        None => true,
        Some(prev_path) => match fs::metadata(prev_path.as_std_path()) {
            Err(_) => true,
            Ok(prev_meta) => match prev_meta.modified() {
                Ok(prev_mtime) => prev_mtime < mtime,
                Err(_) => true,
            },
        },
    };

    let reply = if changed {
        Reply::Changed
    } else {
        let prev_path = prev.expect("changed=false implies prev exists");
        fs::hard_link(prev_path.as_std_path(), dest.as_std_path())?;
        Reply::Unchanged
    };

    write_sidecar_for(ctx, path, mode, uid, gid, ctime)?;
    Ok(reply)
}

fn handle_body(ctx: &mut SessionContext, size: u64, body_source: &mut dyn Read) -> Result<Reply, EngineError> {
    let relative = ctx.current_file.clone().ok_or(EngineError::NoCurrentFile)?;
    let dest = ctx.staged_path(&relative);
    let mut file = File::create(dest.as_std_path())?;

    let mut remaining = size;
    let mut buf = vec![0u8; 64 * 1024];
    while remaining > 0 {
        let want = (remaining as usize).min(buf.len());
        let n = body_source.read(&mut buf[..want])?;
        if n == 0 {
            break;
        }
        file.write_all(&buf[..n])?;
        remaining -= n as u64;
    }
    Ok(Reply::Ok(None))
}

fn handle_symlink(
    ctx: &mut SessionContext,
    path: &Utf8Path,
    mode: u32,
    uid: u32,
    gid: u32,
    ctime: std::time::SystemTime,
    target: &Utf8Path,
) -> Result<Reply, EngineError> {
    if !parent_is_staged(ctx, path) {
        return Err(EngineError::MissingParent { verb: "SYMLINK", path: path.to_string() });
    }
    let dest = ctx.staged_path(path);
    std::os::unix::fs::symlink(target.as_std_path(), dest.as_std_path())?;
    write_sidecar_for(ctx, path, mode, uid, gid, ctime)?;
    Ok(Reply::Ok(None))
}

fn handle_disk_total(ctx: &SessionContext) -> Result<Reply, EngineError> {
    let stats = statfs(&ctx.dest_dir)?;
    Ok(Reply::Ok(Some(stats.total_bytes.to_string())))
}

fn handle_disk_usage(ctx: &SessionContext) -> Result<Reply, EngineError> {
    let stats = statfs(&ctx.dest_dir)?;
    Ok(Reply::Ok(Some(stats.used_bytes.to_string())))
}

struct DiskStats {
    total_bytes: u64,
    used_bytes: u64,
}

fn statfs(path: &Utf8Path) -> Result<DiskStats, EngineError> {
    let stats = rustix::fs::statfs(path.as_std_path()).map_err(|e| EngineError::Statfs(e.to_string()))?;
    let bsize = stats.f_bsize as u64;
    let blocks = stats.f_blocks as u64;
    let bfree = stats.f_bfree as u64;
    Ok(DiskStats {
        total_bytes: bsize * blocks,
        used_bytes: bsize * blocks.saturating_sub(bfree),
    })
}
