use std::fs;
use std::time::SystemTime;

use camino::Utf8Path;
use time::OffsetDateTime;

use crate::context::SessionContext;
use crate::error::EngineError;
use crate::retention::{list_names, BackupName};

/// Starts a new server session rooted at `backup_root`: computes the
/// staged snapshot name, finds the most recent committed snapshot (if
/// any), and creates `dest_dir` and its `.meta` directory.
pub fn start_session(backup_root: &Utf8Path) -> Result<SessionContext, EngineError> {
    let timestamp = snapshot_timestamp(SystemTime::now());
    let dest_dir = backup_root.join(format!("({timestamp})"));

    let prev_dir = most_recent_snapshot(backup_root)?.map(|name| backup_root.join(name.raw));

    mkdir(&dest_dir)?;
    mkdir(&dest_dir.join(".meta"))?;

    tracing::info!(dir = %dest_dir, "new backup");
    Ok(SessionContext::new(backup_root.to_owned(), dest_dir, prev_dir))
}

fn most_recent_snapshot(backup_root: &Utf8Path) -> Result<Option<BackupName>, EngineError> {
    let mut names = match list_names(backup_root) {
        Ok(n) => n,
        Err(e) => {
            return Err(EngineError::StagingFailed { path: backup_root.to_string(), source: e })
        }
    };
    names.sort();
    Ok(names.pop())
}

fn mkdir(path: &Utf8Path) -> Result<(), EngineError> {
    fs::create_dir(path.as_std_path()).map_err(|source| EngineError::StagingFailed {
        path: path.to_string(),
        source,
    })
}

/// `YYYY-MM-DDTHH:MM:SS,mmm` in local time.
fn snapshot_timestamp(now: SystemTime) -> String {
    let odt: OffsetDateTime = now.into();
    let local = odt.to_offset(time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC));
    let millis = local.millisecond();
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02},{:03}",
        local.year(),
        u8::from(local.month()),
        local.day(),
        local.hour(),
        local.minute(),
        local.second(),
        millis,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn snapshot_timestamp_has_expected_shape() {
        let now = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let s = snapshot_timestamp(now);
        assert_eq!(s.len(), "2024-01-15T03:00:00,012".len());
        assert!(s.contains(','));
    }

    #[test]
    fn start_session_creates_staged_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let ctx = start_session(root).unwrap();
        assert!(ctx.dest_dir.as_str().starts_with(&format!("{root}/(")));
        assert!(ctx.dest_dir.join(".meta").as_std_path().is_dir());
        assert!(ctx.prev_dir.is_none());
    }

    #[test]
    fn start_session_finds_prior_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        fs::create_dir(root.join("2024-01-01T00:00:00,000").as_std_path()).unwrap();
        fs::create_dir(root.join("2024-01-02T00:00:00,000").as_std_path()).unwrap();
        let ctx = start_session(root).unwrap();
        assert_eq!(ctx.prev_dir.unwrap(), root.join("2024-01-02T00:00:00,000"));
    }
}
