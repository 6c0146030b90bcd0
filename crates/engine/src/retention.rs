use std::fs;

use camino::Utf8Path;

use crate::error::EngineError;

/// Snapshots beyond this many are pruned by [`prune`].
pub const MAX_SNAPSHOTS: usize = 93;

/// A snapshot's on-disk directory name, comparable so that a staged name
/// `(T)` and its eventual committed name `T` sort identically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupName {
    pub raw: String,
    key: String,
}

impl BackupName {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let key = raw
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .unwrap_or(&raw)
            .to_string();
        BackupName { raw, key }
    }

    /// True if this name is eligible as a backup entry: begins with a
    /// decimal digit, or with `(`.
    pub fn looks_like_backup(name: &str) -> bool {
        matches!(name.as_bytes().first(), Some(b) if b.is_ascii_digit() || *b == b'(')
    }
}

impl PartialOrd for BackupName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BackupName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key.cmp(&other.key)
    }
}

/// Lists the backup-eligible names currently under `backup_root`.
pub fn list_names(backup_root: &Utf8Path) -> std::io::Result<Vec<BackupName>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(backup_root.as_std_path())? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if BackupName::looks_like_backup(name) {
            names.push(BackupName::new(name));
        }
    }
    Ok(names)
}

/// Keeps the [`MAX_SNAPSHOTS`] lexicographically greatest backup names
/// under `backup_root`, deleting the rest. A failure to delete one old
/// snapshot is logged and does not stop the rest from being pruned.
pub fn prune(backup_root: &Utf8Path) -> Result<(), EngineError> {
    let mut names = list_names(backup_root)?;
    names.sort_by(|a, b| b.cmp(a));

    for stale in names.into_iter().skip(MAX_SNAPSHOTS) {
        let path = backup_root.join(&stale.raw);
        if let Err(e) = fs::remove_dir_all(path.as_std_path()) {
            tracing::error!(snapshot = %stale.raw, error = %e, "failed to prune old snapshot");
        } else {
            tracing::info!(snapshot = %stale.raw, "pruned old snapshot");
        }
    }
    Ok(())
}
