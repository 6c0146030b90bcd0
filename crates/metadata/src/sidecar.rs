use std::fs;
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::MetadataError;

/// Permission bits, owner, and group for one snapshot entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaSidecar {
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
}

impl MetaSidecar {
    /// Renders the three-line sidecar body, with no trailing newline.
    pub fn render(&self) -> String {
        format!("{:o}\n{}\n{}", self.mode, self.uid, self.gid)
    }

    /// Parses a sidecar body back into its three fields.
    pub fn parse(s: &str) -> Result<Self, MetadataError> {
        let mut lines = s.lines();
        let mode = lines
            .next()
            .ok_or_else(|| MetadataError::Malformed("missing mode line".to_string()))?;
        let uid = lines
            .next()
            .ok_or_else(|| MetadataError::Malformed("missing uid line".to_string()))?;
        let gid = lines
            .next()
            .ok_or_else(|| MetadataError::Malformed("missing gid line".to_string()))?;

        let mode = u32::from_str_radix(mode, 8)
            .map_err(|e| MetadataError::Malformed(format!("mode {mode:?}: {e}")))?;
        let uid = uid
            .parse()
            .map_err(|e| MetadataError::Malformed(format!("uid {uid:?}: {e}")))?;
        let gid = gid
            .parse()
            .map_err(|e| MetadataError::Malformed(format!("gid {gid:?}: {e}")))?;

        Ok(MetaSidecar { mode, uid, gid })
    }
}

/// The sidecar path for an entry named `name` inside `parent_dir`:
/// `<parent_dir>/.meta/<name>.meta`.
pub fn sidecar_path(parent_dir: &Utf8Path, name: &str) -> Utf8PathBuf {
    parent_dir.join(".meta").join(format!("{name}.meta"))
}

/// Materializes a sidecar at `new_meta_path`, hard-linking from
/// `prev_meta_path` when it exists and is no older than `ctime`, otherwise
/// writing `sidecar` fresh.
///
/// `ENAMETOOLONG` while opening the destination is treated as non-fatal
/// success: the entry itself is kept without a sidecar rather than failing
/// the whole record.
pub fn write_or_link_sidecar(
    prev_meta_path: Option<&Utf8Path>,
    new_meta_path: &Utf8Path,
    ctime: SystemTime,
    sidecar: &MetaSidecar,
) -> Result<(), MetadataError> {
    if let Some(prev) = prev_meta_path {
        if let Ok(prev_meta) = fs::metadata(prev) {
            if let Ok(prev_mtime) = prev_meta.modified() {
                if prev_mtime >= ctime {
                    return match fs::hard_link(prev, new_meta_path) {
                        Ok(()) => Ok(()),
                        Err(e) if is_name_too_long(&e) => Ok(()),
                        Err(e) => Err(e.into()),
                    };
                }
            }
        }
    }

    match fs::write(new_meta_path, sidecar.render()) {
        Ok(()) => Ok(()),
        Err(e) if is_name_too_long(&e) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn is_name_too_long(e: &std::io::Error) -> bool {
    e.raw_os_error() == Some(libc::ENAMETOOLONG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn render_has_no_trailing_newline() {
        let s = MetaSidecar { mode: 0o644, uid: 1000, gid: 1000 };
        assert_eq!(s.render(), "644\n1000\n1000");
    }

    #[test]
    fn parse_round_trips() {
        let s = MetaSidecar { mode: 0o755, uid: 0, gid: 0 };
        let parsed = MetaSidecar::parse(&s.render()).unwrap();
        assert_eq!(parsed, s);
    }

    #[test]
    fn sidecar_path_is_sibling_dot_meta() {
        let p = sidecar_path(Utf8Path::new("/backup/usr/bin"), "ls");
        assert_eq!(p.as_str(), "/backup/usr/bin/.meta/ls.meta");
    }

    #[test]
    fn writes_fresh_when_no_prior_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let new_path = Utf8Path::from_path(dir.path()).unwrap().join("a.meta");
        let sidecar = MetaSidecar { mode: 0o644, uid: 0, gid: 0 };
        write_or_link_sidecar(None, &new_path, SystemTime::now(), &sidecar).unwrap();
        let contents = fs::read_to_string(&new_path).unwrap();
        assert_eq!(contents, sidecar.render());
    }

    #[test]
    fn links_when_prior_is_fresh_enough() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let prev = root.join("prev.meta");
        let sidecar = MetaSidecar { mode: 0o600, uid: 42, gid: 42 };
        fs::write(&prev, sidecar.render()).unwrap();

        let new_path = root.join("new.meta");
        let ctime = SystemTime::now() - Duration::from_secs(10);
        write_or_link_sidecar(Some(&prev), &new_path, ctime, &sidecar).unwrap();

        let prev_ino = fs::metadata(&prev).unwrap();
        let new_ino = fs::metadata(&new_path).unwrap();
        use std::os::unix::fs::MetadataExt;
        assert_eq!(prev_ino.ino(), new_ino.ino());
    }

    #[test]
    fn writes_fresh_when_prior_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        let prev = root.join("prev.meta");
        let old = MetaSidecar { mode: 0o600, uid: 1, gid: 1 };
        fs::write(&prev, old.render()).unwrap();

        let new_path = root.join("new.meta");
        let fresh = MetaSidecar { mode: 0o640, uid: 2, gid: 2 };
        // ctime newer than the prior sidecar's mtime forces a fresh write.
        let ctime = SystemTime::now() + Duration::from_secs(3600);
        write_or_link_sidecar(Some(&prev), &new_path, ctime, &fresh).unwrap();

        let contents = fs::read_to_string(&new_path).unwrap();
        assert_eq!(contents, fresh.render());
    }
}
