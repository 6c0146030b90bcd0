use camino::{Utf8Path, Utf8PathBuf};

/// All state a server session needs, passed explicitly to every handler.
pub struct SessionContext {
    pub backup_root: Utf8PathBuf,
    /// `<backup_root>/(<timestamp>)`, the staged snapshot being written.
    pub dest_dir: Utf8PathBuf,
    /// The most recently committed snapshot at session start, if any.
    pub prev_dir: Option<Utf8PathBuf>,
    /// The relative path of the last `FILE` record received; the sink for
    /// the next `BODY`.
    pub current_file: Option<Utf8PathBuf>,
    /// Set once any record handler returns `Err`, so `THANK_YOU` can still
    /// commit the snapshot but the process exits non-zero: a failed record
    /// replies `NG` and the session continues, but the server's own exit
    /// code reflects it.
    pub had_failure: bool,
}

impl SessionContext {
    pub fn new(backup_root: Utf8PathBuf, dest_dir: Utf8PathBuf, prev_dir: Option<Utf8PathBuf>) -> Self {
        SessionContext {
            backup_root,
            dest_dir,
            prev_dir,
            current_file: None,
            had_failure: false,
        }
    }

    /// `<dest_dir><relative_path>`.
    pub fn staged_path(&self, relative: &Utf8Path) -> Utf8PathBuf {
        join_relative(&self.dest_dir, relative)
    }

    /// `<prev_dir><relative_path>`, if a prior snapshot exists.
    pub fn prior_path(&self, relative: &Utf8Path) -> Option<Utf8PathBuf> {
        self.prev_dir.as_ref().map(|prev| join_relative(prev, relative))
    }
}

fn join_relative(base: &Utf8Path, relative: &Utf8Path) -> Utf8PathBuf {
    let mut out = base.to_owned();
    for component in relative.as_str().split('/').filter(|c| !c.is_empty()) {
        out.push(component);
    }
    out
}
