use std::fs;

use camino::Utf8PathBuf;

use crate::context::SessionContext;
use crate::error::EngineError;

/// Promotes a staged snapshot to a committed one: `rename((T), T)`.
///
/// Called once, when `THANK_YOU` ends the session. The rename is a single
/// `rename(2)` within the same directory, so it is atomic: a concurrent
/// reader of `backup_root` never observes a half-written snapshot under a
/// name other than its parenthesized staging one.
pub fn commit(ctx: &SessionContext) -> Result<Utf8PathBuf, EngineError> {
    let committed = final_name(&ctx.dest_dir);
    fs::rename(ctx.dest_dir.as_std_path(), committed.as_std_path()).map_err(|source| EngineError::StagingFailed {
        path: ctx.dest_dir.to_string(),
        source,
    })?;
    Ok(committed)
}

fn final_name(staged: &camino::Utf8Path) -> Utf8PathBuf {
    let parent = staged.parent().unwrap_or(camino::Utf8Path::new(""));
    let name = staged.file_name().unwrap_or_default();
    let stripped = name.strip_prefix('(').and_then(|s| s.strip_suffix(')')).unwrap_or(name);
    parent.join(stripped)
}

/// The process exit status for a finished session: 0 if every record
/// handler succeeded, 1 if any was downgraded to `NG`.
pub fn exit_status(ctx: &SessionContext) -> i32 {
    if ctx.had_failure {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::startup::start_session;

    #[test]
    fn commit_strips_parentheses() {
        let dir = tempfile::tempdir().unwrap();
        let root = camino::Utf8Path::from_path(dir.path()).unwrap();
        let ctx = start_session(root).unwrap();
        let staged_name = ctx.dest_dir.file_name().unwrap().to_string();
        assert!(staged_name.starts_with('(') && staged_name.ends_with(')'));

        let committed = commit(&ctx).unwrap();
        assert!(committed.as_std_path().is_dir());
        assert!(!ctx.dest_dir.as_std_path().exists());
        assert_eq!(committed.file_name().unwrap(), &staged_name[1..staged_name.len() - 1]);
    }

    #[test]
    fn exit_status_reflects_failures() {
        let dir = tempfile::tempdir().unwrap();
        let root = camino::Utf8Path::from_path(dir.path()).unwrap();
        let mut ctx = start_session(root).unwrap();
        assert_eq!(exit_status(&ctx), 0);
        ctx.had_failure = true;
        assert_eq!(exit_status(&ctx), 1);
    }
}
