use camino::{Utf8Path, Utf8PathBuf};

use crate::error::WalkError;

/// Paths longer than this are rejected rather than silently truncated.
const MAX_PATH_BYTES: usize = 4096;

/// Canonicalizes `path` to an absolute, `.`/`..`-resolved, separator
/// normalized form, without touching the filesystem.
///
/// `path` is resolved against `cwd` if it is not already absolute. This
/// takes `cwd` as an explicit argument (rather than reading the process's
/// current directory) so the function stays pure and unit-testable.
pub fn normalize(path: &Utf8Path, cwd: &Utf8Path) -> Result<Utf8PathBuf, WalkError> {
    let absolute: Utf8PathBuf = if path.is_absolute() {
        path.to_owned()
    } else {
        cwd.join(path)
    };

    let mut components: Vec<&str> = Vec::new();
    for part in absolute.as_str().split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                components.pop();
            }
            other => components.push(other),
        }
    }

    let rendered = if components.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", components.join("/"))
    };

    if rendered.len() > MAX_PATH_BYTES {
        return Err(WalkError::PathTooLong {
            path: rendered,
            limit: MAX_PATH_BYTES,
        });
    }

    Ok(Utf8PathBuf::from(rendered))
}

/// Computes `path`'s location relative to `root`, both of which must
/// already be normalized.
///
/// If `root` is `/`, the relative path equals `path`. Otherwise this
/// verifies that `path` is actually nested under `root` (the stripped
/// remainder must be empty or start with `/`) before accepting the match,
/// so a sibling directory that merely shares a string prefix with `root`
/// (e.g. `/srv/backup2` against `/srv/backup`) is rejected rather than
/// silently treated as a child.
pub fn relative_to_root(path: &Utf8Path, root: &Utf8Path) -> Result<Utf8PathBuf, WalkError> {
    if root.as_str() == "/" {
        return Ok(path.to_owned());
    }

    let path_str = path.as_str();
    let root_str = root.as_str();
    let stripped = path_str.strip_prefix(root_str).filter(|rest| rest.is_empty() || rest.starts_with('/'));

    match stripped {
        Some(rest) => Ok(Utf8PathBuf::from(rest)),
        None => Err(WalkError::RootMismatch {
            path: path_str.to_string(),
            root: root_str.to_string(),
        }),
    }
}
