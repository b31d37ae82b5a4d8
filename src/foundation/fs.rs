//! Filesystem helpers used by delivery and cleanup paths.

use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context as _;

use crate::foundation::error::KenBurnsResult;

/// Create `dir` (and parents) if it does not exist yet.
pub fn ensure_dir(dir: &Path) -> KenBurnsResult<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory '{}'", dir.display()))?;
    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> KenBurnsResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

/// `true` when `path` names an existing regular file.
pub fn file_exists(path: &Path) -> bool {
    path.is_file()
}

/// Delete `path`, treating an already-missing file as success.
///
/// Returns `true` when a file was actually removed. Other IO errors are logged and swallowed so
/// that cleanup never fails its caller.
pub fn remove_file_quiet(path: &Path) -> bool {
    match std::fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove file");
            false
        }
    }
}
