//! Filesystem primitives for the upward root search.

use std::path::{Path, PathBuf};

/// Returns the immediate parent directory, or `None` once the top of the
/// path has been reached.
pub fn parent(path: &Path) -> Option<&Path> {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => Some(p),
        _ => None,
    }
}

/// Returns the canonicalized target when `follow` is set and `path` is a
/// symlink, otherwise the path unchanged. A dangling link resolves to
/// itself so the caller's marker checks simply fail.
pub fn resolve_if_symlink(path: &Path, follow: bool) -> PathBuf {
    if follow && is_symlink(path) {
        path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
    } else {
        path.to_path_buf()
    }
}

fn is_symlink(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// True iff every marker file exists under `path`. Non-directory paths
/// report `false`; callers validate directory-ness upstream.
pub fn has_markers(path: &Path, markers: &[&str]) -> bool {
    if !path.is_dir() {
        return false;
    }
    markers.iter().all(|marker| path.join(marker).exists())
}
