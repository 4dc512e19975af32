//! Upward search for an Atrium install root.

use crate::walk::{has_markers, parent, resolve_if_symlink};
use crate::InstanceError;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Marker files that must all exist for a directory to qualify as an
/// Atrium install root. The set is fixed; a root is never partially valid.
pub const ROOT_MARKERS: &[&str] = &["bin/atrium-server", "etc/atrium.toml", "release.info"];

/// A validated Atrium install root directory.
///
/// Construction goes through [`InstancePath::bind`] or [`locate`], so a
/// value of this type always satisfied the full marker set at bind time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstancePath(PathBuf);

impl InstancePath {
    /// Validates `path` as an install root without searching upward.
    ///
    /// Fails with `InvalidArgument` when the path is not a directory and
    /// with `RootNotFound` when any marker is missing.
    pub fn bind(path: impl Into<PathBuf>) -> Result<Self, InstanceError> {
        let path = path.into();
        if !path.is_dir() {
            return Err(InstanceError::InvalidArgument(path));
        }
        if !has_markers(&path, ROOT_MARKERS) {
            return Err(InstanceError::RootNotFound(path));
        }
        Ok(Self(path))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn join(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.0.join(rel)
    }
}

impl AsRef<Path> for InstancePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for InstancePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// Walks upward from `start` looking for an install root.
///
/// The search runs twice: first without dereferencing symlinks, then with.
/// A path may only resolve to a valid root once links are followed, but
/// preferring the non-dereferenced hit keeps path identity stable for
/// setups that symlink into a shared install.
pub fn locate(start: &Path) -> Result<InstancePath, InstanceError> {
    if !start.is_dir() {
        return Err(InstanceError::InvalidArgument(start.to_path_buf()));
    }

    for follow in [false, true] {
        let mut current = start.to_path_buf();
        loop {
            let candidate = resolve_if_symlink(&current, follow);
            if has_markers(&candidate, ROOT_MARKERS) {
                debug!(root = %candidate.display(), follow, "install root located");
                return Ok(InstancePath(candidate));
            }
            match parent(&candidate) {
                Some(up) => current = up.to_path_buf(),
                None => break,
            }
        }
    }

    Err(InstanceError::RootNotFound(start.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_root(base: &Path) {
        std::fs::create_dir_all(base.join("bin")).unwrap();
        std::fs::create_dir_all(base.join("etc")).unwrap();
        std::fs::write(base.join("bin/atrium-server"), "").unwrap();
        std::fs::write(base.join("etc/atrium.toml"), "").unwrap();
        std::fs::write(base.join("release.info"), "version = 7.0.1\n").unwrap();
    }

    #[test]
    fn locates_root_from_the_root_itself() {
        let dir = tempfile::tempdir().unwrap();
        make_root(dir.path());
        let found = locate(dir.path()).unwrap();
        assert_eq!(found.as_path(), dir.path());
    }

    #[test]
    fn locates_root_from_deep_nesting() {
        let dir = tempfile::tempdir().unwrap();
        make_root(dir.path());
        let deep = dir.path().join("modules/accounts/views");
        std::fs::create_dir_all(&deep).unwrap();
        let found = locate(&deep).unwrap();
        assert_eq!(found.as_path(), dir.path());
    }

    #[cfg(unix)]
    #[test]
    fn locates_root_through_one_symlink_hop() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        make_root(&real);
        let inner = real.join("custom");
        std::fs::create_dir_all(&inner).unwrap();

        let link = dir.path().join("current");
        std::os::unix::fs::symlink(&inner, &link).unwrap();

        let found = locate(&link).unwrap();
        assert_eq!(found.as_path(), real.canonicalize().unwrap());
    }

    #[test]
    fn fails_with_root_not_found_when_no_ancestor_matches() {
        let dir = tempfile::tempdir().unwrap();
        let err = locate(dir.path()).unwrap_err();
        assert!(matches!(err, InstanceError::RootNotFound(p) if p == dir.path()));
    }

    #[test]
    fn non_directory_start_is_an_argument_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, "").unwrap();
        let err = locate(&file).unwrap_err();
        assert!(matches!(err, InstanceError::InvalidArgument(_)));
    }

    #[test]
    fn bind_rejects_a_directory_without_markers() {
        let dir = tempfile::tempdir().unwrap();
        let err = InstancePath::bind(dir.path()).unwrap_err();
        assert!(matches!(err, InstanceError::RootNotFound(_)));
    }

    #[test]
    fn bind_accepts_a_complete_root() {
        let dir = tempfile::tempdir().unwrap();
        make_root(dir.path());
        let bound = InstancePath::bind(dir.path()).unwrap();
        assert_eq!(bound.join("release.info"), dir.path().join("release.info"));
    }
}
