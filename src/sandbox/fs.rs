//! Filesystem helpers for the box directory
//!
//! Path containment checks for files injected into a box, and emptying of the
//! box before teardown. Symlinks are never followed out of the box.

use std::fs::{self, DirBuilder};
use std::io;
use std::os::unix::fs::DirBuilderExt;
use std::path::{Component, Path, PathBuf};

use crate::error::{Result, SandboxError};

/// Mode for directories created inside the box
const PRIVATE_DIR_MODE: u32 = 0o700;

/// Lexically normalise a path: drop `.`, apply `..` without touching the filesystem
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

/// Resolve an injection destination against the box directory.
///
/// The result always names an entry strictly inside `box_dir`. Relative
/// destinations are joined to `box_dir`; absolute ones must already point into
/// it.
pub fn resolve_in_box(box_dir: &Path, destination: &Path) -> Result<PathBuf> {
    let joined = if destination.is_absolute() {
        destination.to_path_buf()
    } else {
        box_dir.join(destination)
    };
    let resolved = normalize(&joined);
    let box_dir = normalize(box_dir);

    if resolved != box_dir && resolved.starts_with(&box_dir) {
        Ok(resolved)
    } else {
        Err(SandboxError::PathEscape {
            destination: destination.to_path_buf(),
            box_dir,
        })
    }
}

/// Reject `path` if an existing ancestor inside the box is a symlink leading
/// out of it. Nothing is created or modified.
pub fn ensure_no_symlink_escape(box_dir: &Path, path: &Path) -> Result<()> {
    let real_box = fs::canonicalize(box_dir).map_err(|e| {
        SandboxError::io(format!("failed to resolve box directory {:?}", box_dir), e)
    })?;

    let mut ancestor = path.parent();
    while let Some(dir) = ancestor {
        match fs::canonicalize(dir) {
            Ok(real) => {
                return if real.starts_with(&real_box) {
                    Ok(())
                } else {
                    Err(SandboxError::PathEscape {
                        destination: path.to_path_buf(),
                        box_dir: box_dir.to_path_buf(),
                    })
                };
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => ancestor = dir.parent(),
            Err(e) => {
                return Err(SandboxError::io(
                    format!("failed to resolve {:?}", dir),
                    e,
                ))
            }
        }
    }
    Ok(())
}

/// Create `dir` and any missing parents with owner-only permissions
pub fn create_private_dirs(dir: &Path) -> Result<()> {
    DirBuilder::new()
        .recursive(true)
        .mode(PRIVATE_DIR_MODE)
        .create(dir)
        .map_err(|e| SandboxError::io(format!("failed to create directory {:?}", dir), e))
}

/// Remove every entry inside `dir`, keeping `dir` itself.
///
/// A missing directory counts as empty. Symlinks are removed, not followed.
pub fn remove_dir_contents(dir: &Path) -> Result<()> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(SandboxError::io(format!("failed to read {:?}", dir), e)),
    };

    for entry in entries {
        let entry = entry.map_err(|e| SandboxError::io(format!("failed to read {:?}", dir), e))?;
        let path = entry.path();
        let file_type = entry
            .file_type()
            .map_err(|e| SandboxError::io(format!("failed to stat {:?}", path), e))?;

        let removed = if file_type.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|e| SandboxError::io(format!("failed to remove {:?}", path), e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::{symlink, PermissionsExt};

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/../../etc")), PathBuf::from("/etc"));
        assert_eq!(normalize(Path::new("a/b/../../..")), PathBuf::new());
    }

    #[test]
    fn test_resolve_relative_inside() {
        let resolved = resolve_in_box(Path::new("/w/box"), Path::new("sub/./main.py")).unwrap();
        assert_eq!(resolved, PathBuf::from("/w/box/sub/main.py"));
    }

    #[test]
    fn test_resolve_rejects_parent_traversal() {
        let err = resolve_in_box(Path::new("/w/box"), Path::new("../../etc/passwd")).unwrap_err();
        assert!(matches!(err, SandboxError::PathEscape { .. }));
    }

    #[test]
    fn test_resolve_rejects_foreign_absolute() {
        let err = resolve_in_box(Path::new("/w/box"), Path::new("/etc/passwd")).unwrap_err();
        assert!(matches!(err, SandboxError::PathEscape { .. }));
    }

    #[test]
    fn test_resolve_rejects_sibling_with_shared_prefix() {
        let err = resolve_in_box(Path::new("/w/box"), Path::new("/w/boxed/file")).unwrap_err();
        assert!(matches!(err, SandboxError::PathEscape { .. }));
    }

    #[test]
    fn test_resolve_rejects_box_itself() {
        assert!(resolve_in_box(Path::new("/w/box"), Path::new("/w/box/sub/..")).is_err());
    }

    #[test]
    fn test_resolve_absolute_inside() {
        let resolved = resolve_in_box(Path::new("/w/box"), Path::new("/w/box/a/../b")).unwrap();
        assert_eq!(resolved, PathBuf::from("/w/box/b"));
    }

    #[test]
    fn test_symlinked_directory_escape_is_rejected() {
        let box_dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        symlink(outside.path(), box_dir.path().join("link")).unwrap();

        let target = box_dir.path().join("link/new/file.txt");
        let err = ensure_no_symlink_escape(box_dir.path(), &target).unwrap_err();
        assert!(matches!(err, SandboxError::PathEscape { .. }));

        let inside = box_dir.path().join("plain/new/file.txt");
        assert!(ensure_no_symlink_escape(box_dir.path(), &inside).is_ok());
    }

    #[test]
    fn test_create_private_dirs_mode() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a/b");
        create_private_dirs(&nested).unwrap();

        for dir in [root.path().join("a"), nested] {
            let mode = fs::metadata(&dir).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o700);
        }
    }

    #[test]
    fn test_remove_dir_contents() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("keep.txt"), b"keep").unwrap();

        fs::write(root.path().join("a.txt"), b"a").unwrap();
        fs::create_dir_all(root.path().join("d/e")).unwrap();
        fs::write(root.path().join("d/e/f.txt"), b"f").unwrap();
        symlink(outside.path(), root.path().join("link")).unwrap();

        remove_dir_contents(root.path()).unwrap();

        assert!(root.path().exists());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
        assert!(outside.path().join("keep.txt").exists());
    }

    #[test]
    fn test_remove_dir_contents_empty_and_missing() {
        let root = tempfile::tempdir().unwrap();
        remove_dir_contents(root.path()).unwrap();
        remove_dir_contents(root.path()).unwrap();
        remove_dir_contents(&root.path().join("missing")).unwrap();
    }
}
