//! Path confinement: every request path is cleaned lexically and joined under
//! the sandbox root, then checked against symlinks that lead out of it.
//! Lexically invalid paths are rejected before the filesystem is consulted.

use std::fs;
use std::path::{Component, Path, PathBuf};

use memoh_core::config::SandboxConfig;

use crate::error::{FsError, Result};

/// The directory all tool paths are confined to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_config(config: &SandboxConfig) -> Self {
        Self::new(config.root.clone())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative request path to an absolute path under the root.
    ///
    /// Rejects paths that clean to nothing, absolute paths, and paths whose
    /// cleaned form starts with `..`. The returned path is the lexical join;
    /// its canonical form (symlinks followed) must stay under the canonical
    /// root, or the request is rejected as [`FsError::InvalidPath`].
    pub fn resolve(&self, request_path: &str) -> Result<PathBuf> {
        let cleaned = clean_relative(request_path)
            .ok_or_else(|| FsError::InvalidPath(request_path.to_string()))?;
        let joined = self.root.join(cleaned);
        self.confine(request_path, &joined)?;
        Ok(joined)
    }

    fn confine(&self, request_path: &str, joined: &Path) -> Result<()> {
        let root = canonicalize_existing(&self.root).map_err(|e| FsError::io(&self.root, e))?;
        let target = canonicalize_existing(joined).map_err(|e| FsError::io(joined, e))?;
        if !target.starts_with(&root) {
            tracing::warn!(
                path = request_path,
                resolved = %target.display(),
                "Path escapes sandbox root"
            );
            return Err(FsError::InvalidPath(request_path.to_string()));
        }
        Ok(())
    }

    /// Like [`Sandbox::resolve`], but a blank request path means the root itself.
    pub fn resolve_allow_root(&self, request_path: &str) -> Result<PathBuf> {
        if request_path.trim().is_empty() {
            return Ok(self.root.clone());
        }
        self.resolve(request_path)
    }

    /// Convert an absolute path found under the root back to a sandbox-relative,
    /// slash-separated path. The root itself maps to `""`.
    pub fn relativize(&self, absolute: &Path) -> Result<String> {
        let rel = absolute
            .strip_prefix(&self.root)
            .map_err(|_| FsError::InvalidPath(absolute.display().to_string()))?;

        let mut parts = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => return Err(FsError::InvalidPath(absolute.display().to_string())),
            }
        }
        Ok(parts.join("/"))
    }
}

/// Canonicalize the deepest existing ancestor of `path` and re-append the
/// components that do not exist yet. A dangling symlink fails to canonicalize.
fn canonicalize_existing(path: &Path) -> std::io::Result<PathBuf> {
    let mut existing = path;
    let mut missing = Vec::new();
    while fs::symlink_metadata(existing).is_err() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => break,
        }
    }
    let existing = if existing.as_os_str().is_empty() {
        Path::new(".")
    } else {
        existing
    };
    let mut canonical = existing.canonicalize()?;
    for name in missing.iter().rev() {
        canonical.push(name);
    }
    Ok(canonical)
}

/// Lexically clean `path`. Returns `None` when the result is empty, absolute,
/// or begins with a parent-directory component.
fn clean_relative(path: &str) -> Option<PathBuf> {
    let mut parts: Vec<Component<'_>> = Vec::new();
    for component in Path::new(path).components() {
        match component {
            Component::Prefix(_) | Component::RootDir => return None,
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                _ => parts.push(component),
            },
            Component::Normal(_) => parts.push(component),
        }
    }
    match parts.first() {
        None | Some(Component::ParentDir) => None,
        Some(_) => Some(parts.iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox() -> Sandbox {
        Sandbox::new("/data")
    }

    #[test]
    fn test_resolve_joins_under_root() {
        let sb = sandbox();
        assert_eq!(sb.resolve("notes/a.txt").unwrap(), PathBuf::from("/data/notes/a.txt"));
        assert_eq!(sb.resolve("./notes//a.txt").unwrap(), PathBuf::from("/data/notes/a.txt"));
        assert_eq!(sb.resolve("notes/../b.txt").unwrap(), PathBuf::from("/data/b.txt"));
    }

    #[test]
    fn test_resolve_rejects_escapes_and_empty() {
        let sb = sandbox();
        for bad in ["", ".", "./", "..", "../etc/passwd", "a/../../x", "/etc/passwd", "a/.."] {
            let err = sb.resolve(bad).unwrap_err();
            assert!(matches!(err, FsError::InvalidPath(_)), "expected rejection for {bad:?}");
        }
    }

    #[test]
    fn test_resolve_allows_dotdot_prefixed_names() {
        assert_eq!(sandbox().resolve("..foo").unwrap(), PathBuf::from("/data/..foo"));
    }

    #[test]
    fn test_resolved_paths_stay_under_root() {
        let sb = sandbox();
        for ok in ["a", "a/b/c", "a/./b", "a/b/../c", "deep/x/y/../../z"] {
            let resolved = sb.resolve(ok).unwrap();
            assert!(resolved.starts_with(sb.root()));
            assert_ne!(resolved, sb.root());
        }
    }

    #[test]
    fn test_resolve_allow_root() {
        let sb = sandbox();
        assert_eq!(sb.resolve_allow_root("").unwrap(), PathBuf::from("/data"));
        assert_eq!(sb.resolve_allow_root("  ").unwrap(), PathBuf::from("/data"));
        assert_eq!(sb.resolve_allow_root("sub").unwrap(), PathBuf::from("/data/sub"));
        assert!(sb.resolve_allow_root("..").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_rejects_symlink_out_of_root() {
        let root = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        fs::write(outside.path().join("secret.txt"), "top secret\n").unwrap();
        std::os::unix::fs::symlink(outside.path(), root.path().join("link")).unwrap();
        std::os::unix::fs::symlink(outside.path().join("gone"), root.path().join("dangling"))
            .unwrap();
        let sb = Sandbox::new(root.path());

        for bad in ["link", "link/secret.txt", "link/new/planted.txt"] {
            assert!(matches!(sb.resolve(bad), Err(FsError::InvalidPath(_))), "{bad}");
        }
        assert!(matches!(sb.resolve_allow_root("link"), Err(FsError::InvalidPath(_))));
        assert!(sb.resolve("dangling").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_allows_symlink_within_root() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("real")).unwrap();
        std::os::unix::fs::symlink(root.path().join("real"), root.path().join("alias")).unwrap();
        let sb = Sandbox::new(root.path());
        assert_eq!(
            sb.resolve("alias/file.txt").unwrap(),
            root.path().join("alias/file.txt")
        );
        assert_eq!(
            sb.resolve("not/yet/created.txt").unwrap(),
            root.path().join("not/yet/created.txt")
        );
    }

    #[test]
    fn test_relativize() {
        let sb = sandbox();
        assert_eq!(sb.relativize(Path::new("/data/a/b.txt")).unwrap(), "a/b.txt");
        assert_eq!(sb.relativize(Path::new("/data")).unwrap(), "");
        assert!(sb.relativize(Path::new("/other/a")).is_err());
        assert!(sb.relativize(Path::new("/data/a/../../x")).is_err());
    }
}
