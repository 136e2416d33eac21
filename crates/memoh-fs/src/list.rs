//! Directory enumeration under the sandbox.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use walkdir::WalkDir;

use crate::error::{FsError, Result};
use crate::sandbox::Sandbox;

/// One listed entry. `path` is sandbox-relative with `/` separators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
    /// Permission bits only (`0o777` mask on Unix).
    pub mode: u32,
    pub mod_time: DateTime<Utc>,
}

/// List `path` (blank means the root). Children are sorted by name; with
/// `recursive` the whole subtree is returned in walk order, excluding the
/// directory itself. Any failure during the walk aborts the listing.
pub fn list(sandbox: &Sandbox, path: &str, recursive: bool) -> Result<Vec<FileEntry>> {
    let target = sandbox.resolve_allow_root(path)?;
    let meta = fs::metadata(&target).map_err(|e| FsError::io(&target, e))?;
    if !meta.is_dir() {
        return Err(FsError::NotADirectory(path.trim().to_string()));
    }

    let mut entries = Vec::new();
    if recursive {
        for entry in WalkDir::new(&target).min_depth(1).sort_by_file_name() {
            let entry = entry?;
            let meta = entry.metadata()?;
            entries.push(entry_for_path(sandbox, entry.path(), &meta)?);
        }
    } else {
        let mut children = fs::read_dir(&target)
            .map_err(|e| FsError::io(&target, e))?
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| FsError::io(&target, e))?;
        children.sort_by_key(|c| c.file_name());
        for child in children {
            let child_path = child.path();
            let meta = child.metadata().map_err(|e| FsError::io(&child_path, e))?;
            entries.push(entry_for_path(sandbox, &child_path, &meta)?);
        }
    }

    tracing::debug!(path = %target.display(), recursive, count = entries.len(), "Listed directory");
    Ok(entries)
}

fn entry_for_path(sandbox: &Sandbox, path: &Path, meta: &fs::Metadata) -> Result<FileEntry> {
    let mod_time = meta.modified().map_err(|e| FsError::io(path, e))?;
    Ok(FileEntry {
        path: sandbox.relativize(path)?,
        is_dir: meta.is_dir(),
        size: meta.len(),
        mode: permission_bits(meta),
        mod_time: DateTime::<Utc>::from(mod_time),
    })
}

#[cfg(unix)]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o777
}

#[cfg(not(unix))]
fn permission_bits(meta: &fs::Metadata) -> u32 {
    if meta.permissions().readonly() {
        0o444
    } else {
        0o666
    }
}
