//! File operations behind the `read`, `write` and `edit` tools.

use std::fs;
use std::io::Write;
use std::path::Path;

use memoh_core::observability;

use crate::edit::{apply_edit, apply_edit_bytes, AppliedEdit, EditError};
use crate::error::{FsError, Result};
use crate::sandbox::Sandbox;

/// Read a file as text. Invalid UTF-8 sequences become U+FFFD.
pub fn read_file(sandbox: &Sandbox, path: &str) -> Result<String> {
    let target = sandbox.resolve(path)?;
    let bytes = fs::read(&target).map_err(|e| FsError::io(&target, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Write `content` to a file, creating parent directories as needed.
/// Existing files are truncated and keep their mode.
pub fn write_file(sandbox: &Sandbox, path: &str, content: &str) -> Result<()> {
    let target = sandbox.resolve(path)?;
    if let Some(parent) = target.parent() {
        create_dirs(parent).map_err(|e| FsError::io(parent, e))?;
    }
    let mut file = open_for_write(&target).map_err(|e| FsError::io(&target, e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| FsError::io(&target, e))?;

    tracing::debug!(path = %target.display(), bytes = content.len(), "Wrote file");
    observability::audit_file_written(path, content.len());
    Ok(())
}

/// Replace the unique occurrence of `old_text` in a file with `new_text`,
/// preserving its byte-order mark, line endings and permission bits.
///
/// Files that are not valid UTF-8 are edited on raw bytes with exact matching
/// only, so their undecodable sequences survive untouched.
///
/// Concurrent edits of the same file are not serialised; the last writer wins.
pub fn edit_file(
    sandbox: &Sandbox,
    path: &str,
    old_text: &str,
    new_text: &str,
) -> Result<AppliedEdit<Vec<u8>>> {
    let target = sandbox.resolve(path)?;
    let permissions = fs::metadata(&target)
        .map_err(|e| FsError::io(&target, e))?
        .permissions();
    let bytes = fs::read(&target).map_err(|e| FsError::io(&target, e))?;

    let applied = match String::from_utf8(bytes) {
        Ok(raw) => apply_edit(&raw, old_text, new_text).map(|edit| AppliedEdit {
            content: edit.content.into_bytes(),
            match_kind: edit.match_kind,
            first_changed_line: edit.first_changed_line,
        }),
        Err(e) => {
            tracing::debug!(path, "Editing non-UTF-8 file on raw bytes");
            apply_edit_bytes(e.as_bytes(), old_text, new_text)
        }
    };
    let edit = applied.map_err(|e| {
        let err = match e {
            EditError::TextNotFound => FsError::TextNotFound {
                path: path.to_string(),
            },
            EditError::Ambiguous { count } => FsError::AmbiguousMatch {
                path: path.to_string(),
                count,
            },
            EditError::NoOp => FsError::NoOpEdit {
                path: path.to_string(),
            },
        };
        tracing::warn!(path, error = %err, "Edit rejected");
        observability::audit_edit_failed(path, &err.to_string());
        err
    })?;

    fs::write(&target, &edit.content).map_err(|e| FsError::io(&target, e))?;
    fs::set_permissions(&target, permissions).map_err(|e| FsError::io(&target, e))?;

    tracing::debug!(
        path,
        match_kind = edit.match_kind.as_str(),
        line = edit.first_changed_line,
        "Applied edit"
    );
    observability::audit_edit_applied(path, edit.match_kind.as_str(), edit.first_changed_line);
    Ok(edit)
}

#[cfg(unix)]
fn create_dirs(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o755).create(dir)
}

#[cfg(not(unix))]
fn create_dirs(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn open_for_write(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(path)
}

#[cfg(not(unix))]
fn open_for_write(path: &Path) -> std::io::Result<fs::File> {
    fs::File::create(path)
}
