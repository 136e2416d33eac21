use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FsError>;

/// Errors from sandboxed file operations.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("invalid path '{0}': paths must be relative to the data directory and must not escape it")]
    InvalidPath(String),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("path is not a directory: {0}")]
    NotADirectory(String),

    #[error("failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("could not find the exact text in {path}. the old text must match exactly including all whitespace and newlines")]
    TextNotFound { path: String },

    #[error("found {count} occurrences of the text in {path}. the text must be unique. please provide more context to make it unique")]
    AmbiguousMatch { path: String, count: usize },

    #[error("no changes made to {path}. the replacement produced identical content. this might indicate an issue with special characters or the text not existing as expected")]
    NoOpEdit { path: String },
}

/// Coarse classification of [`FsError`], for callers that report a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidPath,
    NotFound,
    Io,
    TextNotFound,
    AmbiguousMatch,
    NoOpEdit,
}

impl FsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPath(_) => ErrorKind::InvalidPath,
            Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound => {
                ErrorKind::NotFound
            }
            Self::Walk(e)
                if e.io_error()
                    .is_some_and(|io| io.kind() == std::io::ErrorKind::NotFound) =>
            {
                ErrorKind::NotFound
            }
            Self::Io { .. } | Self::NotADirectory(_) | Self::Walk(_) => ErrorKind::Io,
            Self::TextNotFound { .. } => ErrorKind::TextNotFound,
            Self::AmbiguousMatch { .. } => ErrorKind::AmbiguousMatch,
            Self::NoOpEdit { .. } => ErrorKind::NoOpEdit,
        }
    }
}
