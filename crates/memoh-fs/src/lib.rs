//! Sandboxed file operations.
//!
//! Every operation resolves its request path through [`Sandbox`] first. The
//! edit pipeline is: [`normalize`] (split BOM, detect line ending, canonical LF)
//! → [`fuzzy`] (exact, then folded match) → splice → [`normalize`] in reverse.

pub mod edit;
mod error;
pub mod fuzzy;
pub mod list;
pub mod normalize;
mod ops;
mod sandbox;

pub use edit::{apply_edit, apply_edit_bytes, AppliedEdit, EditError};
pub use error::{ErrorKind, FsError, Result};
pub use fuzzy::{find_text, fold, MatchKind, TextMatch};
pub use list::{list, FileEntry};
pub use normalize::{LineEnding, BOM};
pub use ops::{edit_file, read_file, write_file};
pub use sandbox::Sandbox;
