//! Run one external command per call, capturing stdout and stderr.
//!
//! A non-zero exit is a normal [`ExecResult`]; only failures to start or wait
//! for the process, and cancellation, are [`ExecError`]s.

mod cancel;
mod error;
mod runner;

pub use cancel::CancelToken;
pub use error::{ExecError, Result};
pub use runner::{run, ExecRequest, ExecResult};
