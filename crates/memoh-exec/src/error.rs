use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExecError>;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("command is required")]
    InvalidCommand,

    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("command cancelled: {reason}")]
    Cancelled { reason: String },
}
