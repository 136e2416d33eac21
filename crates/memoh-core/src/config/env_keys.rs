//! Environment variable keys and alias chains.
//!
//! Primary variables use the `MEMOH_*` prefix; aliases are read in order
//! when the primary is unset.

/// Sandbox root for every tool path.
pub mod paths {
    pub const MEMOH_DATA_DIR: &str = "MEMOH_DATA_DIR";
    pub const DATA_DIR_ALIASES: &[&str] = &["MCP_DATA_DIR"];
}

/// Subprocess execution.
pub mod exec {
    /// Wall-clock limit in seconds; 0 or unset disables it.
    pub const MEMOH_EXEC_TIMEOUT_SECS: &str = "MEMOH_EXEC_TIMEOUT_SECS";
}

/// Logging and audit trail.
pub mod observability {
    pub const MEMOH_QUIET: &str = "MEMOH_QUIET";
    pub const MEMOH_LOG_LEVEL: &str = "MEMOH_LOG_LEVEL";
    pub const MEMOH_LOG_JSON: &str = "MEMOH_LOG_JSON";
    pub const MEMOH_AUDIT_LOG: &str = "MEMOH_AUDIT_LOG";
}
