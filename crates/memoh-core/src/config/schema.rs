//! Typed configuration structs, grouped by concern.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::env_keys::{exec as exec_keys, observability as obv_keys, paths};
use super::loader::{env_bool, env_optional, env_or, load_dotenv};

/// Directory used as sandbox root when nothing is configured.
pub const DEFAULT_DATA_DIR: &str = "/data";

/// Sandbox root configuration. Immutable once the server starts; every tool
/// path is interpreted relative to `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxConfig {
    pub root: PathBuf,
}

impl SandboxConfig {
    /// Load from `MEMOH_DATA_DIR` (alias `MCP_DATA_DIR`), defaulting to [`DEFAULT_DATA_DIR`].
    pub fn from_env() -> Self {
        load_dotenv();
        let root = env_or(paths::MEMOH_DATA_DIR, paths::DATA_DIR_ALIASES, || {
            DEFAULT_DATA_DIR.to_string()
        });
        Self::with_root(root)
    }

    /// Build from an explicit root. Relative roots are anchored at the
    /// current working directory.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let root = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(root))
                .unwrap_or_else(|_| root.to_path_buf())
        };
        Self { root }
    }
}

/// Subprocess execution limits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecConfig {
    /// Kill the subprocess after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

impl ExecConfig {
    pub fn from_env() -> Self {
        load_dotenv();
        let timeout = env_optional(exec_keys::MEMOH_EXEC_TIMEOUT_SECS, &[]).and_then(|raw| {
            match raw.parse::<u64>() {
                Ok(secs) => Self::timeout_from_secs(secs),
                Err(_) => {
                    tracing::warn!(
                        value = %raw,
                        "Ignoring invalid {}",
                        exec_keys::MEMOH_EXEC_TIMEOUT_SECS
                    );
                    None
                }
            }
        });
        Self { timeout }
    }

    /// Apply a CLI override; `Some(0)` disables the limit.
    pub fn with_timeout_override(mut self, secs: Option<u64>) -> Self {
        if let Some(secs) = secs {
            self.timeout = Self::timeout_from_secs(secs);
        }
        self
    }

    fn timeout_from_secs(secs: u64) -> Option<Duration> {
        (secs > 0).then(|| Duration::from_secs(secs))
    }
}

/// Observability: quiet, log_level, log_json, audit_log.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    pub quiet: bool,
    pub log_level: String,
    pub log_json: bool,
    pub audit_log: Option<String>,
}

impl ObservabilityConfig {
    pub fn from_env() -> &'static Self {
        use std::sync::OnceLock;
        static CACHE: OnceLock<ObservabilityConfig> = OnceLock::new();
        CACHE.get_or_init(|| {
            load_dotenv();
            Self {
                quiet: env_bool(obv_keys::MEMOH_QUIET, &[], false),
                log_level: env_or(obv_keys::MEMOH_LOG_LEVEL, &[], || {
                    "memoh=info".to_string()
                }),
                log_json: env_bool(obv_keys::MEMOH_LOG_JSON, &[], false),
                audit_log: env_optional(obv_keys::MEMOH_AUDIT_LOG, &[]),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sandbox_config_keeps_absolute_root() {
        let cfg = SandboxConfig::with_root("/srv/memoh");
        assert_eq!(cfg.root, PathBuf::from("/srv/memoh"));
    }

    #[test]
    fn test_sandbox_config_anchors_relative_root() {
        let cfg = SandboxConfig::with_root("data");
        assert!(cfg.root.is_absolute());
        assert!(cfg.root.ends_with("data"));
    }

    #[test]
    fn test_exec_timeout_override() {
        let cfg = ExecConfig::default().with_timeout_override(Some(5));
        assert_eq!(cfg.timeout, Some(Duration::from_secs(5)));
        let cfg = cfg.with_timeout_override(Some(0));
        assert_eq!(cfg.timeout, None);
        let cfg = ExecConfig {
            timeout: Some(Duration::from_secs(9)),
        }
        .with_timeout_override(None);
        assert_eq!(cfg.timeout, Some(Duration::from_secs(9)));
    }
}
