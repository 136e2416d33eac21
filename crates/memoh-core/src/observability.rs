//! Observability: tracing init and the JSONL audit log.
//!
//! Uses config::ObservabilityConfig for MEMOH_QUIET, MEMOH_LOG_LEVEL,
//! MEMOH_LOG_JSON and MEMOH_AUDIT_LOG. Log lines go to stderr; stdout carries
//! the protocol.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Utc;
use serde_json::json;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::ObservabilityConfig;

static AUDIT_PATH: Mutex<Option<String>> = Mutex::new(None);

/// Initialize tracing. Call once at process startup.
/// When MEMOH_QUIET=1 only WARN and above are logged.
pub fn init_tracing() {
    let cfg = ObservabilityConfig::from_env();
    let level = if cfg.quiet {
        "memoh=warn".to_string()
    } else {
        cfg.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    };
}

fn get_audit_path() -> Option<String> {
    {
        let guard = AUDIT_PATH.lock().ok()?;
        if let Some(ref p) = *guard {
            return Some(p.clone());
        }
    }
    let path = ObservabilityConfig::from_env().audit_log.clone()?;
    if let Some(parent) = Path::new(&path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    {
        let mut guard = AUDIT_PATH.lock().ok()?;
        *guard = Some(path.clone());
    }
    Some(path)
}

fn append_jsonl(path: &str, record: &serde_json::Value) {
    if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
        if let Ok(line) = serde_json::to_string(record) {
            let _ = writeln!(f, "{}", line);
        }
    }
}

fn emit(record: serde_json::Value) {
    if let Some(path) = get_audit_path() {
        append_jsonl(&path, &record);
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Audit: edit_applied
pub fn audit_edit_applied(path: &str, match_kind: &str, first_changed_line: usize) {
    emit(json!({
        "ts": now(),
        "event": "edit_applied",
        "path": path,
        "match_kind": match_kind,
        "first_changed_line": first_changed_line
    }));
}

/// Audit: edit_failed
pub fn audit_edit_failed(path: &str, reason: &str) {
    emit(json!({
        "ts": now(),
        "event": "edit_failed",
        "path": path,
        "reason": reason
    }));
}

/// Audit: file_written
pub fn audit_file_written(path: &str, bytes: usize) {
    emit(json!({
        "ts": now(),
        "event": "file_written",
        "path": path,
        "bytes": bytes
    }));
}

/// Audit: exec_completed (non-zero exits included)
pub fn audit_exec_completed(command: &str, exit_code: i32, duration_ms: u64) {
    emit(json!({
        "ts": now(),
        "event": "exec_completed",
        "command": command,
        "exit_code": exit_code,
        "duration_ms": duration_ms,
        "success": exit_code == 0
    }));
}

/// Audit: exec_cancelled (caller cancellation or timeout)
pub fn audit_exec_cancelled(command: &str, reason: &str) {
    tracing::warn!(command = %command, reason = %reason, "Subprocess terminated");
    emit(json!({
        "ts": now(),
        "event": "exec_cancelled",
        "command": command,
        "reason": reason
    }));
}
