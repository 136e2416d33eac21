//! MCP server state shared by the reader loop and worker threads.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde_json::Value;

use memoh_core::config::{ExecConfig, SandboxConfig};
use memoh_exec::CancelToken;
use memoh_fs::Sandbox;

/// Immutable configuration plus the registry of in-flight `tools/call` requests.
pub struct McpServer {
    pub sandbox: Sandbox,
    pub exec: ExecConfig,
    /// JSON-encoded request id → cancellation token of the running call.
    in_flight: Mutex<HashMap<String, CancelToken>>,
}

impl McpServer {
    pub fn new(sandbox: &SandboxConfig, exec: ExecConfig) -> Self {
        Self {
            sandbox: Sandbox::from_config(sandbox),
            exec,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Register a call under `id` and return its token. Returns `None` while
    /// another call with the same id is still running.
    pub fn begin_call(&self, id: &Value) -> Option<CancelToken> {
        let mut guard = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.entry(request_key(id)) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => Some(slot.insert(CancelToken::new()).clone()),
        }
    }

    pub fn finish_call(&self, id: &Value) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&request_key(id));
    }

    /// Fire the token registered under `id`. Returns false when no such call
    /// is running (already finished, or never existed).
    pub fn cancel_call(&self, id: &Value) -> bool {
        let guard = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.get(&request_key(id)) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// `1` and `"1"` are distinct JSON-RPC ids, so key by their JSON encoding.
fn request_key(id: &Value) -> String {
    id.to_string()
}
