//! MCP (Model Context Protocol) server over stdio.
//!
//! JSON-RPC 2.0, one message per line. Provides 5 tools: read, write, list,
//! edit, exec.
//!
//! Protocol flow:
//!   1. Client sends `initialize` → server returns capabilities
//!   2. Client sends `notifications/initialized`
//!   3. Client sends `tools/list` → server returns 5 tool definitions
//!   4. Client sends `tools/call` → tool runs on the worker pool, result is
//!      written when it finishes (responses may arrive out of order)
//!   5. Client may send `notifications/cancelled` with the `requestId` of a
//!      running call; a running `exec` is killed.
//!
//! A single writer thread owns the output stream. On EOF the server waits for
//! in-flight calls before returning.

mod handlers;
mod state;
mod tools;


use anyhow::Result;
use serde_json::{json, Value};
use std::io::{self, BufRead, BufReader, Write};
use std::sync::{mpsc, Arc};
use std::thread;

pub use handlers::{call_tool, CallError};
pub use state::McpServer;
pub use tools::get_mcp_tools;

use handlers::handle_initialize;

/// Maximum JSON-RPC request size (10 MB) to prevent OOM DoS.
const MAX_REQUEST_SIZE: usize = 10 * 1024 * 1024;

// ═══════════════════════════════════════════════════════════════════════════════
// Size-Limited Reader
// ═══════════════════════════════════════════════════════════════════════════════

/// Read a single line from `reader`, enforcing [`MAX_REQUEST_SIZE`].
/// Returns `Ok(None)` on EOF, `Ok(Some(line))` on success.
/// Oversized lines are skipped (bytes discarded) and an error is returned.
fn read_line_limited(reader: &mut impl BufRead) -> io::Result<Option<String>> {
    read_line_with_limit(reader, MAX_REQUEST_SIZE)
}

fn read_line_with_limit(reader: &mut impl BufRead, limit: usize) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    loop {
        let available = match reader.fill_buf() {
            Ok(b) => b,
            Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if available.is_empty() {
            return if buf.is_empty() {
                Ok(None)
            } else {
                finish_line(buf).map(Some)
            };
        }
        match available.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                if buf.len() + pos > limit {
                    reader.consume(pos + 1);
                    return Err(oversized());
                }
                buf.extend_from_slice(&available[..pos]);
                reader.consume(pos + 1);
                return finish_line(buf).map(Some);
            }
            None => {
                let len = available.len();
                if buf.len() + len > limit {
                    reader.consume(len);
                    skip_until_newline(reader);
                    return Err(oversized());
                }
                buf.extend_from_slice(available);
                reader.consume(len);
            }
        }
    }
}

fn finish_line(mut buf: Vec<u8>) -> io::Result<String> {
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    String::from_utf8(buf).map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "Invalid UTF-8"))
}

fn oversized() -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, "Request exceeds 10MB size limit")
}

/// Discard bytes from `reader` until a newline or EOF, using only the
/// internal buffer (no heap allocation for the discarded data).
fn skip_until_newline(reader: &mut impl BufRead) {
    loop {
        match reader.fill_buf() {
            Ok(b) if b.is_empty() => break,
            Ok(b) => {
                if let Some(pos) = b.iter().position(|&c| c == b'\n') {
                    reader.consume(pos + 1);
                    break;
                }
                let len = b.len();
                reader.consume(len);
            }
            Err(_) => break,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// MCP Protocol: Main Server Loop
// ═══════════════════════════════════════════════════════════════════════════════

/// Run the MCP server on the process's stdin/stdout.
///
/// This is the entry point for `memoh-mcp serve`.
pub fn serve_stdio(server: McpServer) -> Result<()> {
    let stdin = io::stdin();
    serve(Arc::new(server), BufReader::new(stdin.lock()), io::stdout())
}

/// Run the MCP loop over arbitrary streams until `reader` reaches EOF.
pub fn serve<R, W>(server: Arc<McpServer>, mut reader: R, writer: W) -> Result<()>
where
    R: BufRead,
    W: Write + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<Value>();

    // Writer thread: the only place that touches the output stream
    let writer_handle = thread::spawn(move || -> Result<()> {
        let mut writer = writer;
        for message in rx {
            writeln!(writer, "{}", message)?;
            writer.flush()?;
        }
        Ok(())
    });

    let (done_tx, done_rx) = mpsc::channel::<()>();
    let mut pending = 0usize;

    loop {
        let line = match read_line_limited(&mut reader) {
            Ok(None) => break, // EOF
            Ok(Some(l)) => l,
            Err(e) => {
                tracing::warn!(error = %e, "Rejected request");
                let err = json!({"code": -32600, "message": format!("Request size error: {}", e)});
                let _ = tx.send(response(Value::Null, Err(err)));
                continue;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                let err = json!({"code": -32700, "message": format!("Parse error: {}", e)});
                let _ = tx.send(response(Value::Null, Err(err)));
                continue;
            }
        };

        let id = request.get("id").cloned();
        let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("");
        let params = request.get("params").cloned().unwrap_or(json!({}));

        match method {
            // ─── Lifecycle ──────────────────────────────────────────────
            "initialize" => {
                let result = handle_initialize(&params);
                let _ = tx.send(response(id.unwrap_or(Value::Null), Ok(result)));
            }
            "notifications/initialized" | "initialized" => {
                // Notification, no response
            }
            "ping" => {
                let _ = tx.send(response(id.unwrap_or(Value::Null), Ok(json!({}))));
            }
            "notifications/cancelled" => {
                let target = params.get("requestId").cloned().unwrap_or(Value::Null);
                let found = server.cancel_call(&target);
                tracing::debug!(request_id = %target, found, "Cancellation requested");
            }

            // ─── Tools ─────────────────────────────────────────────────
            "tools/list" => {
                let result = json!({ "tools": get_mcp_tools() });
                let _ = tx.send(response(id.unwrap_or(Value::Null), Ok(result)));
            }
            "tools/call" => {
                let id = id.unwrap_or(Value::Null);
                let name = params
                    .get("name")
                    .and_then(|n| n.as_str())
                    .unwrap_or("")
                    .to_string();
                let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
                let Some(cancel) = server.begin_call(&id) else {
                    tracing::warn!(request_id = %id, "Duplicate in-flight request id");
                    let err = json!({
                        "code": -32600,
                        "message": format!("Request id already in flight: {}", id)
                    });
                    let _ = tx.send(response(id, Err(err)));
                    continue;
                };

                pending += 1;
                let server = Arc::clone(&server);
                let tx = tx.clone();
                let done_tx = done_tx.clone();
                rayon::spawn(move || {
                    let result = call_tool(&server, &name, arguments, &cancel);
                    server.finish_call(&id);
                    let _ = tx.send(response(id, tool_result(&name, result)));
                    let _ = done_tx.send(());
                });
            }

            // ─── Resources / Prompts (none offered) ─────────────────────
            "resources/list" => {
                let _ = tx.send(response(id.unwrap_or(Value::Null), Ok(json!({"resources": []}))));
            }
            "prompts/list" => {
                let _ = tx.send(response(id.unwrap_or(Value::Null), Ok(json!({"prompts": []}))));
            }

            // ─── Unknown ────────────────────────────────────────────────
            _ => {
                if let Some(id) = id {
                    let err = json!({
                        "code": -32601,
                        "message": format!("Method not found: {}", method)
                    });
                    let _ = tx.send(response(id, Err(err)));
                }
                // Notifications (no id) are ignored
            }
        }
    }

    for _ in 0..pending {
        let _ = done_rx.recv();
    }
    drop(tx);
    writer_handle
        .join()
        .map_err(|_| anyhow::anyhow!("Writer thread panicked"))??;

    Ok(())
}

/// Map a tool outcome onto the `tools/call` result, or a JSON-RPC error for
/// unknown tools and malformed arguments.
fn tool_result(name: &str, result: Result<Value, CallError>) -> Result<Value, Value> {
    match result {
        Ok(output) => Ok(json!({
            "content": [{"type": "text", "text": output.to_string()}],
            "structuredContent": output,
            "isError": false
        })),
        Err(e) if e.is_protocol_error() => Err(json!({"code": -32602, "message": e.to_string()})),
        Err(e) => {
            tracing::info!(tool = name, error = %e, "Tool call failed");
            Ok(json!({
                "content": [{"type": "text", "text": format!("Error: {}", e)}],
                "isError": true
            }))
        }
    }
}

/// Build a JSON-RPC 2.0 response.
fn response(id: Value, result: Result<Value, Value>) -> Value {
    match result {
        Ok(res) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": res
        }),
        Err(err) => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": err
        }),
    }
}
