//! MCP request handlers: initialize and the five tools.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use memoh_exec::{CancelToken, ExecError, ExecRequest};
use memoh_fs::{FileEntry, FsError};

use super::state::McpServer;

/// Handle the `initialize` request.
pub(super) fn handle_initialize(_params: &Value) -> Value {
    json!({
        "protocolVersion": "2024-11-05",
        "capabilities": {
            "tools": {}
        },
        "serverInfo": {
            "name": "memoh-mcp",
            "version": env!("CARGO_PKG_VERSION")
        }
    })
}

/// Failure of a `tools/call`. The first two are protocol errors (`-32602`);
/// the rest are reported as tool results with `isError: true`.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for {tool}: {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Fs(#[from] FsError),

    #[error(transparent)]
    Exec(#[from] ExecError),

    #[error("Failed to encode tool output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CallError {
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, Self::UnknownTool(_) | Self::InvalidArguments { .. })
    }
}

#[derive(Debug, Deserialize)]
struct ReadInput {
    path: String,
}

#[derive(Debug, Serialize)]
struct ReadOutput {
    content: String,
}

#[derive(Debug, Deserialize)]
struct WriteInput {
    path: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct OkOutput {
    ok: bool,
}

#[derive(Debug, Deserialize)]
struct ListInput {
    #[serde(default)]
    path: String,
    #[serde(default)]
    recursive: bool,
}

#[derive(Debug, Serialize)]
struct ListOutput {
    path: String,
    entries: Vec<FileEntry>,
}

#[derive(Debug, Deserialize)]
struct EditInput {
    path: String,
    old_text: String,
    new_text: String,
}

#[derive(Debug, Deserialize)]
struct ExecInput {
    #[serde(default)]
    command: String,
    #[serde(default)]
    args: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ExecOutput {
    ok: bool,
    exit_code: i32,
    stdout: String,
    stderr: String,
}

/// Dispatch one tool call and return its structured output.
pub fn call_tool(
    server: &McpServer,
    name: &str,
    arguments: Value,
    cancel: &CancelToken,
) -> Result<Value, CallError> {
    let arguments = if arguments.is_null() { json!({}) } else { arguments };
    tracing::debug!(tool = name, "Tool call");
    match name {
        "read" => handle_read(server, parse(name, arguments)?),
        "write" => handle_write(server, parse(name, arguments)?),
        "list" => handle_list(server, parse(name, arguments)?),
        "edit" => handle_edit(server, parse(name, arguments)?),
        "exec" => handle_exec(server, parse(name, arguments)?, cancel),
        _ => Err(CallError::UnknownTool(name.to_string())),
    }
}

fn parse<T: DeserializeOwned>(tool: &str, arguments: Value) -> Result<T, CallError> {
    serde_json::from_value(arguments).map_err(|source| CallError::InvalidArguments {
        tool: tool.to_string(),
        source,
    })
}

fn to_value<T: Serialize>(output: T) -> Result<Value, CallError> {
    Ok(serde_json::to_value(output)?)
}

fn handle_read(server: &McpServer, input: ReadInput) -> Result<Value, CallError> {
    let content = memoh_fs::read_file(&server.sandbox, &input.path)?;
    to_value(ReadOutput { content })
}

fn handle_write(server: &McpServer, input: WriteInput) -> Result<Value, CallError> {
    memoh_fs::write_file(&server.sandbox, &input.path, &input.content)?;
    to_value(OkOutput { ok: true })
}

fn handle_list(server: &McpServer, input: ListInput) -> Result<Value, CallError> {
    let entries = memoh_fs::list(&server.sandbox, &input.path, input.recursive)?;
    let listed = input.path.trim();
    to_value(ListOutput {
        path: if listed.is_empty() { ".".to_string() } else { listed.to_string() },
        entries,
    })
}

fn handle_edit(server: &McpServer, input: EditInput) -> Result<Value, CallError> {
    memoh_fs::edit_file(&server.sandbox, &input.path, &input.old_text, &input.new_text)?;
    to_value(OkOutput { ok: true })
}

fn handle_exec(
    server: &McpServer,
    input: ExecInput,
    cancel: &CancelToken,
) -> Result<Value, CallError> {
    let root = server.sandbox.root();
    let request = ExecRequest {
        command: input.command,
        args: input.args,
        cwd: root.is_dir().then(|| root.to_path_buf()),
        timeout: server.exec.timeout,
    };
    let result = memoh_exec::run(&request, cancel)?;
    to_value(ExecOutput {
        ok: result.success,
        exit_code: result.exit_code,
        stdout: String::from_utf8_lossy(&result.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
    })
}
