//! memoh-mcp: MCP server over stdio exposing `read`, `write`, `list`, `edit`
//! and `exec`, all confined to one sandbox root.

mod cli;
pub mod mcp;

use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::{json, Value};

use cli::{Cli, Commands};
use memoh_core::config::{self, ExecConfig, SandboxConfig};
use memoh_core::observability;
use memoh_exec::CancelToken;
use mcp::McpServer;

/// Parse arguments and run the selected command. No subcommand means `serve`.
pub fn run_cli() -> Result<()> {
    config::load_dotenv();
    observability::init_tracing();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Serve {
        root: None,
        exec_timeout: None,
    }) {
        Commands::Serve { root, exec_timeout } => {
            let server = build_server(root, exec_timeout);
            mcp::serve_stdio(server)
        }
        Commands::Call {
            tool,
            args_json,
            root,
            exec_timeout,
        } => {
            let server = build_server(root, exec_timeout);
            let output = call_once(&server, &tool, &args_json)?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Commands::Tools => {
            let tools = json!({ "tools": mcp::get_mcp_tools() });
            println!("{}", serde_json::to_string_pretty(&tools)?);
            Ok(())
        }
    }
}

fn build_server(root: Option<PathBuf>, exec_timeout: Option<u64>) -> McpServer {
    let sandbox = match root {
        Some(dir) => SandboxConfig::with_root(dir),
        None => SandboxConfig::from_env(),
    };
    let exec = ExecConfig::from_env().with_timeout_override(exec_timeout);
    tracing::info!(root = %sandbox.root.display(), timeout = ?exec.timeout, "Sandbox configured");
    McpServer::new(&sandbox, exec)
}

fn call_once(server: &McpServer, tool: &str, args_json: &str) -> Result<Value> {
    let raw = if args_json == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read arguments from stdin")?;
        buf
    } else {
        args_json.to_string()
    };
    let arguments: Value = serde_json::from_str(&raw).context("Arguments must be a JSON object")?;
    mcp::call_tool(server, tool, arguments, &CancelToken::new())
        .with_context(|| format!("Tool '{}' failed", tool))
}
