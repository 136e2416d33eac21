use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Memoh MCP - sandboxed file and process tools over stdio
#[derive(Parser, Debug)]
#[command(name = "memoh-mcp")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the MCP server over stdio (JSON-RPC 2.0, one message per line)
    Serve {
        /// Sandbox root (default: MEMOH_DATA_DIR / MCP_DATA_DIR, else /data)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Kill exec subprocesses after this many seconds, 0 disables (default: MEMOH_EXEC_TIMEOUT_SECS)
        #[arg(long, value_name = "SECS")]
        exec_timeout: Option<u64>,
    },

    /// Invoke one tool directly and print its output JSON
    Call {
        /// Tool name: read, write, list, edit or exec
        #[arg(value_name = "TOOL")]
        tool: String,

        /// Arguments as a JSON object. Use "-" to read from stdin
        #[arg(value_name = "ARGS_JSON")]
        args_json: String,

        /// Sandbox root (default: MEMOH_DATA_DIR / MCP_DATA_DIR, else /data)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,

        /// Kill exec subprocesses after this many seconds, 0 disables
        #[arg(long, value_name = "SECS")]
        exec_timeout: Option<u64>,
    },

    /// Print the tool definitions as JSON
    Tools,
}
