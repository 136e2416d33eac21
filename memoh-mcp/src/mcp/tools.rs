//! MCP tool definitions for `tools/list`.

use serde_json::{json, Value};

pub fn get_mcp_tools() -> Vec<Value> {
    vec![
        json!({
            "name": "read",
            "description": "read file content",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "File path relative to the data directory"
                    }
                },
                "required": ["path"]
            }
        }),
        json!({
            "name": "write",
            "description": "write file content",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "File path relative to the data directory; missing parent directories are created"
                    },
                    "content": {
                        "type": "string",
                        "description": "Full file content. Existing files are overwritten"
                    }
                },
                "required": ["path", "content"]
            }
        }),
        json!({
            "name": "list",
            "description": "list directory entries",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Directory relative to the data directory (default: the data directory itself)"
                    },
                    "recursive": {
                        "type": "boolean",
                        "description": "Include the whole subtree (default: false)"
                    }
                }
            }
        }),
        json!({
            "name": "edit",
            "description": "replace exact text in a file",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "File path relative to the data directory"
                    },
                    "old_text": {
                        "type": "string",
                        "description": "Text to replace. Must occur exactly once; quote style and trailing spaces are tolerated"
                    },
                    "new_text": {
                        "type": "string",
                        "description": "Replacement text"
                    }
                },
                "required": ["path", "old_text", "new_text"]
            }
        }),
        json!({
            "name": "exec",
            "description": "execute command",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "Program to run (no shell)"
                    },
                    "args": {
                        "type": "array",
                        "items": {"type": "string"},
                        "description": "Program arguments"
                    }
                },
                "required": ["command"]
            }
        }),
    ]
}
