//! Canned behaviour for the fake gateway
//!
//! ```ignore
//! let script = ScriptBuilder::new()
//!     .text("list_accounts", "work\npersonal")
//!     .structured("get_email", json!({"subject": "Hi", "body": "..."}))
//!     .build();
//! ```
//!
//! Tools with no entry answer with a JSON-RPC "unknown tool" error.

use serde_json::{Value, json};
use std::collections::HashMap;

/// How the server answers `initialize`.
#[derive(Debug, Clone)]
pub enum Handshake {
    Accept,
    /// Answer 200 with a JSON-RPC error object.
    Error { code: i64, message: String },
    /// Answer with this HTTP status line (e.g. `503 Service Unavailable`).
    Status(String),
}

/// How the server answers one tool.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Send this value as the JSON-RPC `result`.
    Result(Value),
    /// Send a JSON-RPC error object.
    Error { code: i64, message: String },
    /// Hold the request open without answering.
    Stall,
}

#[derive(Debug, Clone)]
pub struct Script {
    pub session_id: Option<String>,
    pub event_stream: bool,
    pub handshake: Handshake,
    pub tools: HashMap<String, Reply>,
}

impl Script {
    pub fn reply(&self, tool: &str) -> Reply {
        self.tools.get(tool).cloned().unwrap_or_else(|| Reply::Error {
            code: -32602,
            message: format!("Unknown tool: {tool}"),
        })
    }
}

pub struct ScriptBuilder {
    script: Script,
}

impl Default for ScriptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self {
            script: Script {
                session_id: Some("fake-session-1".to_string()),
                event_stream: false,
                handshake: Handshake::Accept,
                tools: HashMap::new(),
            },
        }
    }

    /// Do not hand out a session id on `initialize`.
    pub fn without_session(mut self) -> Self {
        self.script.session_id = None;
        self
    }

    /// Answer every request as a `text/event-stream` body.
    pub fn event_stream(mut self) -> Self {
        self.script.event_stream = true;
        self
    }

    /// Reject `initialize` with a JSON-RPC error.
    pub fn handshake_error(mut self, code: i64, message: &str) -> Self {
        self.script.handshake = Handshake::Error {
            code,
            message: message.to_string(),
        };
        self
    }

    /// Reject `initialize` at the HTTP level.
    pub fn handshake_status(mut self, status: &str) -> Self {
        self.script.handshake = Handshake::Status(status.to_string());
        self
    }

    /// A result with a single text block.
    pub fn text(self, tool: &str, text: &str) -> Self {
        self.result(
            tool,
            json!({ "content": [{ "type": "text", "text": text }], "isError": false }),
        )
    }

    /// A result whose structured payload is also rendered as text.
    pub fn structured(self, tool: &str, value: Value) -> Self {
        let text = value.to_string();
        self.result(
            tool,
            json!({
                "content": [{ "type": "text", "text": text }],
                "structuredContent": value,
                "isError": false
            }),
        )
    }

    /// A tool-level failure (`isError: true`).
    pub fn tool_error(self, tool: &str, text: &str) -> Self {
        self.result(
            tool,
            json!({ "content": [{ "type": "text", "text": text }], "isError": true }),
        )
    }

    pub fn result(mut self, tool: &str, value: Value) -> Self {
        self.script
            .tools
            .insert(tool.to_string(), Reply::Result(value));
        self
    }

    pub fn rpc_error(mut self, tool: &str, code: i64, message: &str) -> Self {
        self.script.tools.insert(
            tool.to_string(),
            Reply::Error {
                code,
                message: message.to_string(),
            },
        );
        self
    }

    pub fn stall(mut self, tool: &str) -> Self {
        self.script.tools.insert(tool.to_string(), Reply::Stall);
        self
    }

    pub fn build(self) -> Script {
        self.script
    }
}
