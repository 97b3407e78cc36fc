//! In-process fake MCP gateway
//!
//! ## Request lifecycle
//!
//! ```text
//!   POST /mcp  {"method":"initialize", "id":1}
//!   <- 200, Mcp-Session-Id: fake-session-1, {"result":{"protocolVersion":...}}
//!   POST /mcp  {"method":"notifications/initialized"}   (no id)
//!   <- 202 Accepted
//!   POST /mcp  {"method":"tools/call", "id":2, "params":{"name":...}}
//!   <- 200, {"result": <scripted tool result>}
//! ```
//!
//! Every request is recorded so tests can assert on what the client
//! actually sent (and on what it did *not* send).

use super::io::{HttpRequest, read_request, write_response};
use super::script::{Handshake, Reply, Script};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::{TcpListener, TcpStream};

/// One request as the server saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Value,
}

impl Recorded {
    pub fn method(&self) -> &str {
        self.body["method"].as_str().unwrap_or("")
    }
}

pub struct FakeRpcServer {
    port: u16,
    log: Arc<Mutex<Vec<Recorded>>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl FakeRpcServer {
    /// Bind to `127.0.0.1:0` and serve the script until dropped.
    pub async fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind to ephemeral port");
        let port = listener.local_addr().unwrap().port();

        let script = Arc::new(script);
        let log = Arc::new(Mutex::new(Vec::new()));

        let task_log = log.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, _addr)) = listener.accept().await else {
                    break;
                };
                let script = script.clone();
                let log = task_log.clone();
                tokio::spawn(async move {
                    handle_connection(stream, &script, &log).await;
                });
            }
        });

        Self {
            port,
            log,
            _handle: handle,
        }
    }

    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Base URL without a path, as a user would pass to `--server`.
    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.log.lock().unwrap().clone()
    }

    /// `params` of every `tools/call` request, in arrival order.
    pub fn tool_calls(&self) -> Vec<Value> {
        self.requests()
            .into_iter()
            .filter(|r| r.method() == "tools/call")
            .map(|r| r.body["params"].clone())
            .collect()
    }
}

async fn handle_connection(stream: TcpStream, script: &Script, log: &Mutex<Vec<Recorded>>) {
    let mut reader = BufReader::new(stream);

    while let Some(request) = read_request(&mut reader).await {
        let Some(body) = record(&request, log) else {
            write_response(&mut reader, "400 Bad Request", &[], "")
                .await
                .ok();
            continue;
        };

        let written = match dispatch(&body, script).await {
            Dispatch::Accepted => write_response(&mut reader, "202 Accepted", &[], "").await,
            Dispatch::Status(status) => {
                write_response(&mut reader, &status, &[], "gateway unavailable").await
            }
            Dispatch::Message { message, session } => {
                let mut headers = Vec::new();
                if session && let Some(id) = &script.session_id {
                    headers.push(("Mcp-Session-Id", id.clone()));
                }
                let payload = if script.event_stream {
                    headers.push(("Content-Type", "text/event-stream".to_string()));
                    format!("event: message\ndata: {message}\n\n")
                } else {
                    headers.push(("Content-Type", "application/json".to_string()));
                    message.to_string()
                };
                write_response(&mut reader, "200 OK", &headers, &payload).await
            }
        };
        if written.is_err() {
            break;
        }
    }
}

fn record(request: &HttpRequest, log: &Mutex<Vec<Recorded>>) -> Option<Value> {
    let body: Value = serde_json::from_slice(&request.body).ok()?;
    log.lock().unwrap().push(Recorded {
        path: request.path.clone(),
        headers: request.headers.clone(),
        body: body.clone(),
    });
    Some(body)
}

enum Dispatch {
    Accepted,
    Status(String),
    Message { message: Value, session: bool },
}

async fn dispatch(body: &Value, script: &Script) -> Dispatch {
    let id = body.get("id").cloned();
    let method = body["method"].as_str().unwrap_or("");

    let Some(id) = id else {
        return Dispatch::Accepted;
    };

    match method {
        "initialize" => match &script.handshake {
            Handshake::Accept => Dispatch::Message {
                message: json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": {
                        "protocolVersion": "2025-03-26",
                        "capabilities": { "tools": {} },
                        "serverInfo": { "name": "fake-gateway", "version": "0.0.1" }
                    }
                }),
                session: true,
            },
            Handshake::Error { code, message } => Dispatch::Message {
                message: json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": code, "message": message }
                }),
                session: false,
            },
            Handshake::Status(status) => Dispatch::Status(status.clone()),
        },
        "tools/call" => {
            let tool = body["params"]["name"].as_str().unwrap_or("");
            let message = match script.reply(tool) {
                Reply::Result(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
                Reply::Error { code, message } => json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": code, "message": message }
                }),
                Reply::Stall => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    json!({ "jsonrpc": "2.0", "id": id, "result": { "content": [] } })
                }
            };
            Dispatch::Message {
                message,
                session: false,
            }
        }
        other => Dispatch::Message {
            message: json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": format!("Method not found: {other}") }
            }),
            session: false,
        },
    }
}
