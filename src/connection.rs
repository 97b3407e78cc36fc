//! JSON-RPC session with the gateway
//!
//! One [`ServerConnection`] lives for one CLI invocation. The first
//! tool call triggers the `initialize` handshake; after that every
//! request carries the negotiated session id. Nothing is retried: a
//! failed request is surfaced to the caller as-is.

use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::rpc::{self, PROTOCOL_VERSION, Request};
use crate::tool::{ToolCall, ToolResult};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};
use url::Url;

/// Header carrying the server-assigned session id.
pub const SESSION_HEADER: &str = "mcp-session-id";

const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";
const ACCEPT_VALUE: &str = "application/json, text/event-stream";
const CLIENT_NAME: &str = "rnoe-client";

/// State negotiated by the handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub session_id: Option<String>,
    pub protocol_version: String,
    pub server_name: Option<String>,
    pub server_version: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeResult {
    protocol_version: Option<String>,
    server_info: Option<ServerInfo>,
}

#[derive(Debug, Deserialize)]
struct ServerInfo {
    name: Option<String>,
    version: Option<String>,
}

struct RawResponse {
    headers: HeaderMap,
    body: String,
}

/// Single-session JSON-RPC client over HTTP
pub struct ServerConnection {
    config: ServerConfig,
    endpoint: Url,
    http: reqwest::Client,
    session: Option<Session>,
    next_id: u64,
}

impl ServerConnection {
    /// Build a connection; no network traffic happens until the first
    /// call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the HTTP client cannot be
    /// constructed.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Connection(format!("Cannot build HTTP client: {e}")))?;
        let endpoint = config.endpoint();

        Ok(Self {
            config,
            endpoint,
            http,
            session: None,
            next_id: 1,
        })
    }

    #[must_use]
    pub const fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The negotiated session, once the handshake has happened.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Perform the `initialize` handshake.
    ///
    /// Runs at most once per connection; later calls return the
    /// session negotiated the first time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] on transport failure and
    /// [`Error::Protocol`] when the server answers with a JSON-RPC
    /// error or a malformed payload.
    pub async fn handshake(&mut self) -> Result<&Session> {
        if self.session.is_none() {
            let session = self.initialize().await?;
            self.session = Some(session);
        }
        self.session
            .as_ref()
            .ok_or_else(|| Error::protocol(rpc::INTERNAL_ERROR, "Handshake produced no session"))
    }

    /// Invoke one tool and return its result.
    ///
    /// Performs the handshake first if it has not happened yet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] on transport failure and
    /// [`Error::Protocol`] for JSON-RPC errors, mismatched ids, or a
    /// result that is not a tool result.
    pub async fn call_tool(&mut self, call: &ToolCall) -> Result<ToolResult> {
        self.handshake().await?;

        let id = self.next_id();
        let params = json!({
            "name": call.name,
            "arguments": call.arguments,
        });
        debug!("Calling tool {} (request {})", call.name, id);

        let raw = self.post(&Request::call(id, "tools/call", params)).await?;
        let result = parse_body(&raw, id)?;

        serde_json::from_value(result).map_err(|e| {
            Error::protocol(
                rpc::PARSE_ERROR,
                format!("Malformed result for tool {}: {e}", call.name),
            )
        })
    }

    async fn initialize(&mut self) -> Result<Session> {
        info!("Connecting to {}", self.endpoint);

        let id = self.next_id();
        let raw = self
            .post(&Request::call(id, "initialize", initialize_params()))
            .await?;
        let result = parse_body(&raw, id)?;
        if !result.is_object() {
            return Err(Error::protocol(
                rpc::INVALID_REQUEST,
                format!("Unexpected initialize result: {result}"),
            ));
        }

        let init: InitializeResult = serde_json::from_value(result).map_err(|e| {
            Error::protocol(rpc::PARSE_ERROR, format!("Malformed initialize result: {e}"))
        })?;

        let session = Session {
            session_id: raw
                .headers
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            protocol_version: init
                .protocol_version
                .unwrap_or_else(|| PROTOCOL_VERSION.to_string()),
            server_name: init.server_info.as_ref().and_then(|s| s.name.clone()),
            server_version: init.server_info.and_then(|s| s.version),
        };

        if session.protocol_version != PROTOCOL_VERSION {
            warn!(
                "Server negotiated protocol {} (requested {})",
                session.protocol_version, PROTOCOL_VERSION
            );
        }
        info!(
            "Connected to {} {}",
            session.server_name.as_deref().unwrap_or("server"),
            session.server_version.as_deref().unwrap_or("")
        );

        // The session must see this before it accepts tool calls.
        self.session = Some(session.clone());
        if let Err(e) = self
            .post(&Request::notification("notifications/initialized"))
            .await
        {
            self.session = None;
            return Err(e);
        }

        Ok(session)
    }

    async fn post(&self, request: &Request<'_>) -> Result<RawResponse> {
        let mut builder = self
            .http
            .post(self.endpoint.clone())
            .header(ACCEPT, ACCEPT_VALUE)
            .json(request);

        if let Some(session) = &self.session {
            builder = builder.header(PROTOCOL_VERSION_HEADER, &session.protocol_version);
            if let Some(id) = &session.session_id {
                builder = builder.header(SESSION_HEADER, id);
            }
        }

        let response = builder.send().await.map_err(|e| self.transport_error(&e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(&e))?;

        if !status.is_success() {
            return Err(Error::Connection(format!(
                "HTTP {status} from {}{}",
                self.endpoint,
                snippet(&body)
            )));
        }

        Ok(RawResponse { headers, body })
    }

    fn transport_error(&self, e: &reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Connection(format!(
                "Request to {} timed out after {}s",
                self.endpoint,
                self.config.timeout.as_secs()
            ))
        } else if e.is_connect() {
            Error::Connection(format!("Cannot connect to {}: {e}", self.endpoint))
        } else {
            Error::Connection(format!("Request to {} failed: {e}", self.endpoint))
        }
    }

    const fn next_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

/// Parameters of the `initialize` request.
pub fn initialize_params() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": CLIENT_NAME,
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

fn parse_body(raw: &RawResponse, id: u64) -> Result<Value> {
    let content_type = raw
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    rpc::parse_response(&raw.body, content_type, id)
}

fn snippet(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return String::new();
    }
    let short: String = body.chars().take(200).collect();
    format!(": {short}")
}
