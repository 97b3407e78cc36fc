//! JSON-RPC 2.0 wire types
//!
//! Requests are serialized from [`Request`]; responses arrive either as
//! a plain JSON body or as a `text/event-stream` body whose `data:`
//! events carry JSON-RPC messages. [`parse_response`] handles both and
//! correlates the reply with the request id.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol revision sent in the `initialize` handshake.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const INTERNAL_ERROR: i64 = -32603;

/// An outgoing request or notification (no `id`).
#[derive(Debug, Serialize)]
pub struct Request<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

impl<'a> Request<'a> {
    #[must_use]
    pub const fn call(id: u64, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: Some(id),
            method,
            params: Some(params),
        }
    }

    #[must_use]
    pub const fn notification(method: &'a str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: None,
            method,
            params: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    id: Value,
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// Extract the result correlated with `expected_id` from a response body.
///
/// `content_type` selects between plain JSON and server-sent events.
pub fn parse_response(body: &str, content_type: Option<&str>, expected_id: u64) -> Result<Value> {
    let is_sse = content_type.is_some_and(|ct| ct.starts_with("text/event-stream"));

    let messages = if is_sse {
        sse_messages(body)?
    } else {
        vec![serde_json::from_str::<Value>(body).map_err(|e| {
            Error::protocol(PARSE_ERROR, format!("Invalid JSON in response: {e}"))
        })?]
    };

    if messages.is_empty() {
        return Err(Error::protocol(PARSE_ERROR, "Empty response body"));
    }

    // Servers may interleave notifications on the event stream; skip
    // anything that is not a response to us.
    let correlated = messages
        .iter()
        .find(|m| id_matches(m.get("id"), expected_id))
        .or_else(|| {
            messages
                .iter()
                .find(|m| m.get("error").is_some() && m.get("id").is_none_or(Value::is_null))
        })
        .or_else(|| messages.iter().find(|m| m.get("id").is_some()));

    let Some(message) = correlated else {
        return Err(Error::protocol(
            INVALID_REQUEST,
            format!("No response for request id {expected_id}"),
        ));
    };

    into_result(message.clone(), expected_id)
}

fn into_result(message: Value, expected_id: u64) -> Result<Value> {
    let response: Response = serde_json::from_value(message)
        .map_err(|e| Error::protocol(PARSE_ERROR, format!("Malformed JSON-RPC response: {e}")))?;

    if let Some(err) = response.error {
        let message = match err.data {
            Some(data) if !data.is_null() => format!("{} ({data})", err.message),
            _ => err.message,
        };
        return Err(Error::Protocol {
            code: err.code,
            message,
        });
    }

    if !id_matches(Some(&response.id), expected_id) {
        return Err(Error::protocol(
            INVALID_REQUEST,
            format!(
                "Response id {} does not match request id {expected_id}",
                response.id
            ),
        ));
    }

    response.result.ok_or_else(|| {
        Error::protocol(INTERNAL_ERROR, "Response has neither result nor error")
    })
}

fn id_matches(id: Option<&Value>, expected: u64) -> bool {
    match id {
        Some(Value::Number(n)) => n.as_u64() == Some(expected),
        // Tolerate servers that echo numeric ids as strings.
        Some(Value::String(s)) => s.parse::<u64>().ok() == Some(expected),
        _ => false,
    }
}

/// Collect the JSON payload of every event in an SSE body.
fn sse_messages(body: &str) -> Result<Vec<Value>> {
    let mut messages = Vec::new();
    let mut data = String::new();

    for line in body.lines().chain(std::iter::once("")) {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            if !data.is_empty() {
                let value = serde_json::from_str(&data).map_err(|e| {
                    Error::protocol(PARSE_ERROR, format!("Invalid JSON in event stream: {e}"))
                })?;
                messages.push(value);
                data.clear();
            }
        } else if let Some(rest) = line.strip_prefix("data:") {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serialization() {
        let req = Request::call(3, "tools/call", json!({"name": "list_folders"}));
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            json!({
                "jsonrpc": "2.0",
                "id": 3,
                "method": "tools/call",
                "params": {"name": "list_folders"}
            })
        );
    }

    #[test]
    fn notification_has_no_id() {
        let v = serde_json::to_value(Request::notification("notifications/initialized")).unwrap();
        assert!(v.get("id").is_none());
        assert!(v.get("params").is_none());
    }

    #[test]
    fn plain_json_result() {
        let body = r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#;
        let result = parse_response(body, Some("application/json"), 1).unwrap();
        assert_eq!(result, json!({"ok": true}));
    }

    #[test]
    fn error_object_becomes_protocol_error() {
        let body =
            r#"{"jsonrpc":"2.0","id":2,"error":{"code":-32601,"message":"Method not found"}}"#;
        match parse_response(body, None, 2).unwrap_err() {
            Error::Protocol { code, message } => {
                assert_eq!(code, -32601);
                assert_eq!(message, "Method not found");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn error_with_null_id_is_reported() {
        let body = r#"{"jsonrpc":"2.0","id":null,"error":{"code":-32700,"message":"Parse error"}}"#;
        assert!(matches!(
            parse_response(body, None, 5).unwrap_err(),
            Error::Protocol { code: -32700, .. }
        ));
    }

    #[test]
    fn mismatched_id_is_rejected() {
        let body = r#"{"jsonrpc":"2.0","id":7,"result":{}}"#;
        assert!(matches!(
            parse_response(body, None, 8).unwrap_err(),
            Error::Protocol {
                code: INVALID_REQUEST,
                ..
            }
        ));
    }

    #[test]
    fn missing_result_is_rejected() {
        let body = r#"{"jsonrpc":"2.0","id":1}"#;
        assert!(matches!(
            parse_response(body, None, 1).unwrap_err(),
            Error::Protocol {
                code: INTERNAL_ERROR,
                ..
            }
        ));
    }

    #[test]
    fn garbage_body_is_parse_error() {
        assert!(matches!(
            parse_response("<html>oops</html>", Some("text/html"), 1).unwrap_err(),
            Error::Protocol {
                code: PARSE_ERROR,
                ..
            }
        ));
    }

    #[test]
    fn event_stream_skips_notifications() {
        let body = "event: message\r\n\
                    data: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\"}\r\n\
                    \r\n\
                    event: message\r\n\
                    data: {\"jsonrpc\":\"2.0\",\"id\":4,\"result\":{\"n\":1}}\r\n\
                    \r\n";
        let result = parse_response(body, Some("text/event-stream"), 4).unwrap();
        assert_eq!(result, json!({"n": 1}));
    }

    #[test]
    fn event_stream_without_trailing_blank_line() {
        let body = "data: {\"jsonrpc\":\"2.0\",\"id\":1,\"result\":[]}";
        let result = parse_response(body, Some("text/event-stream; charset=utf-8"), 1).unwrap();
        assert_eq!(result, json!([]));
    }

    #[test]
    fn empty_event_stream_is_parse_error() {
        assert!(matches!(
            parse_response(": keepalive\n\n", Some("text/event-stream"), 1).unwrap_err(),
            Error::Protocol {
                code: PARSE_ERROR,
                ..
            }
        ));
    }

    #[test]
    fn string_ids_are_tolerated() {
        let body = r#"{"jsonrpc":"2.0","id":"3","result":{}}"#;
        assert!(parse_response(body, None, 3).is_ok());
    }
}
