//! Tool calls and their results
//!
//! A [`ToolCall`] is what the router hands to the connection: the tool
//! name plus its argument object. The server answers with a
//! [`ToolResult`] made of content blocks and, optionally, a structured
//! JSON payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One named server-side operation and its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCall {
    pub name: String,
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Map::new(),
        }
    }

    /// Add an argument, builder style.
    #[must_use]
    pub fn arg(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.to_string(), value.into());
        self
    }

    /// Add an argument only when `value` is present.
    #[must_use]
    pub fn opt_arg(self, key: &str, value: Option<impl Into<Value>>) -> Self {
        if let Some(v) = value {
            return self.arg(key, v);
        }
        self
    }
}

/// A content block of a tool result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text { text: String },
    #[serde(other)]
    Other,
}

/// The `result` member of a `tools/call` response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    #[serde(default)]
    pub content: Vec<Content>,
    #[serde(default)]
    pub structured_content: Option<Value>,
    #[serde(default)]
    pub is_error: bool,
}

impl ToolResult {
    /// All text blocks joined by newlines.
    #[must_use]
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                Content::Text { text } => Some(text.as_str()),
                Content::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The structured payload, if any.
    ///
    /// Prefers `structuredContent`; otherwise the first text block that
    /// parses as a JSON object or array.
    #[must_use]
    pub fn structured(&self) -> Option<Value> {
        if let Some(v) = &self.structured_content {
            return Some(v.clone());
        }
        self.content.iter().find_map(|c| match c {
            Content::Text { text } => serde_json::from_str::<Value>(text)
                .ok()
                .filter(|v| v.is_object() || v.is_array()),
            Content::Other => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_collects_arguments() {
        let call = ToolCall::new("get_email")
            .arg("account", "work")
            .arg("uid", 42)
            .opt_arg("cc", None::<Vec<String>>)
            .opt_arg("folder", Some("Sent"));
        assert_eq!(call.name, "get_email");
        assert_eq!(
            Value::Object(call.arguments),
            json!({"account": "work", "uid": 42, "folder": "Sent"})
        );
    }

    #[test]
    fn parses_mcp_result() {
        let result: ToolResult = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "line one"},
                {"type": "image", "data": "...", "mimeType": "image/png"},
                {"type": "text", "text": "line two"}
            ],
            "isError": false
        }))
        .unwrap();
        assert_eq!(result.content.len(), 3);
        assert_eq!(result.text(), "line one\nline two");
        assert!(result.structured().is_none());
    }

    #[test]
    fn structured_content_preferred() {
        let result: ToolResult = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "{\"a\":1}"}],
            "structuredContent": {"b": 2}
        }))
        .unwrap();
        assert_eq!(result.structured(), Some(json!({"b": 2})));
    }

    #[test]
    fn json_text_block_is_structured() {
        let result: ToolResult = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "[{\"uid\": 1}]"}]
        }))
        .unwrap();
        assert_eq!(result.structured(), Some(json!([{"uid": 1}])));
    }

    #[test]
    fn scalar_json_text_is_not_structured() {
        let result: ToolResult = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "42"}]
        }))
        .unwrap();
        assert!(result.structured().is_none());
    }
}
