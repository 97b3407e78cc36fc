//! Terminal outcome of a mail command
//!
//! Every invocation ends in exactly one [`Outcome`]: the tool call
//! succeeded, it failed, or the server blocked the content. The outcome
//! alone decides the exit code and what reaches stdout and stderr, so
//! the rule that blocked content is never printed lives in
//! [`Outcome::render`] and nowhere else.

use crate::command::MailCommand;
use crate::display;
use crate::error::{Error, Result};
use crate::tool::ToolResult;
use serde_json::{Number, Value};
use std::io::{self, Write};

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_BLOCKED: u8 = 2;

#[derive(Debug)]
pub enum Outcome {
    Success(ToolResult),
    Failed(Error),
    Blocked(BlockReport),
}

/// What the server reported about content it refused to show.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlockReport {
    /// Detection score exactly as the server sent it.
    pub score: Option<Number>,
    pub patterns: Vec<String>,
    pub reason: Option<String>,
}

impl BlockReport {
    /// Look for a "content blocked" indicator in a tool result.
    ///
    /// The indicator is an object with `blocked: true` (or
    /// `is_injection: true`) in the structured payload. Score and
    /// patterns are read from the object itself or from a nested
    /// `scan_result`.
    #[must_use]
    pub fn detect(result: &ToolResult) -> Option<Self> {
        let value = result.structured()?;
        let obj = value.as_object()?;

        let flagged = ["blocked", "is_injection"]
            .iter()
            .any(|key| obj.get(*key).and_then(Value::as_bool) == Some(true));
        if !flagged {
            return None;
        }

        let scan = obj.get("scan_result").and_then(Value::as_object);
        let field = |key: &str| scan.and_then(|s| s.get(key)).or_else(|| obj.get(key));

        let score = match field("score") {
            Some(Value::Number(n)) => Some(n.clone()),
            _ => None,
        };
        let patterns = field("detected_patterns")
            .or_else(|| field("patterns"))
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(pattern_name).collect())
            .unwrap_or_default();
        let reason = field("reason")
            .or_else(|| field("message"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(Self {
            score,
            patterns,
            reason,
        })
    }
}

fn pattern_name(item: &Value) -> Option<String> {
    match item {
        Value::String(s) => Some(s.clone()),
        Value::Object(o) => o
            .get("name")
            .or_else(|| o.get("pattern"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}

impl Outcome {
    /// Classify the result of a tool call.
    ///
    /// A block indicator wins over everything else; a result the server
    /// flagged with `isError` is a failure.
    #[must_use]
    pub fn classify(result: Result<ToolResult>) -> Self {
        match result {
            Err(e) => Self::Failed(e),
            Ok(r) => {
                if let Some(report) = BlockReport::detect(&r) {
                    Self::Blocked(report)
                } else if r.is_error {
                    let text = r.text();
                    let message = if text.trim().is_empty() {
                        "the server reported an error".to_string()
                    } else {
                        text.trim().to_string()
                    };
                    Self::Failed(Error::Tool(message))
                } else {
                    Self::Success(r)
                }
            }
        }
    }

    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Success(_) => EXIT_SUCCESS,
            Self::Failed(_) => EXIT_FAILURE,
            Self::Blocked(_) => EXIT_BLOCKED,
        }
    }

    /// Write the outcome and return the process exit code.
    ///
    /// Only a successful outcome writes to `out`.
    ///
    /// # Errors
    ///
    /// Returns any error from writing to `out` or `err`.
    pub fn render(
        &self,
        command: &MailCommand,
        json: bool,
        out: &mut dyn Write,
        err: &mut dyn Write,
    ) -> io::Result<u8> {
        match self {
            Self::Success(result) => {
                if json {
                    display::print_json(result, out)?;
                } else {
                    display::print_result(command, result, out)?;
                }
            }
            Self::Failed(e) => {
                writeln!(err, "Error: {e}")?;
            }
            Self::Blocked(report) => {
                writeln!(err, "PROMPT INJECTION DETECTED: content blocked")?;
                match &report.score {
                    Some(score) => writeln!(err, "Score: {score}")?,
                    None => writeln!(err, "Score: (not reported)")?,
                }
                if !report.patterns.is_empty() {
                    writeln!(err, "Patterns: {}", report.patterns.join(", "))?;
                }
                if let Some(reason) = &report.reason {
                    writeln!(err, "Reason: {reason}")?;
                }
            }
        }
        Ok(self.exit_code())
    }
}
