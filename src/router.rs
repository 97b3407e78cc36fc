//! Drives one mail command from argv to exit code

use crate::command::{Invocation, Parsed};
use crate::config::ServerConfig;
use crate::connection::ServerConnection;
use crate::error::Result;
use crate::outcome::{EXIT_FAILURE, EXIT_SUCCESS, Outcome};
use crate::tool::{ToolCall, ToolResult};
use std::io::Write;
use tracing::{debug, warn};

/// Run a mail command and return the process exit code.
///
/// `args` excludes the program name. Command output goes to `out`,
/// warnings and errors to `err`.
pub async fn run<I, S>(
    args: I,
    out: &mut (dyn Write + Send),
    err: &mut (dyn Write + Send),
) -> u8
where
    I: IntoIterator<Item = S> + Send,
    S: Into<String>,
{
    let invocation = match Invocation::parse(args) {
        Ok(Parsed::Run(invocation)) => invocation,
        Ok(Parsed::Info(text)) => {
            return if write!(out, "{text}").is_ok() {
                EXIT_SUCCESS
            } else {
                EXIT_FAILURE
            };
        }
        Err(e) => {
            writeln!(err, "Error: {e}").ok();
            return EXIT_FAILURE;
        }
    };

    let outcome = execute(&invocation, err).await;
    outcome
        .render(&invocation.command, invocation.json, out, err)
        .unwrap_or(EXIT_FAILURE)
}

/// Resolve, validate, and perform the invocation's tool call.
///
/// Everything local (server URL, recipients, attachments) is checked
/// before the first byte goes on the wire.
pub async fn execute(invocation: &Invocation, err: &mut (dyn Write + Send)) -> Outcome {
    let prepared = ServerConfig::resolve(invocation.server.as_deref(), invocation.timeout)
        .and_then(|config| Ok((config, invocation.tool_call()?)));
    let (config, call) = match prepared {
        Ok(prepared) => prepared,
        Err(e) => return Outcome::Failed(e),
    };

    if config.is_insecure_remote() {
        warn!("Plain HTTP to non-local host {}", config.url);
        writeln!(
            err,
            "Warning: connecting to {} over plain HTTP; traffic is not encrypted",
            config.url
        )
        .ok();
    }

    Outcome::classify(call_once(config, &call).await)
}

async fn call_once(config: ServerConfig, call: &ToolCall) -> Result<ToolResult> {
    let mut connection = ServerConnection::new(config)?;
    debug!("Endpoint {}", connection.endpoint());
    connection.call_tool(call).await
}
