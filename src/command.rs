//! Mail command parsing and tool-call shaping
//!
//! [`Invocation::parse`] turns argv into a fully resolved invocation;
//! [`Invocation::tool_call`] shapes the arguments for the one tool call
//! the command makes. Both run before any network traffic, so every
//! problem they find is an [`Error::Usage`].

use crate::argv::{GlobalOpt, split_globals};
use crate::error::{Error, Result};
use crate::tool::ToolCall;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::error::ErrorKind;
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ACCOUNT: &str = "default";
pub const DEFAULT_FOLDER: &str = "INBOX";

const GLOBAL_HELP: &str = "\
Global options (accepted anywhere on the command line):
      --server <URL>       Gateway URL [env: RNOE_SERVER_URL] [default: http://localhost:8000]
  -a, --account <ID>       Account ID [default: default]
  -f, --folder <NAME>      Folder [default: INBOX]
      --timeout <SECS>     Request timeout in seconds [default: 30]
      --json               Print structured results as JSON

Exit codes: 0 success, 1 error, 2 content blocked by prompt-injection protection";

#[derive(Parser, Debug)]
#[command(name = "rnoe-mail", version)]
#[command(about = "Secure email access with prompt injection protection")]
#[command(after_help = GLOBAL_HELP)]
struct LocalArgs {
    #[command(subcommand)]
    command: MailCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum MailCommand {
    /// List accounts known to the server
    Accounts,

    /// List emails
    List {
        /// Maximum number of emails to list
        #[arg(
            long,
            short = 'n',
            default_value_t = 20,
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        limit: u32,

        /// Lookback in days
        #[arg(
            long,
            short = 'd',
            default_value_t = 30,
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        days: u32,
    },

    /// Read an email
    Read {
        /// Email UID
        #[arg(value_parser = parse_uid)]
        uid: u32,
    },

    /// Send an email
    Send {
        /// Recipient(s), comma-separated; may be repeated
        #[arg(long, required = true)]
        to: Vec<String>,

        /// CC recipient(s), comma-separated; may be repeated
        #[arg(long)]
        cc: Vec<String>,

        /// Subject
        #[arg(long, short = 's')]
        subject: String,

        /// Body text
        #[arg(long, short = 'b')]
        body: String,

        /// File to attach; may be repeated
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,
    },

    /// Move an email to another folder
    Move {
        /// Email UID
        #[arg(value_parser = parse_uid)]
        uid: u32,

        /// Target folder
        #[arg(long = "to")]
        target: String,
    },

    /// Delete an email
    Delete {
        /// Email UID
        #[arg(value_parser = parse_uid)]
        uid: u32,
    },

    /// List folders
    Folders,
}

fn parse_uid(s: &str) -> std::result::Result<u32, String> {
    match s.trim().parse::<u32>() {
        Ok(uid) if uid > 0 => Ok(uid),
        _ => Err(format!("Invalid UID '{s}': must be a positive integer")),
    }
}

/// A fully resolved mail command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Explicit `--server`; `None` defers to the environment.
    pub server: Option<String>,
    pub account: String,
    pub folder: String,
    pub timeout: Duration,
    pub json: bool,
    pub command: MailCommand,
}

/// Result of parsing argv.
#[derive(Debug)]
pub enum Parsed {
    Run(Invocation),
    /// `--help` or `--version` output; print it and exit successfully.
    Info(String),
}

impl Invocation {
    /// Parse argv, excluding the program name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Usage`] for anything the command line gets
    /// wrong.
    pub fn parse<I, S>(args: I) -> Result<Parsed>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (globals, rest) = split_globals(args)?;

        let argv = std::iter::once("rnoe-mail".to_string()).chain(rest);
        let local = match LocalArgs::try_parse_from(argv) {
            Ok(local) => local,
            Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                return Ok(Parsed::Info(e.render().to_string()));
            }
            Err(e) => return Err(usage_from_clap(&e)),
        };

        let timeout = match globals.get(GlobalOpt::Timeout) {
            Some(raw) => parse_timeout(raw)?,
            None => crate::config::DEFAULT_TIMEOUT,
        };

        Ok(Parsed::Run(Self {
            server: globals.get(GlobalOpt::Server).map(str::to_string),
            account: non_empty(globals.get(GlobalOpt::Account), "--account")?
                .unwrap_or(DEFAULT_ACCOUNT)
                .to_string(),
            folder: non_empty(globals.get(GlobalOpt::Folder), "--folder")?
                .unwrap_or(DEFAULT_FOLDER)
                .to_string(),
            timeout,
            json: globals.flag(GlobalOpt::Json),
            command: local.command,
        }))
    }

    /// Build the tool call for this command.
    ///
    /// Recipients are split and validated and attachments are read
    /// here, so a bad address or a missing file never reaches the
    /// server.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Usage`] for invalid recipients or unreadable
    /// attachments.
    pub fn tool_call(&self) -> Result<ToolCall> {
        let account = self.account.as_str();
        let folder = self.folder.as_str();

        let call = match &self.command {
            MailCommand::Accounts => ToolCall::new("list_accounts"),
            MailCommand::Folders => ToolCall::new("list_folders").arg("account", account),
            MailCommand::List { limit, days } => ToolCall::new("list_emails")
                .arg("account", account)
                .arg("folder", folder)
                .arg("limit", *limit)
                .arg("days_back", *days),
            MailCommand::Read { uid } => ToolCall::new("get_email")
                .arg("account", account)
                .arg("folder", folder)
                .arg("uid", *uid),
            MailCommand::Send {
                to,
                cc,
                subject,
                body,
                attachments,
            } => {
                let to = split_addresses(to)?;
                if to.is_empty() {
                    return Err(Error::Usage("--to needs at least one recipient".into()));
                }
                let cc = split_addresses(cc)?;
                let attachments = attachments
                    .iter()
                    .map(|p| load_attachment(p))
                    .collect::<Result<Vec<_>>>()?;

                ToolCall::new("send_email")
                    .arg("account", account)
                    .arg("to", to)
                    .opt_arg("cc", (!cc.is_empty()).then_some(cc))
                    .arg("subject", subject.as_str())
                    .arg("body", body.as_str())
                    .opt_arg(
                        "attachments",
                        (!attachments.is_empty()).then_some(attachments),
                    )
            }
            MailCommand::Move { uid, target } => {
                if target.trim().is_empty() {
                    return Err(Error::Usage("--to needs a folder name".into()));
                }
                ToolCall::new("move_email")
                    .arg("account", account)
                    .arg("folder", folder)
                    .arg("uid", *uid)
                    .arg("target_folder", target.as_str())
            }
            MailCommand::Delete { uid } => ToolCall::new("delete_email")
                .arg("account", account)
                .arg("folder", folder)
                .arg("uid", *uid),
        };

        Ok(call)
    }
}

/// Split comma-separated address lists into trimmed, non-empty
/// addresses, keeping their order.
///
/// # Errors
///
/// Returns [`Error::Usage`] for an entry without `@`.
pub fn split_addresses(values: &[String]) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for value in values {
        for addr in value.split(',').map(str::trim).filter(|a| !a.is_empty()) {
            if !addr.contains('@') {
                return Err(Error::Usage(format!("Invalid email address '{addr}'")));
            }
            out.push(addr.to_string());
        }
    }
    Ok(out)
}

fn load_attachment(path: &Path) -> Result<Value> {
    let data = std::fs::read(path).map_err(|e| {
        Error::Usage(format!("Cannot read attachment {}: {e}", path.display()))
    })?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            Error::Usage(format!("Attachment path {} has no file name", path.display()))
        })?;

    Ok(json!({
        "filename": filename,
        "content": STANDARD.encode(&data),
        "mime_type": mime_type(path),
    }))
}

fn mime_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

fn parse_timeout(raw: &str) -> Result<Duration> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(Error::Usage(format!(
            "Invalid --timeout '{raw}': must be a positive number of seconds"
        ))),
    }
}

fn non_empty<'a>(value: Option<&'a str>, name: &str) -> Result<Option<&'a str>> {
    match value {
        Some(v) if v.trim().is_empty() => Err(Error::Usage(format!("{name} must not be empty"))),
        other => Ok(other),
    }
}

fn usage_from_clap(e: &clap::Error) -> Error {
    let rendered = e.render().to_string();
    let message = rendered
        .trim()
        .strip_prefix("error: ")
        .unwrap_or_else(|| rendered.trim());
    Error::Usage(message.to_string())
}
