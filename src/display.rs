//! Human-readable rendering of successful tool results
//!
//! When the server returns structured data we recognise, it is laid out
//! as a table or detail view. Anything else is printed as the server's
//! text content, verbatim.

use crate::command::MailCommand;
use crate::tool::ToolResult;
use serde::Deserialize;
use serde_json::Value;
use std::io::{self, Write};

#[derive(Debug, Deserialize)]
struct MessageSummary {
    uid: u64,
    #[serde(default, alias = "sender")]
    from: Value,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default, alias = "is_seen")]
    seen: Option<bool>,
    #[serde(default)]
    unread: Option<bool>,
    #[serde(default)]
    has_attachments: bool,
}

impl MessageSummary {
    fn is_unread(&self) -> bool {
        self.unread.unwrap_or_else(|| self.seen == Some(false))
    }
}

#[derive(Debug, Deserialize)]
struct MessageDetail {
    #[serde(default)]
    uid: Option<u64>,
    #[serde(default, alias = "sender")]
    from: Value,
    #[serde(default, alias = "recipients")]
    to: Value,
    #[serde(default)]
    cc: Value,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    attachments: Vec<AttachmentInfo>,
    #[serde(default, alias = "text", alias = "content")]
    body: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttachmentInfo {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default, alias = "mime_type")]
    content_type: Option<String>,
    #[serde(default)]
    size: Option<u64>,
}

/// Print the structured payload (or the text content) as JSON.
///
/// # Errors
///
/// Returns any error from writing to `out`.
pub fn print_json(result: &ToolResult, out: &mut dyn Write) -> io::Result<()> {
    let value = result
        .structured()
        .unwrap_or_else(|| serde_json::json!({ "text": result.text() }));
    let pretty = serde_json::to_string_pretty(&value).map_err(io::Error::other)?;
    writeln!(out, "{pretty}")
}

/// Print a successful result the way the command's user expects it.
///
/// # Errors
///
/// Returns any error from writing to `out`.
pub fn print_result(
    command: &MailCommand,
    result: &ToolResult,
    out: &mut dyn Write,
) -> io::Result<()> {
    let structured = result.structured();

    let handled = match (command, &structured) {
        (MailCommand::List { .. }, Some(v)) => match summaries(v) {
            Some(emails) => {
                print_email_table(&emails, out)?;
                true
            }
            None => false,
        },
        (MailCommand::Read { .. }, Some(v)) => {
            match serde_json::from_value::<MessageDetail>(v.clone()) {
                Ok(detail) if detail.body.is_some() || detail.subject.is_some() => {
                    print_email_detail(&detail, out)?;
                    true
                }
                _ => false,
            }
        }
        (MailCommand::Folders, Some(v)) => print_names(v, "folders", out)?,
        (MailCommand::Accounts, Some(v)) => print_names(v, "accounts", out)?,
        _ => false,
    };
    if handled {
        return Ok(());
    }

    let text = result.text();
    if !text.trim().is_empty() {
        return writeln!(out, "{text}");
    }

    match command {
        MailCommand::Send { to, .. } => writeln!(out, "Email sent to {}", to.join(", ")),
        MailCommand::Move { uid, target } => writeln!(out, "Email {uid} moved to {target}"),
        MailCommand::Delete { uid } => writeln!(out, "Email {uid} deleted"),
        _ => Ok(()),
    }
}

fn summaries(value: &Value) -> Option<Vec<MessageSummary>> {
    let items = value.as_array().or_else(|| {
        value
            .get("emails")
            .or_else(|| value.get("messages"))
            .and_then(Value::as_array)
    })?;
    items
        .iter()
        .map(|item| serde_json::from_value(item.clone()).ok())
        .collect()
}

fn print_email_table(emails: &[MessageSummary], out: &mut dyn Write) -> io::Result<()> {
    if emails.is_empty() {
        return writeln!(out, "No emails found.");
    }

    writeln!(
        out,
        "{:<2} {:<8} {:<17} {:<30} Subject",
        "", "UID", "Date", "From"
    )?;
    writeln!(out, "{}", "-".repeat(100))?;

    let mut unread = 0;
    for email in emails {
        let marker = match (email.is_unread(), email.has_attachments) {
            (true, true) => "*+",
            (true, false) => "* ",
            (false, true) => " +",
            (false, false) => "  ",
        };
        if email.is_unread() {
            unread += 1;
        }
        let sender = address(&email.from).unwrap_or_else(|| "(unknown)".into());
        writeln!(
            out,
            "{marker} {:<8} {:<17} {:<30} {}",
            email.uid,
            truncate(email.date.as_deref().unwrap_or(""), 16),
            truncate(&sender, 28),
            truncate(email.subject.as_deref().unwrap_or("(no subject)"), 45),
        )?;
    }

    writeln!(
        out,
        "\n{} email(s), {unread} unread (* unread, + attachments)",
        emails.len()
    )
}

fn print_email_detail(email: &MessageDetail, out: &mut dyn Write) -> io::Result<()> {
    if let Some(uid) = email.uid {
        writeln!(out, "UID:     {uid}")?;
    }
    writeln!(out, "From:    {}", address(&email.from).unwrap_or_default())?;
    writeln!(out, "To:      {}", address_list(&email.to))?;
    let cc = address_list(&email.cc);
    if !cc.is_empty() {
        writeln!(out, "CC:      {cc}")?;
    }
    writeln!(out, "Date:    {}", email.date.as_deref().unwrap_or(""))?;
    writeln!(out, "Subject: {}", email.subject.as_deref().unwrap_or(""))?;

    if !email.attachments.is_empty() {
        writeln!(out, "\nAttachments: {}", email.attachments.len())?;
        for att in &email.attachments {
            let size = att.size.map(|s| format!(", {s} bytes")).unwrap_or_default();
            writeln!(
                out,
                "  {} ({}{size})",
                att.filename.as_deref().unwrap_or("(unnamed)"),
                att.content_type.as_deref().unwrap_or("unknown type"),
            )?;
        }
    }

    writeln!(out, "\n--- Body ---\n")?;
    match email.body.as_deref() {
        Some(body) if !body.is_empty() => writeln!(out, "{body}"),
        _ => writeln!(out, "(empty)"),
    }
}

/// One name per line for folder and account listings.
fn print_names(value: &Value, key: &str, out: &mut dyn Write) -> io::Result<bool> {
    let Some(items) = value
        .as_array()
        .or_else(|| value.get(key).and_then(Value::as_array))
    else {
        return Ok(false);
    };

    for item in items {
        match item {
            Value::String(name) => writeln!(out, "{name}")?,
            Value::Object(obj) => {
                let name = obj
                    .get("name")
                    .or_else(|| obj.get("id"))
                    .and_then(Value::as_str)
                    .unwrap_or("?");
                match obj.get("permissions").and_then(Value::as_object) {
                    Some(perms) => {
                        let granted: Vec<&str> = perms
                            .iter()
                            .filter(|(_, v)| v.as_bool() == Some(true))
                            .map(|(k, _)| k.as_str())
                            .collect();
                        writeln!(out, "{name:<20} {}", granted.join(","))?;
                    }
                    None => writeln!(out, "{name}")?,
                }
            }
            other => writeln!(out, "{other}")?,
        }
    }
    Ok(true)
}

/// Render an address given as a string or as `{name, email}`.
fn address(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => {
            let email = obj
                .get("email")
                .or_else(|| obj.get("address"))
                .and_then(Value::as_str);
            let name = obj
                .get("name")
                .and_then(Value::as_str)
                .filter(|n| !n.is_empty());
            match (name, email) {
                (Some(n), Some(e)) => Some(format!("{n} <{e}>")),
                (None, Some(e)) => Some(e.to_string()),
                (Some(n), None) => Some(n.to_string()),
                (None, None) => None,
            }
        }
        _ => None,
    }
}

fn address_list(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(address)
            .collect::<Vec<_>>()
            .join(", "),
        other => address(other).unwrap_or_default(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{truncated}...")
    }
}
