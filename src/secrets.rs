//! Companion secrets file (`.env`)
//!
//! Holds one `KEY=value` line per account password. This module only
//! ever appends placeholder lines; existing lines are left untouched
//! and secret values are never read back.

use crate::error::Result;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::debug;

pub const PLACEHOLDER: &str = "your-app-password-here";

const HEADER: &str = "# read-no-evil-mcp credentials\n\
                      # Keep this file secret. Do not commit it to version control.\n";

/// Append `var=<placeholder>` unless `var` already has a line.
///
/// Creates the file (with a comment header) if needed and restricts it
/// to the owner on unix. Returns whether a line was written.
///
/// # Errors
///
/// Returns any I/O error from reading or writing the file.
pub fn ensure_placeholder(path: &Path, var: &str) -> Result<bool> {
    let existing = match fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    if existing.as_deref().is_some_and(|text| defines(text, var)) {
        debug!("{} already present in {}", var, path.display());
        return Ok(false);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut text = String::new();
    match existing.as_deref() {
        None | Some("") => text.push_str(HEADER),
        Some(prev) if !prev.ends_with('\n') => text.push('\n'),
        Some(_) => {}
    }
    text.push_str(var);
    text.push('=');
    text.push_str(PLACEHOLDER);
    text.push('\n');
    file.write_all(text.as_bytes())?;

    restrict_permissions(path)?;
    Ok(true)
}

/// Whether `text` has a `var=...` line (optionally `export`ed).
fn defines(text: &str, var: &str) -> bool {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .map(|line| line.strip_prefix("export ").unwrap_or(line))
        .filter_map(|line| line.split_once('='))
        .any(|(key, _)| key.trim() == var)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
#[allow(clippy::unnecessary_wraps)]
const fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
