//! Account records and their validation rules
//!
//! An [`Account`] describes one mailbox: where it lives and what the
//! gateway may do with it. Credentials are never part of the record;
//! the server reads them from the environment variable named by
//! [`password_env_var`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_IMAP_PORT: u16 = 993;
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// Mailbox protocol. Only IMAP is supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    #[default]
    Imap,
}

/// Operations the gateway may perform on an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Permissions {
    #[serde(default = "default_true")]
    pub read: bool,
    #[serde(default)]
    pub send: bool,
    #[serde(default)]
    pub delete: bool,
    #[serde(default, rename = "move")]
    pub move_: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            read: true,
            send: false,
            delete: false,
            move_: false,
        }
    }
}

impl Permissions {
    /// Granted permissions as `read,send,...`, or `none`.
    #[must_use]
    pub fn summary(&self) -> String {
        let granted: Vec<&str> = [
            ("read", self.read),
            ("send", self.send),
            ("delete", self.delete),
            ("move", self.move_),
        ]
        .iter()
        .filter(|(_, on)| *on)
        .map(|(name, _)| *name)
        .collect();

        if granted.is_empty() {
            "none".to_string()
        } else {
            granted.join(",")
        }
    }
}

/// Detection sensitivity override.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Protection {
    pub threshold: f64,
}

impl Default for Protection {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// One account entry of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: AccountKind,
    pub host: String,
    #[serde(default = "default_imap_port")]
    pub port: u16,
    #[serde(default = "default_true")]
    pub ssl: bool,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp_ssl: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection: Option<Protection>,
    /// Keys this client does not model, kept so a rewrite loses nothing.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl Account {
    /// Check the record's invariants.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a malformed id, a threshold
    /// outside `[0, 1]`, or `send` without an SMTP host.
    pub fn validate(&self) -> Result<()> {
        validate_id(&self.id)?;
        validate_send(self.permissions, self.smtp_host.as_deref())?;
        if let Some(protection) = &self.protection {
            validate_threshold(protection.threshold)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn password_env_var(&self) -> String {
        password_env_var(&self.id)
    }
}

/// Everything `add` needs to build an [`Account`].
#[derive(Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct AccountRequest {
    pub id: Option<String>,
    pub email: String,
    pub host: String,
    pub port: Option<u16>,
    pub no_ssl: bool,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_ssl: bool,
    pub from_address: Option<String>,
    pub from_name: Option<String>,
    pub send: bool,
    pub delete: bool,
    pub move_: bool,
    pub threshold: Option<f64>,
}

impl AccountRequest {
    /// Build and validate the account record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a malformed email, host, or id,
    /// or when any [`Account::validate`] rule fails.
    pub fn build(self) -> Result<Account> {
        let email = self.email.trim().to_string();
        validate_email(&email)?;

        let host = self.host.trim().to_string();
        if host.is_empty() {
            return Err(Error::Validation("IMAP host must not be empty".into()));
        }

        let id = match self.id {
            Some(id) => id.trim().to_lowercase(),
            None => derive_id(&email),
        };

        let smtp_host = self
            .smtp_host
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty());
        let has_smtp = smtp_host.is_some();

        let account = Account {
            id,
            kind: AccountKind::Imap,
            host,
            port: self.port.unwrap_or(DEFAULT_IMAP_PORT),
            ssl: !self.no_ssl,
            username: email,
            smtp_port: has_smtp.then(|| self.smtp_port.unwrap_or(DEFAULT_SMTP_PORT)),
            smtp_ssl: has_smtp.then_some(self.smtp_ssl),
            smtp_host,
            from_address: self.from_address.filter(|a| !a.trim().is_empty()),
            from_name: self.from_name.filter(|n| !n.trim().is_empty()),
            permissions: Permissions {
                read: true,
                send: self.send,
                delete: self.delete,
                move_: self.move_,
            },
            protection: self.threshold.map(|threshold| Protection { threshold }),
            extra: BTreeMap::new(),
        };

        account.validate()?;
        Ok(account)
    }
}

/// Derive an account id from the local part of an email address.
///
/// Lower-cases it and drops anything outside `[a-z0-9-]`; falls back to
/// `default` when nothing is left.
#[must_use]
pub fn derive_id(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let id: String = local
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect();
    if id.is_empty() {
        "default".to_string()
    } else {
        id
    }
}

/// `RNOE_ACCOUNT_<ID>_PASSWORD`, the variable holding an account's
/// password.
#[must_use]
pub fn password_env_var(id: &str) -> String {
    format!("RNOE_ACCOUNT_{}_PASSWORD", id.to_uppercase())
}

/// # Errors
///
/// Returns [`Error::Validation`] unless `id` matches
/// `[a-z0-9][a-z0-9-]*`.
pub fn validate_id(id: &str) -> Result<()> {
    let mut chars = id.chars();
    let valid_first = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if valid_first && valid_rest {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "Account ID '{id}' must be lowercase alphanumeric with hyphens only"
        )))
    }
}

/// # Errors
///
/// Returns [`Error::Validation`] unless the address has a local part and
/// a dotted domain.
pub fn validate_email(email: &str) -> Result<()> {
    let valid = email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && !domain.contains('@')
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
    });
    if valid {
        Ok(())
    } else {
        Err(Error::Validation(format!("Invalid email address: {email}")))
    }
}

/// # Errors
///
/// Returns [`Error::Validation`] when `send` is granted without an SMTP
/// host.
pub fn validate_send(permissions: Permissions, smtp_host: Option<&str>) -> Result<()> {
    if permissions.send && smtp_host.is_none_or(|h| h.trim().is_empty()) {
        return Err(Error::Validation(
            "Send permission requires an SMTP host (--smtp-host)".into(),
        ));
    }
    Ok(())
}

/// # Errors
///
/// Returns [`Error::Validation`] unless `threshold` is within `[0, 1]`.
pub fn validate_threshold(threshold: f64) -> Result<()> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "Threshold {threshold} must be between 0.0 and 1.0"
        )))
    }
}

const fn default_true() -> bool {
    true
}

const fn default_imap_port() -> u16 {
    DEFAULT_IMAP_PORT
}
