//! Account configuration file
//!
//! [`ConfigStore`] owns the YAML file the gateway reads its accounts
//! from. Every mutating operation validates first and writes last, and
//! writes go through a temporary file in the same directory so a failed
//! call never leaves a half-written or modified file behind.

use crate::account::{Account, AccountRequest, Protection, validate_threshold};
use crate::error::{Error, Result};
use crate::secrets;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

const APP_DIR: &str = "read-no-evil-mcp";
const CONFIG_FILE: &str = "config.yaml";
const SECRETS_FILE: &str = ".env";

/// Contents of the configuration file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub protection: Protection,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub accounts: Vec<Account>,
    /// Top-level keys this client does not model.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Account>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Account>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Result of a successful `add`.
#[derive(Debug, Clone, PartialEq)]
pub struct Added {
    pub account: Account,
    /// Variable the server reads the password from.
    pub env_var: String,
    /// Set when a placeholder line was appended to the secrets file.
    pub secrets_file: Option<PathBuf>,
}

/// CRUD over the account configuration file
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$XDG_CONFIG_HOME/read-no-evil-mcp/config.yaml`, or the same
    /// under `~/.config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when no home directory can be
    /// determined.
    pub fn default_path() -> Result<PathBuf> {
        let base = match std::env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .ok_or_else(|| Error::NotFound("home directory".into()))?
                .join(".config"),
        };
        Ok(base.join(APP_DIR).join(CONFIG_FILE))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The `.env` file next to the configuration file.
    #[must_use]
    pub fn secrets_path(&self) -> PathBuf {
        self.path
            .parent()
            .map_or_else(|| PathBuf::from(SECRETS_FILE), |dir| dir.join(SECRETS_FILE))
    }

    /// Write an empty skeleton.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyExists`] if the file exists and `force`
    /// is not set, [`Error::Validation`] for a threshold outside
    /// `[0, 1]`, or an I/O error.
    pub fn create(&self, threshold: Option<f64>, force: bool) -> Result<ConfigFile> {
        if self.path.exists() && !force {
            return Err(Error::AlreadyExists(format!(
                "{} (use --force to overwrite)",
                self.path.display()
            )));
        }

        let mut protection = Protection::default();
        if let Some(threshold) = threshold {
            validate_threshold(threshold)?;
            protection.threshold = threshold;
        }

        let config = ConfigFile {
            protection,
            ..ConfigFile::default()
        };
        self.save(&config)?;
        info!("Created {}", self.path.display());
        Ok(config)
    }

    /// Read and parse the file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the file does not exist,
    /// [`Error::Yaml`] if it does not parse.
    pub fn load(&self) -> Result<ConfigFile> {
        parse(&self.read_raw()?)
    }

    /// Raw file contents, for `show`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the file does not exist.
    pub fn read_raw(&self) -> Result<String> {
        fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!(
                    "config file {} (run 'create' first)",
                    self.path.display()
                ))
            } else {
                Error::Io(e)
            }
        })
    }

    /// Append a new account.
    ///
    /// With `create_env`, also appends a password placeholder for the
    /// account to the secrets file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an invalid request,
    /// [`Error::DuplicateId`] if the id is taken, [`Error::NotFound`]
    /// if the file does not exist. Nothing is written on error: if the
    /// secrets file cannot be updated, the previous config is restored.
    pub fn add(&self, request: AccountRequest, create_env: bool) -> Result<Added> {
        let original = self.read_raw()?;
        let mut config = parse(&original)?;
        let account = request.build()?;

        if config.accounts.iter().any(|a| a.id == account.id) {
            return Err(Error::DuplicateId(account.id));
        }

        config.accounts.push(account.clone());
        self.save(&config)?;

        let env_var = account.password_env_var();
        let secrets_file = if create_env {
            let path = self.secrets_path();
            if let Err(e) = secrets::ensure_placeholder(&path, &env_var) {
                warn!("Cannot update {}, restoring config", path.display());
                self.write_atomic(&original)?;
                return Err(e);
            }
            Some(path)
        } else {
            None
        };
        info!("Added account {}", account.id);

        Ok(Added {
            account,
            env_var,
            secrets_file,
        })
    }

    /// Remove an account, keeping the others in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if no account has this id or the file
    /// does not exist.
    pub fn remove(&self, id: &str) -> Result<Account> {
        let mut config = self.load()?;
        let id = id.trim().to_lowercase();

        let Some(index) = config.accounts.iter().position(|a| a.id == id) else {
            return Err(Error::NotFound(format!("no account with ID '{id}'")));
        };

        let removed = config.accounts.remove(index);
        self.save(&config)?;
        info!("Removed account {}", removed.id);
        Ok(removed)
    }

    /// All accounts, in file order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the file does not exist.
    pub fn list(&self) -> Result<Vec<Account>> {
        Ok(self.load()?.accounts)
    }

    fn save(&self, config: &ConfigFile) -> Result<()> {
        self.write_atomic(&serde_yaml::to_string(config)?)
    }

    fn write_atomic(&self, text: &str) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)?;

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(text.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        debug!("Wrote {}", self.path.display());
        Ok(())
    }
}

fn parse(text: &str) -> Result<ConfigFile> {
    if text.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    Ok(serde_yaml::from_str(text)?)
}
