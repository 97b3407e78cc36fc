//! Error types for rnoe-client

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Bad local input, caught before any network call.
    #[error("{0}")]
    Usage(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol error {code}: {message}")]
    Protocol { code: i64, message: String },

    /// The server completed the call but reported the operation as failed.
    #[error("Server error: {0}")]
    Tool(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Account '{0}' already exists")]
    DuplicateId(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Config file error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn protocol(code: i64, message: impl Into<String>) -> Self {
        Self::Protocol {
            code,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
