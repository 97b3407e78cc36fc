//! Client for the read-no-evil-mcp email gateway
//!
//! The gateway scans mail for prompt injection before handing it out.
//! This crate talks to it over JSON-RPC on HTTP ([`ServerConnection`]),
//! turns command lines into tool calls ([`Invocation`]), and maps each
//! result to one of three terminal [`Outcome`]s: success, failure, or
//! content blocked. It also manages the gateway's account configuration
//! file ([`ConfigStore`]).

mod account;
mod argv;
mod command;
mod config;
mod connection;
mod display;
mod error;
mod outcome;
pub mod probe;
mod router;
mod rpc;
mod secrets;
mod store;
mod tool;

pub use account::{
    Account, AccountKind, AccountRequest, Permissions, Protection, derive_id, password_env_var,
};
pub use argv::{GlobalOpt, GlobalOptions, split_globals};
pub use command::{Invocation, MailCommand, Parsed, split_addresses};
pub use config::{DEFAULT_SERVER_URL, DEFAULT_TIMEOUT, SERVER_URL_ENV, ServerConfig};
pub use connection::{ServerConnection, Session};
pub use error::{Error, Result};
pub use outcome::{BlockReport, EXIT_BLOCKED, EXIT_FAILURE, EXIT_SUCCESS, Outcome};
pub use router::{execute, run};
pub use store::{Added, ConfigFile, ConfigStore};
pub use tool::{Content, ToolCall, ToolResult};
