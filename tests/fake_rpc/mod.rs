//! Fake MCP gateway for integration testing
//!
//! An in-process HTTP/1.1 server that speaks enough JSON-RPC to test
//! `rnoe-mail` end-to-end:
//!
//! TCP -> POST initialize -> POST notifications/initialized -> POST tools/call
//!
//! ## Module layout
//!
//! - `server` -- TCP listener, request dispatch, and the request log
//! - `script` -- canned tool results keyed by tool name (builder)
//! - `io` -- HTTP request parsing and response writing

#![allow(dead_code)]

mod io;
pub mod script;
mod server;

pub use script::ScriptBuilder;
pub use server::{FakeRpcServer, Recorded};
