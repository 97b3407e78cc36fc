#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! CLI for reading and sending mail through the read-no-evil-mcp
//! gateway
//!
//! Exit codes: 0 success, 1 error, 2 content blocked by prompt
//! injection protection.

use std::io::{self, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut out = io::stdout();
    let mut err = io::stderr();
    let args: Vec<String> = std::env::args().skip(1).collect();
    let code = rnoe_client::run(args, &mut out, &mut err).await;
    out.flush().ok();

    ExitCode::from(code)
}
