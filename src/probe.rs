//! Gateway readiness probe
//!
//! Polls the endpoint with `initialize` requests until one gets a
//! non-error HTTP response. One probe is in flight at a time. Running
//! out of attempts is a result, not an error: the caller decides how
//! loudly to report it.

use crate::config::ServerConfig;
use crate::connection::initialize_params;
use crate::error::{Error, Result};
use crate::rpc::Request;
use reqwest::header::ACCEPT;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_ATTEMPTS: u32 = 30;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// The server answered on this attempt (1-based).
    Ready { attempt: u32 },
    /// No attempt got a non-error response.
    TimedOut { attempts: u32 },
}

/// Probe until ready or until `attempts` probes have failed.
///
/// # Errors
///
/// Returns [`Error::Usage`] for zero attempts and
/// [`Error::Connection`] if the HTTP client cannot be built.
pub async fn wait_until_ready(
    config: &ServerConfig,
    attempts: u32,
    interval: Duration,
) -> Result<Readiness> {
    if attempts == 0 {
        return Err(Error::Usage("attempts must be at least 1".into()));
    }

    let http = reqwest::Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|e| Error::Connection(format!("Cannot build HTTP client: {e}")))?;
    let endpoint = config.endpoint();
    let body = Request::call(1, "initialize", initialize_params());

    for attempt in 1..=attempts {
        let response = http
            .post(endpoint.clone())
            .header(ACCEPT, "application/json, text/event-stream")
            .json(&body)
            .send()
            .await;

        match response {
            Ok(r) if !r.status().is_client_error() && !r.status().is_server_error() => {
                info!("{} ready after {} attempt(s)", endpoint, attempt);
                return Ok(Readiness::Ready { attempt });
            }
            Ok(r) => debug!("Probe {}/{}: HTTP {}", attempt, attempts, r.status()),
            Err(e) => debug!("Probe {}/{}: {}", attempt, attempts, e),
        }

        if attempt < attempts {
            tokio::time::sleep(interval).await;
        }
    }

    Ok(Readiness::TimedOut { attempts })
}
