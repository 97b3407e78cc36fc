//! Gateway connection configuration

use crate::error::{Error, Result};
use std::env;
use std::time::Duration;
use url::{Host, Url};

/// Used when neither `--server` nor `RNOE_SERVER_URL` is given.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// Environment variable overriding the default server URL.
pub const SERVER_URL_ENV: &str = "RNOE_SERVER_URL";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Path requests are posted to when the server URL has none.
const DEFAULT_ENDPOINT_PATH: &str = "mcp";

/// Where and how to reach the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub url: Url,
    pub timeout: Duration,
}

impl ServerConfig {
    /// Resolve the server URL: explicit flag, then `RNOE_SERVER_URL`,
    /// then [`DEFAULT_SERVER_URL`].
    ///
    /// Reads a `.env` file from the working directory if present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Usage`] for a malformed URL, a scheme other
    /// than http or https, or a URL without a host.
    pub fn resolve(flag: Option<&str>, timeout: Duration) -> Result<Self> {
        dotenvy::dotenv().ok();
        let from_env = env::var(SERVER_URL_ENV).ok();
        Self::resolve_with(flag, from_env.as_deref(), timeout)
    }

    /// Same as [`ServerConfig::resolve`] with the environment value
    /// passed in explicitly.
    ///
    /// # Errors
    ///
    /// Same as [`ServerConfig::resolve`].
    pub fn resolve_with(
        flag: Option<&str>,
        from_env: Option<&str>,
        timeout: Duration,
    ) -> Result<Self> {
        let raw = flag
            .or_else(|| from_env.filter(|v| !v.trim().is_empty()))
            .unwrap_or(DEFAULT_SERVER_URL)
            .trim();

        let url = Url::parse(raw)
            .map_err(|e| Error::Usage(format!("Invalid server URL '{raw}': {e}")))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(Error::Usage(format!(
                    "Unsupported URL scheme '{other}' in '{raw}' (expected http or https)"
                )));
            }
        }
        if url.host().is_none() {
            return Err(Error::Usage(format!("Server URL '{raw}' has no host")));
        }

        Ok(Self { url, timeout })
    }

    /// The URL JSON-RPC requests are posted to.
    ///
    /// A bare base URL gets the default `/mcp` path; anything with an
    /// explicit path is used as given.
    #[must_use]
    pub fn endpoint(&self) -> Url {
        if matches!(self.url.path(), "" | "/") {
            let mut endpoint = self.url.clone();
            endpoint.set_path(DEFAULT_ENDPOINT_PATH);
            endpoint
        } else {
            self.url.clone()
        }
    }

    /// True for plain-HTTP URLs pointing somewhere other than loopback.
    #[must_use]
    pub fn is_insecure_remote(&self) -> bool {
        self.url.scheme() == "http" && !is_loopback(&self.url)
    }
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(flag: Option<&str>, from_env: Option<&str>) -> ServerConfig {
        ServerConfig::resolve_with(flag, from_env, DEFAULT_TIMEOUT).unwrap()
    }

    #[test]
    fn flag_wins_over_env() {
        let cfg = resolve(Some("http://flag:1"), Some("http://env:2"));
        assert_eq!(cfg.url.as_str(), "http://flag:1/");
    }

    #[test]
    fn env_wins_over_default() {
        let cfg = resolve(None, Some("https://env.example.com"));
        assert_eq!(cfg.url.as_str(), "https://env.example.com/");
    }

    #[test]
    fn blank_env_falls_back_to_default() {
        let cfg = resolve(None, Some("  "));
        assert_eq!(cfg.url.as_str(), "http://localhost:8000/");
    }

    #[test]
    fn default_endpoint_gets_mcp_path() {
        let cfg = resolve(None, None);
        assert_eq!(cfg.endpoint().as_str(), "http://localhost:8000/mcp");
    }

    #[test]
    fn explicit_path_is_kept() {
        let cfg = resolve(Some("http://localhost:9000/rpc/"), None);
        assert_eq!(cfg.endpoint().as_str(), "http://localhost:9000/rpc/");
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = ServerConfig::resolve_with(Some("ftp://host"), None, DEFAULT_TIMEOUT)
            .unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
    }

    #[test]
    fn rejects_garbage() {
        let err =
            ServerConfig::resolve_with(Some("not a url"), None, DEFAULT_TIMEOUT).unwrap_err();
        assert!(matches!(err, Error::Usage(_)));
    }

    #[test]
    fn loopback_hosts_are_not_insecure() {
        for url in [
            "http://localhost:8000",
            "http://LOCALHOST",
            "http://mail.localhost",
            "http://127.0.0.1:8000",
            "http://127.8.9.10",
            "http://[::1]:8000",
        ] {
            assert!(!resolve(Some(url), None).is_insecure_remote(), "{url}");
        }
    }

    #[test]
    fn remote_http_is_insecure() {
        assert!(resolve(Some("http://mail.example.com"), None).is_insecure_remote());
        assert!(resolve(Some("http://10.0.0.5:8000"), None).is_insecure_remote());
    }

    #[test]
    fn remote_https_is_fine() {
        assert!(!resolve(Some("https://mail.example.com"), None).is_insecure_remote());
    }
}
