//! Client builder for constructing [`Tm1Client`] instances.
//!
//! This module is responsible for:
//! - Resolving the service roots and authentication mode from a [`Config`]
//! - Configuring the underlying HTTP client (pool, keep-alive, TLS, proxies)
//! - Optionally opening the session eagerly (`connect`)
//!
//! # What this module does NOT handle:
//! - Actual API calls (handled by [`Tm1Client`] methods in the sibling modules)
//! - Session state (handled by [`crate::auth::SessionManager`])
//!
//! # Invariants
//! - A configuration that cannot address a server fails in `build()`, before any I/O
//! - `verify=false` only relaxes certificate checks; it never changes the scheme

use std::sync::Arc;
use std::time::Duration;

use tm1_config::Config;
use tm1_config::constants::{DEFAULT_MAX_REDIRECTS, DEFAULT_TCP_KEEP_ALIVE_SECS};

use crate::client::Tm1Client;
use crate::client::rest::RestService;
use crate::error::{ClientError, Result};
use crate::metrics::MetricsCollector;
use crate::roots;

/// Builder for creating a new [`Tm1Client`].
///
/// # Example
///
/// ```rust,ignore
/// use tm1_client::Tm1Client;
/// use tm1_config::Config;
///
/// let config = Config::v11("localhost", 8010, true, "admin", "apple");
/// let client = Tm1Client::builder().from_config(&config).connect().await?;
/// ```
#[derive(Debug, Default)]
pub struct Tm1ClientBuilder {
    config: Option<Config>,
    metrics: Option<MetricsCollector>,
}

impl Tm1ClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` for connection, authentication and session settings.
    pub fn from_config(mut self, config: &Config) -> Self {
        self.config = Some(config.clone());
        self
    }

    /// Set the metrics collector for request performance tracking.
    pub fn metrics(mut self, metrics: MetricsCollector) -> Self {
        self.metrics = Some(metrics);
        self
    }

    fn http_client(config: &Config) -> Result<reqwest::Client> {
        let conn = &config.connection;
        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(conn.connection_pool_size)
            .redirect(reqwest::redirect::Policy::limited(DEFAULT_MAX_REDIRECTS));

        if conn.tcp_keep_alive {
            builder = builder.tcp_keepalive(Duration::from_secs(DEFAULT_TCP_KEEP_ALIVE_SECS));
        }

        if !conn.verify {
            tracing::warn!("TLS certificate verification is disabled");
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(path) = &conn.verify_cert_path {
            let pem = std::fs::read(path).map_err(|e| {
                ClientError::Config(format!(
                    "cannot read certificate {}: {e}",
                    path.display()
                ))
            })?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| ClientError::Config(format!("invalid certificate: {e}")))?;
            builder = builder.add_root_certificate(cert);
        }

        for (scheme, url) in &conn.proxies {
            let proxy = match scheme.to_ascii_lowercase().as_str() {
                "http" => reqwest::Proxy::http(url),
                "https" => reqwest::Proxy::https(url),
                "all" => reqwest::Proxy::all(url),
                other => {
                    return Err(ClientError::Config(format!(
                        "unknown proxy scheme: {other}"
                    )));
                }
            }
            .map_err(|e| ClientError::Config(format!("invalid proxy {url}: {e}")))?;
            builder = builder.proxy(proxy);
        }

        builder
            .build()
            .map_err(|e| ClientError::Config(format!("cannot build HTTP client: {e}")))
    }

    /// Build the [`Tm1Client`] without contacting the server.
    ///
    /// The session is opened lazily by the first request.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Config`] if no configuration was given, if the
    /// configuration cannot address a server, or if the HTTP client fails to build.
    pub fn build(self) -> Result<Tm1Client> {
        let config = self
            .config
            .ok_or_else(|| ClientError::Config("configuration is required".to_string()))?;
        let roots = roots::resolve(&config)?;
        let http = Self::http_client(&config)?;
        tracing::debug!(base_url = %roots.base_url, "Building TM1 client");
        let rest = RestService::new(http, roots, Arc::new(config), self.metrics)?;
        Ok(Tm1Client {
            rest: Arc::new(rest),
        })
    }

    /// Build the client and open the session.
    pub async fn connect(self) -> Result<Tm1Client> {
        let client = self.build()?;
        client.login().await?;
        Ok(client)
    }
}
