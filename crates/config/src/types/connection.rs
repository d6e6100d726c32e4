//! Connection configuration types for the TM1 client.
//!
//! Responsibilities:
//! - Define transport settings (target address, deployment roots, TLS, pooling, proxies, timeouts).
//! - Define the main `Config` structure combining connection, auth, and session policy.
//! - Provide convenience constructors for common deployment shapes.
//!
//! Does NOT handle:
//! - Configuration loading from env (see `loader` module).
//! - Deriving service/auth roots from these fields (see client crate `roots`).
//!
//! Invariants:
//! - Durations are serialized as (fractional) seconds; `None` means "no timeout".
//! - Default values are provided via `Default` impls, not magic numbers.

use crate::constants::DEFAULT_CONNECTION_POOL_SIZE;
use crate::types::auth::AuthConfig;
use crate::types::session::SessionConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Module for serializing `Option<Duration>` as optional seconds.
mod opt_duration_seconds {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.map(|d| d.as_secs_f64()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<f64>::deserialize(deserializer)?;
        match secs {
            Some(s) if s.is_finite() && s >= 0.0 => Ok(Some(Duration::from_secs_f64(s))),
            Some(s) => Err(serde::de::Error::custom(format!(
                "timeout must be a non-negative number of seconds, got {s}"
            ))),
            None => Ok(None),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_pool_size() -> usize {
    DEFAULT_CONNECTION_POOL_SIZE
}

/// Transport-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Host name or IP of the TM1 server, proxy, or cloud region.
    #[serde(default)]
    pub address: Option<String>,
    /// HTTP port (v11 and v12 instance deployments).
    #[serde(default)]
    pub port: Option<u16>,
    /// Use HTTPS.
    #[serde(default = "default_true")]
    pub ssl: bool,
    /// Explicit service root; overrides address/port derivation.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Explicit authentication endpoint.
    #[serde(default)]
    pub auth_url: Option<String>,
    /// PA 12 instance name.
    #[serde(default)]
    pub instance: Option<String>,
    /// Database (TM1 server) name for cloud, v12, and PA proxy deployments.
    #[serde(default)]
    pub database: Option<String>,
    /// IBM Cloud tenant id.
    #[serde(default)]
    pub tenant: Option<String>,
    /// IAM token service root.
    #[serde(default)]
    pub iam_url: Option<String>,
    /// Planning Analytics root replacing `http(s)://{address}` behind a CPD proxy.
    #[serde(default)]
    pub pa_url: Option<String>,
    /// Cloud Pak for Data root (selects PA proxy mode).
    #[serde(default)]
    pub cpd_url: Option<String>,
    /// Default per-request timeout.
    #[serde(default, with = "opt_duration_seconds")]
    pub timeout: Option<Duration>,
    /// Maximum idle pooled connections per host.
    #[serde(default = "default_pool_size")]
    pub connection_pool_size: usize,
    /// Enable TCP keep-alive probes.
    #[serde(default)]
    pub tcp_keep_alive: bool,
    /// Verify TLS certificates.
    #[serde(default = "default_true")]
    pub verify: bool,
    /// PEM bundle with additional trusted roots.
    #[serde(default)]
    pub verify_cert_path: Option<PathBuf>,
    /// Proxy URLs keyed by scheme (`http`, `https`, or `all`).
    #[serde(default)]
    pub proxies: BTreeMap<String, String>,
    /// Wrap each request in a server-side asynchronous operation.
    #[serde(default)]
    pub async_requests_mode: bool,
    /// Cancel the server-side operation when an async request times out.
    #[serde(default)]
    pub cancel_at_timeout: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            address: None,
            port: None,
            ssl: true,
            base_url: None,
            auth_url: None,
            instance: None,
            database: None,
            tenant: None,
            iam_url: None,
            pa_url: None,
            cpd_url: None,
            timeout: None,
            connection_pool_size: DEFAULT_CONNECTION_POOL_SIZE,
            tcp_keep_alive: false,
            verify: true,
            verify_cert_path: None,
            proxies: BTreeMap::new(),
            async_requests_mode: false,
            cancel_at_timeout: false,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Transport settings
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Credentials
    #[serde(default)]
    pub auth: AuthConfig,
    /// Session lifecycle policy
    #[serde(default)]
    pub session: SessionConfig,
}

impl Config {
    /// A TM1 11.x server reached at `address:port` with username/password.
    pub fn v11(
        address: impl Into<String>,
        port: u16,
        ssl: bool,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            connection: ConnectionConfig {
                address: Some(address.into()),
                port: Some(port),
                ssl,
                ..ConnectionConfig::default()
            },
            auth: AuthConfig::basic(user, password),
            session: SessionConfig::default(),
        }
    }

    /// A server reached through an explicit service root.
    pub fn with_base_url(base_url: impl Into<String>, auth: AuthConfig) -> Self {
        Self {
            connection: ConnectionConfig {
                base_url: Some(base_url.into()),
                ..ConnectionConfig::default()
            },
            auth,
            session: SessionConfig::default(),
        }
    }

    /// An IBM Planning Analytics as a Service database.
    pub fn ibm_cloud(
        address: impl Into<String>,
        tenant: impl Into<String>,
        database: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            connection: ConnectionConfig {
                address: Some(address.into()),
                tenant: Some(tenant.into()),
                database: Some(database.into()),
                ssl: true,
                async_requests_mode: true,
                ..ConnectionConfig::default()
            },
            auth: AuthConfig::api_key(api_key),
            session: SessionConfig::default(),
        }
    }

    /// A Planning Analytics 12 database addressed through its instance.
    pub fn v12_instance(
        address: impl Into<String>,
        port: Option<u16>,
        instance: impl Into<String>,
        database: impl Into<String>,
        auth: AuthConfig,
    ) -> Self {
        Self {
            connection: ConnectionConfig {
                address: Some(address.into()),
                port,
                instance: Some(instance.into()),
                database: Some(database.into()),
                ..ConnectionConfig::default()
            },
            auth,
            session: SessionConfig::default(),
        }
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from JSON; omitted fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
