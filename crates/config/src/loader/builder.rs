//! Configuration loader builder implementation.
//!
//! Responsibilities:
//! - Provide a builder-pattern `ConfigLoader` layering a base `Config`,
//!   environment values, and explicit builder overrides.
//! - Validate the merged result (target, URLs, timeout, pool size, retry bounds).
//!
//! Does NOT handle:
//! - Direct environment variable parsing logic (delegated to env.rs).
//!
//! Invariants / Assumptions:
//! - Precedence: builder methods > environment variables > base config > defaults.
//! - `load_dotenv()` must be called explicitly to enable `.env` file loading.
//! - The `DOTENV_DISABLED` variable is checked before `dotenvy::dotenv()` is called.

use secrecy::SecretString;
use std::time::Duration;

use super::env::apply_env;
use super::error::ConfigError;
use crate::constants::{MAX_CONNECTION_POOL_SIZE, MAX_MAX_RETRY_ATTEMPTS, MAX_TIMEOUT_SECS};
use crate::types::Config;

/// One layer of optional settings.
#[derive(Debug, Default, Clone)]
pub(crate) struct Overrides {
    pub address: Option<String>,
    pub port: Option<u16>,
    pub ssl: Option<bool>,
    pub base_url: Option<String>,
    pub user: Option<String>,
    pub password: Option<SecretString>,
    pub namespace: Option<String>,
    pub api_key: Option<SecretString>,
    pub tenant: Option<String>,
    pub database: Option<String>,
    pub instance: Option<String>,
    pub iam_url: Option<String>,
    pub cpd_url: Option<String>,
    pub access_token: Option<SecretString>,
    pub session_id: Option<SecretString>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub timeout: Option<Duration>,
    pub max_retry_attempts: Option<usize>,
    pub async_requests_mode: Option<bool>,
    pub verify: Option<bool>,
    pub session_context: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut Config) {
        let conn = &mut config.connection;
        let auth = &mut config.auth;
        let session = &mut config.session;

        if self.address.is_some() {
            conn.address = self.address;
        }
        if self.port.is_some() {
            conn.port = self.port;
        }
        if let Some(ssl) = self.ssl {
            conn.ssl = ssl;
        }
        if self.base_url.is_some() {
            conn.base_url = self.base_url;
        }
        if self.tenant.is_some() {
            conn.tenant = self.tenant;
        }
        if self.database.is_some() {
            conn.database = self.database;
        }
        if self.instance.is_some() {
            conn.instance = self.instance;
        }
        if self.iam_url.is_some() {
            conn.iam_url = self.iam_url;
        }
        if self.cpd_url.is_some() {
            conn.cpd_url = self.cpd_url;
        }
        if self.timeout.is_some() {
            conn.timeout = self.timeout;
        }
        if let Some(mode) = self.async_requests_mode {
            conn.async_requests_mode = mode;
        }
        if let Some(verify) = self.verify {
            conn.verify = verify;
        }

        if self.user.is_some() {
            auth.user = self.user;
        }
        if self.password.is_some() {
            auth.password = self.password;
        }
        if self.namespace.is_some() {
            auth.namespace = self.namespace;
        }
        if self.api_key.is_some() {
            auth.api_key = self.api_key;
        }
        if self.access_token.is_some() {
            auth.access_token = self.access_token;
        }
        if self.session_id.is_some() {
            auth.session_id = self.session_id;
        }
        if self.client_id.is_some() {
            auth.application_client_id = self.client_id;
        }
        if self.client_secret.is_some() {
            auth.application_client_secret = self.client_secret;
        }

        if let Some(retries) = self.max_retry_attempts {
            session.max_retry_attempts = retries;
        }
        if let Some(context) = self.session_context {
            session.session_context = context;
        }
    }
}

/// Configuration loader that builds config from environment variables and overrides.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    base: Config,
    env: Overrides,
    explicit: Overrides,
}

impl ConfigLoader {
    /// Create a new configuration loader starting from defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration instead of defaults.
    pub fn with_config(mut self, config: Config) -> Self {
        self.base = config;
        self
    }

    /// Check if dotenv loading is disabled via environment variable.
    fn dotenv_disabled() -> bool {
        matches!(
            std::env::var("DOTENV_DISABLED").ok().as_deref(),
            Some("true") | Some("1")
        )
    }

    /// Load environment variables from .env file if present.
    ///
    /// If `DOTENV_DISABLED` environment variable is set to "true" or "1",
    /// the .env file will not be loaded (useful for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The `.env` file exists but has invalid syntax (`ConfigError::DotenvParse`)
    /// - The `.env` file exists but cannot be read due to I/O errors (`ConfigError::DotenvIo`)
    ///
    /// Missing `.env` files are silently ignored (returns `Ok(self)`).
    pub fn load_dotenv(self) -> Result<Self, ConfigError> {
        if Self::dotenv_disabled() {
            return Ok(self);
        }

        match dotenvy::dotenv() {
            Ok(path) => {
                tracing::debug!(path = %path.display(), "Loaded .env file");
                Ok(self)
            }
            Err(e) if Self::is_not_found(&e) => Ok(self),
            Err(dotenvy::Error::LineParse(_, idx)) => {
                Err(ConfigError::DotenvParse { error_index: idx })
            }
            Err(dotenvy::Error::Io(io_err)) => Err(ConfigError::DotenvIo {
                kind: io_err.kind(),
            }),
            Err(_) => Err(ConfigError::DotenvUnknown),
        }
    }

    fn is_not_found(err: &dotenvy::Error) -> bool {
        matches!(
            err,
            dotenvy::Error::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound
        )
    }

    /// Read configuration from `TM1_*` environment variables.
    pub fn from_env(mut self) -> Result<Self, ConfigError> {
        apply_env(&mut self.env)?;
        Ok(self)
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.explicit.address = Some(address.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.explicit.port = Some(port);
        self
    }

    pub fn with_ssl(mut self, ssl: bool) -> Self {
        self.explicit.ssl = Some(ssl);
        self
    }

    /// Set an explicit service root (overrides address/port derivation).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.explicit.base_url = Some(url.into());
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.explicit.user = Some(user.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.explicit.password = Some(SecretString::new(password.into().into()));
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.explicit.namespace = Some(namespace.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.explicit.api_key = Some(SecretString::new(api_key.into().into()));
        self
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.explicit.tenant = Some(tenant.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.explicit.database = Some(database.into());
        self
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.explicit.instance = Some(instance.into());
        self
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.explicit.access_token = Some(SecretString::new(token.into().into()));
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.explicit.session_id = Some(SecretString::new(session_id.into().into()));
        self
    }

    /// Set the default per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.explicit.timeout = Some(timeout);
        self
    }

    pub fn with_max_retry_attempts(mut self, attempts: usize) -> Self {
        self.explicit.max_retry_attempts = Some(attempts);
        self
    }

    pub fn with_async_requests_mode(mut self, enabled: bool) -> Self {
        self.explicit.async_requests_mode = Some(enabled);
        self
    }

    /// Set whether to verify TLS certificates.
    pub fn with_verify(mut self, verify: bool) -> Self {
        self.explicit.verify = Some(verify);
        self
    }

    pub fn with_session_context(mut self, context: impl Into<String>) -> Self {
        self.explicit.session_context = Some(context.into());
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut config = self.base;
        self.env.apply(&mut config);
        self.explicit.apply(&mut config);

        let has_address = config
            .connection
            .address
            .as_deref()
            .is_some_and(|a| !a.trim().is_empty());
        if !has_address && config.connection.base_url.is_none() {
            return Err(ConfigError::MissingTarget);
        }

        if let Some(raw) = config.connection.base_url.take() {
            config.connection.base_url = Some(validate_and_normalize_url("base_url", &raw)?);
        }
        for (var, slot) in [
            ("auth_url", &mut config.connection.auth_url),
            ("iam_url", &mut config.connection.iam_url),
            ("cpd_url", &mut config.connection.cpd_url),
            ("pa_url", &mut config.connection.pa_url),
        ] {
            if let Some(raw) = slot.take() {
                *slot = Some(validate_and_normalize_url(var, &raw)?);
            }
        }

        Self::validate_limits(&config)?;
        tracing::debug!(
            address = ?config.connection.address,
            base_url = ?config.connection.base_url,
            async_requests_mode = config.connection.async_requests_mode,
            "Built TM1 client configuration"
        );
        Ok(config)
    }

    /// Validates timeout, pool size, and retry bounds.
    fn validate_limits(config: &Config) -> Result<(), ConfigError> {
        if let Some(timeout) = config.connection.timeout {
            if timeout.is_zero() {
                return Err(ConfigError::InvalidTimeout {
                    message: "timeout must be greater than 0 seconds".to_string(),
                });
            }
            if timeout.as_secs() > MAX_TIMEOUT_SECS {
                return Err(ConfigError::InvalidTimeout {
                    message: format!(
                        "timeout exceeds maximum allowed value of {} seconds",
                        MAX_TIMEOUT_SECS
                    ),
                });
            }
        }

        let pool = config.connection.connection_pool_size;
        if pool == 0 || pool > MAX_CONNECTION_POOL_SIZE {
            return Err(ConfigError::InvalidPoolSize {
                message: format!("must be between 1 and {} (got {})", MAX_CONNECTION_POOL_SIZE, pool),
            });
        }

        let retries = config.session.max_retry_attempts;
        if retries > MAX_MAX_RETRY_ATTEMPTS {
            return Err(ConfigError::InvalidMaxRetries {
                message: format!(
                    "must be between 0 and {} (got {})",
                    MAX_MAX_RETRY_ATTEMPTS, retries
                ),
            });
        }

        Ok(())
    }
}

/// Validates and normalizes a URL-valued setting.
///
/// Validation rules:
/// - Trim surrounding whitespace
/// - Parse as an absolute URL with http or https scheme and a host
/// - Normalize by stripping trailing slash
pub(crate) fn validate_and_normalize_url(var: &str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim();

    let parsed = url::Url::parse(trimmed).map_err(|e| ConfigError::InvalidValue {
        var: var.into(),
        message: format!(
            "must be an absolute http(s) URL with a host (e.g. https://localhost:8010/api/v1): {e}"
        ),
    })?;

    let scheme = parsed.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(ConfigError::InvalidValue {
            var: var.into(),
            message: format!("scheme must be http or https, got: {scheme}"),
        });
    }

    if parsed.host_str().is_none() {
        return Err(ConfigError::InvalidValue {
            var: var.into(),
            message: "host is required".into(),
        });
    }

    Ok(parsed.as_str().trim_end_matches('/').to_string())
}
