//! Environment variable parsing for configuration.
//!
//! Responsibilities:
//! - Read and parse `TM1_*` environment variables into a loader layer.
//! - Provide a helper for reading env vars with empty/whitespace filtering.
//!
//! Invariants:
//! - Empty or whitespace-only environment variables are treated as unset.
//! - Returned values are trimmed (leading/trailing whitespace removed).
//! - Invalid numeric or boolean values return `ConfigError::InvalidValue`.

use secrecy::SecretString;
use std::str::FromStr;
use std::time::Duration;

use super::builder::Overrides;
use super::error::ConfigError;

/// Read an environment variable, returning None if unset, empty, or whitespace-only.
/// Returns the trimmed value (leading/trailing whitespace removed) if present.
pub fn env_var_or_none(key: &str) -> Option<String> {
    std::env::var(key).ok().and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else if trimmed.len() == s.len() {
            Some(s)
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn secret(key: &str) -> Option<SecretString> {
    env_var_or_none(key).map(|v| SecretString::new(v.into()))
}

fn parsed<T: FromStr>(key: &str, expected: &str) -> Result<Option<T>, ConfigError> {
    env_var_or_none(key)
        .map(|raw| {
            raw.parse().map_err(|_| ConfigError::InvalidValue {
                var: key.to_string(),
                message: format!("must be {expected}"),
            })
        })
        .transpose()
}

fn flag(key: &str) -> Result<Option<bool>, ConfigError> {
    env_var_or_none(key)
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "t" => Ok(true),
            "false" | "0" | "no" | "f" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                var: key.to_string(),
                message: "must be true or false".to_string(),
            }),
        })
        .transpose()
}

/// Read every recognized `TM1_*` variable into `layer`.
pub(crate) fn apply_env(layer: &mut Overrides) -> Result<(), ConfigError> {
    layer.address = env_var_or_none("TM1_ADDRESS");
    layer.port = parsed("TM1_PORT", "a port number")?;
    layer.ssl = flag("TM1_SSL")?;
    layer.base_url = env_var_or_none("TM1_BASE_URL");
    layer.user = env_var_or_none("TM1_USER");
    layer.password = secret("TM1_PASSWORD");
    layer.namespace = env_var_or_none("TM1_NAMESPACE");
    layer.api_key = secret("TM1_API_KEY");
    layer.tenant = env_var_or_none("TM1_TENANT");
    layer.database = env_var_or_none("TM1_DATABASE");
    layer.instance = env_var_or_none("TM1_INSTANCE");
    layer.iam_url = env_var_or_none("TM1_IAM_URL");
    layer.cpd_url = env_var_or_none("TM1_CPD_URL");
    layer.access_token = secret("TM1_ACCESS_TOKEN");
    layer.session_id = secret("TM1_SESSION_ID");
    layer.client_id = env_var_or_none("TM1_CLIENT_ID");
    layer.client_secret = secret("TM1_CLIENT_SECRET");
    layer.timeout = parsed::<f64>("TM1_TIMEOUT", "a number of seconds")?
        .map(|secs| {
            Duration::try_from_secs_f64(secs).map_err(|_| ConfigError::InvalidTimeout {
                message: format!("TM1_TIMEOUT must be a non-negative number (got {secs})"),
            })
        })
        .transpose()?;
    layer.max_retry_attempts = parsed("TM1_MAX_RETRY_ATTEMPTS", "a non-negative integer")?;
    layer.async_requests_mode = flag("TM1_ASYNC_REQUESTS_MODE")?;
    layer.verify = flag("TM1_VERIFY")?;
    layer.session_context = env_var_or_none("TM1_SESSION_CONTEXT");
    Ok(())
}
