//! Validation tests for the configuration loader builder.
//!
//! Responsibilities:
//! - Test timeout bounds (zero, max boundary, unbounded).
//! - Test pool size and retry attempt bounds.
//! - Test URL validation for base and auxiliary roots.

use crate::constants::{MAX_CONNECTION_POOL_SIZE, MAX_MAX_RETRY_ATTEMPTS, MAX_TIMEOUT_SECS};
use crate::loader::builder::ConfigLoader;
use crate::loader::error::ConfigError;
use crate::types::Config;
use std::time::Duration;

fn loader() -> ConfigLoader {
    ConfigLoader::new().with_address("localhost").with_port(8010)
}

#[test]
fn test_timeout_zero_invalid() {
    let result = loader().with_timeout(Duration::from_secs(0)).build();
    match result {
        Err(ConfigError::InvalidTimeout { message }) => {
            assert!(
                message.contains("must be greater than 0"),
                "Expected message about timeout > 0, got: {}",
                message
            );
        }
        other => panic!("Expected InvalidTimeout, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_timeout_exceeds_max_invalid() {
    let result = loader()
        .with_timeout(Duration::from_secs(MAX_TIMEOUT_SECS + 1))
        .build();
    assert!(matches!(result, Err(ConfigError::InvalidTimeout { .. })));
}

#[test]
fn test_timeout_at_max_valid() {
    let config = loader()
        .with_timeout(Duration::from_secs(MAX_TIMEOUT_SECS))
        .build()
        .unwrap();
    assert_eq!(
        config.connection.timeout,
        Some(Duration::from_secs(MAX_TIMEOUT_SECS))
    );
}

#[test]
fn test_no_timeout_means_unbounded() {
    let config = loader().build().unwrap();
    assert!(config.connection.timeout.is_none());
}

#[test]
fn test_max_retry_attempts_bounds() {
    assert!(loader().with_max_retry_attempts(0).build().is_ok());
    assert!(
        loader()
            .with_max_retry_attempts(MAX_MAX_RETRY_ATTEMPTS)
            .build()
            .is_ok()
    );
    assert!(matches!(
        loader()
            .with_max_retry_attempts(MAX_MAX_RETRY_ATTEMPTS + 1)
            .build(),
        Err(ConfigError::InvalidMaxRetries { .. })
    ));
}

#[test]
fn test_pool_size_bounds() {
    let mut base = Config::default();
    base.connection.address = Some("localhost".into());

    base.connection.connection_pool_size = 0;
    assert!(matches!(
        ConfigLoader::new().with_config(base.clone()).build(),
        Err(ConfigError::InvalidPoolSize { .. })
    ));

    base.connection.connection_pool_size = MAX_CONNECTION_POOL_SIZE + 1;
    assert!(matches!(
        ConfigLoader::new().with_config(base.clone()).build(),
        Err(ConfigError::InvalidPoolSize { .. })
    ));

    base.connection.connection_pool_size = 32;
    assert!(ConfigLoader::new().with_config(base).build().is_ok());
}

#[test]
fn test_base_url_rejects_non_http_scheme() {
    let result = ConfigLoader::new()
        .with_base_url("ftp://tm1.local/api/v1")
        .build();
    match result {
        Err(ConfigError::InvalidValue { var, message }) => {
            assert_eq!(var, "base_url");
            assert!(message.contains("scheme"), "got: {message}");
        }
        other => panic!("Expected InvalidValue, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_base_url_rejects_relative() {
    let result = ConfigLoader::new().with_base_url("/api/v1").build();
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
fn test_auxiliary_urls_validated() {
    let mut base = Config::default();
    base.connection.address = Some("localhost".into());
    base.connection.iam_url = Some("not a url".into());

    let result = ConfigLoader::new().with_config(base).build();
    assert!(matches!(
        result,
        Err(ConfigError::InvalidValue { ref var, .. }) if var == "iam_url"
    ));
}

#[test]
fn test_cpd_url_normalized() {
    let mut base = Config::default();
    base.connection.address = Some("localhost".into());
    base.connection.cpd_url = Some("https://cpd.example.com/".into());

    let config = ConfigLoader::new().with_config(base).build().unwrap();
    assert_eq!(
        config.connection.cpd_url.as_deref(),
        Some("https://cpd.example.com")
    );
}
