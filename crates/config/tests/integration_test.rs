//! Integration tests for configuration loading through the public API.

use secrecy::ExposeSecret;
use std::time::Duration;
use tm1_config::{AuthConfig, Config, ConfigError, ConfigLoader, env_var_or_none};

#[test]
fn test_config_loader_builder_chain() {
    let config = ConfigLoader::new()
        .with_address("tm1.example.com")
        .with_port(8010)
        .with_user("admin")
        .with_password("apple")
        .with_timeout(Duration::from_secs(120))
        .build()
        .expect("should build with explicit values");

    assert_eq!(config.connection.address.as_deref(), Some("tm1.example.com"));
    assert_eq!(config.connection.timeout, Some(Duration::from_secs(120)));
    assert_eq!(config.auth.password.unwrap().expose_secret(), "apple");
}

#[test]
fn test_env_var_or_none_exported() {
    let _result: Option<String> = env_var_or_none("TM1_ADDRESS");
}

#[test]
fn test_missing_target_message_names_variables() {
    let err = ConfigLoader::new().build().unwrap_err();
    assert!(matches!(err, ConfigError::MissingTarget));
    let message = err.to_string();
    assert!(message.contains("TM1_ADDRESS"));
    assert!(message.contains("TM1_BASE_URL"));
}

#[test]
fn test_config_json_keeps_session_policy() {
    let mut config = Config::v12_instance(
        "pa.local",
        Some(4444),
        "tm1",
        "Planning Sample",
        AuthConfig::service_to_service("client", "secret", "admin"),
    );
    config.session.keep_alive = true;
    config.session.impersonate = Some("Marketing".into());

    let json = config.to_json().unwrap();
    let back = Config::from_json(&json).unwrap();

    assert!(back.session.keep_alive);
    assert_eq!(back.session.impersonate.as_deref(), Some("Marketing"));
    assert_eq!(back.connection.instance.as_deref(), Some("tm1"));
    assert_eq!(
        back.auth.application_client_secret.unwrap().expose_secret(),
        "secret"
    );
}
