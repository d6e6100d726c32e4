//! Common test utilities for integration tests.
//!
//! This module provides shared helper functions and re-exports commonly used
//! types for testing the TM1 client against a `wiremock` server.
//!
//! # Invariants
//! - Fixtures are loaded from the `fixtures/` directory relative to the crate root
//! - The mock server plays a v11 server rooted at `/api/v1`
//!
//! # What this does NOT handle
//! - Endpoint-specific mocks (mount them in the test that needs them)

#![allow(dead_code)]

#[allow(unused_imports)]
pub use tm1_client::testing::load_fixture;

#[allow(unused_imports)]
pub use tm1_client::{ClientError, Tm1Client};
#[allow(unused_imports)]
pub use tm1_config::{AuthConfig, Config};
#[allow(unused_imports)]
pub use wiremock::{Mock, MockServer, ResponseTemplate};

use wiremock::matchers::{method, path};

/// Service root the client derives from a base URL.
pub const API: &str = "/api/v1";

/// Login path for v11-style servers.
pub const LOGIN_PATH: &str = "/api/v1/Configuration/ProductVersion/$value";

pub const V11_VERSION: &str = "11.8.01300.1";
pub const V12_VERSION: &str = "12.0.0";

/// `/api/v1` + `suffix`.
pub fn api(suffix: &str) -> String {
    format!("{API}{suffix}")
}

/// Basic-auth config pointed at the mock server, with one retry.
pub fn basic_config(server: &MockServer) -> Config {
    let mut config = Config::with_base_url(server.uri(), AuthConfig::basic("admin", "apple"));
    config.session.max_retry_attempts = 1;
    config
}

/// Mount a login endpoint that sets `TM1SessionId=<session>` and reports `version`.
pub async fn mount_login(server: &MockServer, session: &str, version: &str) {
    Mock::given(method("GET"))
        .and(path(LOGIN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "set-cookie",
                    format!("TM1SessionId={session}; Path=/api/; HttpOnly; Secure").as_str(),
                )
                .set_body_string(version),
        )
        .mount(server)
        .await;
}

/// Client built from [`basic_config`] with a v11 login already mounted.
pub async fn connected_client(server: &MockServer) -> Tm1Client {
    mount_login(server, "session-1", V11_VERSION).await;
    Tm1Client::builder()
        .from_config(&basic_config(server))
        .connect()
        .await
        .expect("client connects to mock server")
}

/// Same as [`connected_client`] against a server reporting version 12.
pub async fn connected_v12_client(server: &MockServer) -> Tm1Client {
    mount_login(server, "session-12", V12_VERSION).await;
    Tm1Client::builder()
        .from_config(&basic_config(server))
        .connect()
        .await
        .expect("client connects to mock server")
}

/// OData error envelope.
pub fn error_body(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({ "error": { "code": code, "message": message } })
}

/// Requests the server received with `http_method` on `request_path`.
pub async fn received(
    server: &MockServer,
    http_method: &str,
    request_path: &str,
) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == http_method && r.url.path() == request_path)
        .collect()
}
