//! Token exchange endpoints used before a TM1 session exists.

use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::auth::AuthenticationMode;
use crate::endpoints::request::{check_status, send, send_form};
use crate::error::{ClientError, Result};

const IAM_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

fn token_field(body: &serde_json::Value, field: &str, endpoint: &str) -> Result<SecretString> {
    body[field]
        .as_str()
        .filter(|t| !t.is_empty())
        .map(|t| SecretString::new(t.to_string().into()))
        .ok_or_else(|| {
            ClientError::ProtocolError(format!("missing {field} in response from {endpoint}"))
        })
}

/// Exchange an IBM Cloud API key for an IAM access token.
pub async fn iam_token(
    client: &Client,
    iam_url: &str,
    api_key: &SecretString,
    timeout: Option<Duration>,
) -> Result<SecretString> {
    let url = format!("{}/identity/token", iam_url.trim_end_matches('/'));
    debug!(url = %url, "Requesting IAM access token");

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let form = [
        ("grant_type", IAM_GRANT_TYPE),
        ("apikey", api_key.expose_secret()),
    ];
    let response = send_form(client, &url, headers, &form, timeout).await?;
    let response = check_status(
        response,
        &Method::POST,
        "/identity/token",
        AuthenticationMode::IbmCloudApiKey,
    )?;
    let body: serde_json::Value = response.json()?;
    token_field(&body, "access_token", &url)
}

/// Sign in to Cloud Pak for Data at `signin_url` and return its bearer token.
pub async fn cpd_signin(
    client: &Client,
    signin_url: &str,
    username: &str,
    password: &SecretString,
    timeout: Option<Duration>,
) -> Result<SecretString> {
    let url = signin_url.to_string();
    debug!(url = %url, user = username, "Signing in to Cloud Pak for Data");

    let body = serde_json::to_vec(&serde_json::json!({
        "username": username,
        "password": password.expose_secret(),
    }))?;
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let response = send(client, Method::POST, &url, headers, Some(body), timeout).await?;
    let response = check_status(
        response,
        &Method::POST,
        "/v1/preauth/signin",
        AuthenticationMode::PaProxy,
    )?;
    let body: serde_json::Value = response.json()?;
    token_field(&body, "token", &url)
}
