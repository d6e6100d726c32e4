//! Single-exchange request primitives.
//!
//! This module sends one HTTP exchange and turns the outcome into either a
//! buffered [`Tm1Response`] or a mapped [`ClientError`]. Retry, re-login and
//! async orchestration are layered on top by `client::rest`.

use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::AuthenticationMode;
use crate::error::{ClientError, Result};
use crate::models::ErrorEnvelope;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// A fully buffered response.
#[derive(Debug, Clone)]
pub struct Tm1Response {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Tm1Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            ClientError::ProtocolError(format!("unexpected response body: {e}"))
        })
    }

    /// Body as text, lossily decoded.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body of a `$value` endpoint: trimmed, surrounding quotes removed.
    pub fn plain_value(&self) -> String {
        let text = self.text();
        let trimmed = text.trim();
        trimmed
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(trimmed)
            .to_string()
    }

    /// First value of a header, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Send one exchange and buffer the response.
///
/// A reqwest timeout is reported as [`ClientError::Timeout`] carrying the
/// deadline that was applied.
pub async fn send(
    http: &Client,
    method: Method,
    url: &str,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    timeout: Option<Duration>,
) -> Result<Tm1Response> {
    let mut builder = http.request(method, url).headers(headers);
    if let Some(b) = body {
        builder = builder.body(b);
    }
    execute(builder, timeout).await
}

/// POST an `application/x-www-form-urlencoded` body.
///
/// Any `Content-Type` in `headers` is replaced by the form type.
pub async fn send_form<T: Serialize + ?Sized>(
    http: &Client,
    url: &str,
    mut headers: HeaderMap,
    form: &T,
    timeout: Option<Duration>,
) -> Result<Tm1Response> {
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE));
    let builder = http.post(url).headers(headers).form(form);
    execute(builder, timeout).await
}

async fn execute(mut builder: RequestBuilder, timeout: Option<Duration>) -> Result<Tm1Response> {
    if let Some(t) = timeout {
        builder = builder.timeout(t);
    }
    let map_err = |e: reqwest::Error| {
        if e.is_timeout() {
            ClientError::Timeout(timeout)
        } else {
            ClientError::Transport(e)
        }
    };
    let response = builder.send().await.map_err(map_err)?;
    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let body = response.bytes().await.map_err(map_err)?.to_vec();
    Ok(Tm1Response {
        status,
        headers,
        body,
    })
}

/// Map a status >= 400 to the matching error; pass anything else through.
pub fn check_status(
    response: Tm1Response,
    method: &Method,
    path: &str,
    mode: AuthenticationMode,
) -> Result<Tm1Response> {
    if response.status < 400 {
        return Ok(response);
    }
    let (code, message) = match serde_json::from_slice::<ErrorEnvelope>(&response.body) {
        Ok(envelope) => (envelope.error.code, envelope.error.message),
        Err(_) => (None, response.text()),
    };
    debug!(status = response.status, %method, path, "Request failed");
    let path = path.to_string();
    Err(match response.status {
        401 => ClientError::AuthFailure {
            mode,
            path,
            reason: if message.is_empty() {
                "unauthorized".to_string()
            } else {
                message
            },
        },
        403 => ClientError::Forbidden { path, message },
        404 => ClientError::NotFound { path, message },
        409 => ClientError::Conflict { path, message },
        status => ClientError::ServerError {
            status,
            code,
            message,
            method: method.to_string(),
            path,
        },
    })
}

/// Delay before the retry that leaves `attempts_left` attempts: `2^(max - attempts_left)` seconds.
pub fn backoff(max_attempts: usize, attempts_left: usize) -> Duration {
    let exponent = max_attempts.saturating_sub(attempts_left).min(16) as u32;
    Duration::from_secs(2u64.pow(exponent))
}
