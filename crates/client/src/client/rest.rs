//! The HTTP engine shared by every façade.
//!
//! Responsibilities:
//! - Compose URLs and headers for each call and attach the session credential.
//! - Establish, reuse and re-establish the server session.
//! - Re-login on expired sessions and reconnect on dropped connections.
//! - Drive the asynchronous request protocol (`Prefer: respond-async`).
//!
//! Does NOT handle:
//! - Entity semantics or payload shapes (see the façade modules).
//!
//! Invariants:
//! - Re-login is single-flight: the login gate is held while a session is
//!   established, and a caller that finds a newer session than the one it
//!   failed with reuses it instead of logging in again.
//! - Login, logout and async polls never go through the retry loop, so the
//!   gate is never re-entered.
//! - An async operation that times out or is cancelled is deleted on the
//!   server only when asked to (timeout) or on a best-effort basis (cancel).

use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::header::{
    ACCEPT, AUTHORIZATION, CONTENT_TYPE, COOKIE, HeaderMap, HeaderName, HeaderValue, SET_COOKIE,
    USER_AGENT,
};
use reqwest::{Client, Method};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tm1_config::Config;
use tm1_config::constants::{V11_SESSION_COOKIE, V12_SESSION_COOKIE};
use tracing::{debug, info, warn};

use crate::auth::{AuthenticationMode, Session, SessionManager, first_cookie_pair, static_authorization};
use crate::cancellation::CancellationToken;
use crate::endpoints::async_ops::{async_path, decode_async_result, is_pending, parse_async_id, poll_delay};
use crate::endpoints::auth::{cpd_signin, iam_token};
use crate::endpoints::request::{Tm1Response, backoff, check_status, send, send_form};
use crate::endpoints::url_encoding::escape_spaces;
use crate::error::{ClientError, Result};
use crate::metrics::MetricsCollector;
use crate::roots::ServiceRoots;
use crate::version::{self, Feature};

const ACCEPT_VALUE: &str = "application/json;odata.metadata=none,text/plain";
const CONTENT_TYPE_VALUE: &str = "application/json; odata.streaming=true; charset=utf-8";
const SESSION_CONTEXT_HEADER: &str = "TM1-SessionContext";
const IMPERSONATE_HEADER: &str = "TM1-Impersonate";
const PREFER_HEADER: &str = "Prefer";
const RESPOND_ASYNC: &str = "respond-async";
const PRODUCT_VERSION_PATH: &str = "/Configuration/ProductVersion/$value";
const CLOSE_SESSION_PATH: &str = "/ActiveSession/tm1.Close";

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    /// Overrides the configured async mode for this call.
    pub async_mode: Option<bool>,
    pub cancellation: Option<CancellationToken>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Zero means no deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn async_mode(mut self, enabled: bool) -> Self {
        self.async_mode = Some(enabled);
        self
    }

    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

fn header_value(value: &str, what: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|_| ClientError::InvalidArgument(format!("invalid {what} header value")))
}

fn sensitive(value: &str) -> Result<HeaderValue> {
    let mut v = header_value(value, "credential")?;
    v.set_sensitive(true);
    Ok(v)
}

/// Headers sent on every call.
pub(crate) fn default_headers(config: &Config) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_VALUE));
    headers.insert(
        SESSION_CONTEXT_HEADER,
        header_value(&config.session.session_context, "session context")?,
    );
    headers.insert(
        USER_AGENT,
        header_value(
            &format!("tm1-client/{}", env!("CARGO_PKG_VERSION")),
            "user agent",
        )?,
    );
    if let Some(user) = &config.session.impersonate {
        headers.insert(IMPERSONATE_HEADER, header_value(user, "impersonation")?);
    }
    Ok(headers)
}

/// Label used for metrics: the leading collection of a path.
fn endpoint_label(path: &str) -> &str {
    let end = path
        .char_indices()
        .skip(1)
        .find(|(_, c)| matches!(c, '(' | '?' | '/'))
        .map_or(path.len(), |(i, _)| i);
    &path[..end]
}

async fn wait_cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(t) => t.cancelled().await,
        None => std::future::pending().await,
    }
}

/// Shared HTTP engine. `Send + Sync`; clone the owning `Arc` to share it.
#[derive(Debug)]
pub struct RestService {
    http: Client,
    roots: ServiceRoots,
    config: Arc<Config>,
    session: SessionManager,
    metrics: Option<MetricsCollector>,
    default_headers: HeaderMap,
}

impl RestService {
    pub(crate) fn new(
        http: Client,
        roots: ServiceRoots,
        config: Arc<Config>,
        metrics: Option<MetricsCollector>,
    ) -> Result<Self> {
        let mode = AuthenticationMode::resolve(&config);
        let default_headers = default_headers(&config)?;
        Ok(Self {
            http,
            roots,
            config,
            session: SessionManager::new(mode),
            metrics,
            default_headers,
        })
    }

    pub fn roots(&self) -> &ServiceRoots {
        &self.roots
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn mode(&self) -> AuthenticationMode {
        self.session.mode()
    }

    pub fn session(&self) -> Arc<Session> {
        self.session.current()
    }

    pub(crate) fn metrics(&self) -> Option<&MetricsCollector> {
        self.metrics.as_ref()
    }

    fn url(&self, path: &str) -> String {
        escape_spaces(&format!("{}{}", self.roots.base_url, path))
    }

    /// Per-call timeout, else the configured one; zero means unbounded.
    fn effective_timeout(&self, opts: &RequestOptions) -> Option<Duration> {
        opts.timeout
            .or(self.config.connection.timeout)
            .filter(|t| !t.is_zero())
    }

    fn headers_for(&self, session: &Session, opts: &RequestOptions) -> Result<HeaderMap> {
        let mut headers = self.default_headers.clone();
        for (name, value) in &opts.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| ClientError::InvalidArgument(format!("invalid header name: {name}")))?;
            headers.insert(name, header_value(value, "request")?);
        }
        if let Some(cookie) = session.cookie() {
            headers.insert(COOKIE, sensitive(cookie)?);
        } else if let Some(authorization) = session.authorization() {
            headers.insert(AUTHORIZATION, sensitive(authorization)?);
        }
        Ok(headers)
    }

    // ------------------------------------------------------------------
    // Public verbs
    // ------------------------------------------------------------------

    /// Send a request with the full retry, re-login and async policy.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
        opts: &RequestOptions,
    ) -> Result<Tm1Response> {
        let started = Instant::now();
        let label = endpoint_label(path);
        if let Some(m) = &self.metrics {
            m.record_request(label, method.as_str());
        }
        let result = self.request_with_retry(&method, path, body, opts).await;
        if let Some(m) = &self.metrics {
            let status = match &result {
                Ok(r) => Some(r.status),
                Err(e) => e.status(),
            };
            m.record_request_duration(label, method.as_str(), started.elapsed(), status);
            if let Err(e) = &result {
                m.record_error(label, method.as_str(), e);
            }
        }
        result
    }

    pub async fn get(&self, path: &str) -> Result<Tm1Response> {
        self.request(Method::GET, path, None, &RequestOptions::default())
            .await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get(path).await?.json()
    }

    pub async fn post(&self, path: &str, body: &serde_json::Value) -> Result<Tm1Response> {
        self.request(
            Method::POST,
            path,
            Some(serde_json::to_vec(body)?),
            &RequestOptions::default(),
        )
        .await
    }

    pub async fn patch(&self, path: &str, body: &serde_json::Value) -> Result<Tm1Response> {
        self.request(
            Method::PATCH,
            path,
            Some(serde_json::to_vec(body)?),
            &RequestOptions::default(),
        )
        .await
    }

    pub async fn put_bytes(&self, path: &str, body: Vec<u8>) -> Result<Tm1Response> {
        let opts = RequestOptions::default().header("Content-Type", "application/octet-stream");
        self.request(Method::PUT, path, Some(body), &opts).await
    }

    pub async fn delete(&self, path: &str) -> Result<Tm1Response> {
        self.request(Method::DELETE, path, None, &RequestOptions::default())
            .await
    }

    /// DELETE that treats 404 as success.
    pub async fn delete_absent_ok(&self, path: &str) -> Result<()> {
        match self.delete(path).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// GET that maps 404 to `false`.
    pub async fn exists(&self, path: &str) -> Result<bool> {
        match self.get(path).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    // ------------------------------------------------------------------
    // Retry loop
    // ------------------------------------------------------------------

    fn should_reconnect(&self, err: &ClientError) -> bool {
        let policy = &self.config.session;
        match err {
            ClientError::AuthFailure { .. } => {
                self.mode().allows_relogin() && policy.reconnect_on_session_timeout
            }
            e if e.is_connection_loss() => policy.reconnect_on_remote_disconnect,
            _ => false,
        }
    }

    async fn request_with_retry(
        &self,
        method: &Method,
        path: &str,
        body: Option<Vec<u8>>,
        opts: &RequestOptions,
    ) -> Result<Tm1Response> {
        let max_attempts = self.config.session.max_retry_attempts;
        let mut attempts_left = max_attempts;
        loop {
            let session = self.ensure_session().await?;
            let result = self
                .dispatch(method, path, body.clone(), opts, &session)
                .await;
            match result {
                Err(err) if attempts_left > 0 && self.should_reconnect(&err) => {
                    let delay = backoff(max_attempts, attempts_left);
                    attempts_left -= 1;
                    let reason = if err.is_auth_error() {
                        "session_timeout"
                    } else {
                        "remote_disconnect"
                    };
                    warn!(
                        %method,
                        path,
                        reason,
                        attempts_left,
                        delay_ms = delay.as_millis() as u64,
                        "Request failed, re-establishing session"
                    );
                    tokio::time::sleep(delay).await;
                    if let Some(m) = &self.metrics {
                        m.record_relogin(reason);
                    }
                    self.relogin(session.generation()).await?;
                }
                other => return other,
            }
        }
    }

    /// One attempt: send, then follow the async protocol when the server defers.
    async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        body: Option<Vec<u8>>,
        opts: &RequestOptions,
        session: &Session,
    ) -> Result<Tm1Response> {
        if opts.cancellation.as_ref().is_some_and(|t| t.is_cancelled()) {
            return Err(ClientError::Cancelled);
        }
        let mut headers = self.headers_for(session, opts)?;
        let async_mode = opts
            .async_mode
            .unwrap_or(self.config.connection.async_requests_mode);
        if async_mode {
            headers.insert(PREFER_HEADER, HeaderValue::from_static(RESPOND_ASYNC));
        }
        let timeout = self.effective_timeout(opts);
        debug!(%method, path, async_mode, "Sending request");
        let response = send(
            &self.http,
            method.clone(),
            &self.url(path),
            headers,
            body,
            timeout,
        )
        .await?;

        let response = if async_mode && response.status == 202 {
            let id = parse_async_id(response.header("location"))?;
            self.poll_async(&id, session, timeout, opts.cancellation.as_ref())
                .await?
        } else {
            response
        };
        check_status(response, method, path, self.mode())
    }

    async fn poll_async(
        &self,
        id: &str,
        session: &Session,
        timeout: Option<Duration>,
        cancellation: Option<&CancellationToken>,
    ) -> Result<Tm1Response> {
        let deadline = timeout.map(|t| Instant::now() + t);
        let poll_url = self.url(&async_path(id));
        debug!(async_id = id, "Polling async operation");
        let mut attempt = 0usize;
        loop {
            let delay = poll_delay(attempt);
            attempt += 1;
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = wait_cancelled(cancellation) => {
                    info!(async_id = id, "Async operation cancelled by caller");
                    self.cancel_async(id, session).await;
                    return Err(ClientError::Cancelled);
                }
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(self.async_timed_out(id, session, timeout).await);
            }
            let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            let headers = self.headers_for(session, &RequestOptions::default())?;
            let poll = match send(&self.http, Method::GET, &poll_url, headers, None, remaining).await
            {
                Ok(poll) => poll,
                Err(ClientError::Timeout(_)) => {
                    return Err(self.async_timed_out(id, session, timeout).await);
                }
                Err(e) => return Err(e),
            };
            if let Some(m) = &self.metrics {
                m.record_async_poll();
            }
            if is_pending(&poll) {
                continue;
            }
            debug!(async_id = id, polls = attempt, "Async operation finished");
            return decode_async_result(poll);
        }
    }

    /// Deadline reached while polling: cancel when configured, report the caller's deadline.
    async fn async_timed_out(
        &self,
        id: &str,
        session: &Session,
        timeout: Option<Duration>,
    ) -> ClientError {
        warn!(async_id = id, "Async operation timed out");
        if self.config.connection.cancel_at_timeout {
            self.cancel_async(id, session).await;
        }
        ClientError::Timeout(timeout)
    }

    /// Best-effort DELETE of an async operation.
    async fn cancel_async(&self, id: &str, session: &Session) {
        let result: Result<Tm1Response> = async {
            let headers = self.headers_for(session, &RequestOptions::default())?;
            send(
                &self.http,
                Method::DELETE,
                &self.url(&async_path(id)),
                headers,
                None,
                self.config.connection.timeout,
            )
            .await
        }
        .await;
        if let Err(e) = result {
            debug!(async_id = id, error = %e, "Failed to cancel async operation");
        }
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Current session, logging in first if none is established.
    pub(crate) async fn ensure_session(&self) -> Result<Arc<Session>> {
        let current = self.session.current();
        if current.is_established() {
            return Ok(current);
        }
        let _gate = self.session.lock_gate().await;
        let current = self.session.current();
        if current.is_established() {
            return Ok(current);
        }
        self.establish_session().await
    }

    /// Re-login unless another task already replaced the session seen at `seen_generation`.
    async fn relogin(&self, seen_generation: u64) -> Result<Arc<Session>> {
        let _gate = self.session.lock_gate().await;
        let current = self.session.current();
        if current.is_established() && current.generation() != seen_generation {
            debug!(generation = current.generation(), "Session already re-established");
            return Ok(current);
        }
        self.establish_session().await
    }

    /// Drop the current session and log in again.
    pub async fn re_authenticate(&self) -> Result<()> {
        let _gate = self.session.lock_gate().await;
        self.session.clear();
        self.establish_session().await.map(|_| ())
    }

    /// Log in according to the authentication mode. Callers hold the gate.
    async fn establish_session(&self) -> Result<Arc<Session>> {
        let mode = self.mode();
        let auth = &self.config.auth;
        let timeout = self.config.connection.timeout.filter(|t| !t.is_zero());

        if mode == AuthenticationMode::SessionReuse {
            let id = auth
                .session_id
                .as_ref()
                .map(|s| s.expose_secret().to_string())
                .unwrap_or_default();
            let cookie_name =
                if self.config.connection.instance.is_some() || self.roots.is_database_root() {
                    V12_SESSION_COOKIE
                } else {
                    V11_SESSION_COOKIE
                };
            info!(mode = %mode, "Reusing existing session");
            let session = self
                .session
                .install(Some(format!("{cookie_name}={id}")), None, None);
            return self.check_impersonation(session).await;
        }

        let mut headers = self.default_headers.clone();
        let mut authorization: Option<SecretString> = None;
        let mut jwt: Option<SecretString> = None;
        let (method, url, body) = match mode {
            AuthenticationMode::PaProxy => {
                let user = auth.user.as_deref().unwrap_or_default();
                let password = auth
                    .password
                    .clone()
                    .unwrap_or_else(|| SecretString::new(String::new().into()));
                let token =
                    cpd_signin(&self.http, &self.roots.auth_url, user, &password, timeout).await?;
                let session_url = self.roots.session_url.clone().ok_or_else(|| {
                    ClientError::Config("PA proxy requires a session url".to_string())
                })?;
                jwt = Some(token);
                (Method::POST, session_url, None)
            }
            AuthenticationMode::IbmCloudApiKey => {
                let iam_url = self.roots.iam_url.as_deref().ok_or_else(|| {
                    ClientError::Config("IBM Cloud requires an IAM url".to_string())
                })?;
                let api_key = auth.api_key.as_ref().ok_or_else(|| {
                    ClientError::Config("IBM Cloud requires an api_key".to_string())
                })?;
                let token = iam_token(&self.http, iam_url, api_key, timeout).await?;
                authorization = Some(SecretString::new(
                    format!("Bearer {}", token.expose_secret()).into(),
                ));
                (Method::GET, self.roots.auth_url.clone(), None)
            }
            AuthenticationMode::ServiceToService => {
                authorization = static_authorization(mode, auth)?;
                let user = auth.user.as_deref().unwrap_or_default();
                let body = serde_json::to_vec(&serde_json::json!({ "User": user }))?;
                (Method::POST, self.roots.auth_url.clone(), Some(body))
            }
            _ => {
                authorization = static_authorization(mode, auth)?;
                (Method::GET, self.roots.auth_url.clone(), None)
            }
        };
        if let Some(a) = &authorization {
            headers.insert(AUTHORIZATION, sensitive(a.expose_secret())?);
        }

        debug!(mode = %mode, url = %url, "Logging in");
        let response = match &jwt {
            Some(token) => {
                let form = [("jwt", token.expose_secret())];
                send_form(&self.http, &url, headers, &form, timeout).await?
            }
            None => send(&self.http, method.clone(), &url, headers, body, timeout).await?,
        };
        let response = check_status(response, &method, &url, mode)?;

        let cookie = first_cookie_pair(
            response
                .headers
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok()),
        );
        let version = if self.roots.auth_returns_version() && mode != AuthenticationMode::PaProxy {
            Some(response.plain_value()).filter(|v| !v.is_empty())
        } else {
            None
        };
        info!(
            mode = %mode,
            has_cookie = cookie.is_some(),
            version = version.as_deref().unwrap_or("unknown"),
            "Session established"
        );
        let session = self.session.install(cookie, authorization, version);
        self.check_impersonation(session).await
    }

    async fn check_impersonation(&self, session: Arc<Session>) -> Result<Arc<Session>> {
        if self.config.session.impersonate.is_none() {
            return Ok(session);
        }
        let version = match session.version() {
            Some(v) => v.to_string(),
            None => {
                let v = self.fetch_version_raw(&session).await?;
                session.set_version(v.clone());
                v
            }
        };
        if let Err(e) = version::require(Feature::Impersonation, &version) {
            self.session.clear();
            return Err(e);
        }
        Ok(session)
    }

    /// Product version fetched without the retry loop (usable while the gate is held).
    async fn fetch_version_raw(&self, session: &Session) -> Result<String> {
        let headers = self.headers_for(session, &RequestOptions::default())?;
        let response = send(
            &self.http,
            Method::GET,
            &self.url(PRODUCT_VERSION_PATH),
            headers,
            None,
            self.config.connection.timeout.filter(|t| !t.is_zero()),
        )
        .await?;
        let response = check_status(response, &Method::GET, PRODUCT_VERSION_PATH, self.mode())?;
        Ok(response.plain_value())
    }

    /// Product version of the connected server, fetched once per session.
    pub async fn version(&self) -> Result<String> {
        let session = self.ensure_session().await?;
        if let Some(v) = session.version() {
            return Ok(v.to_string());
        }
        let v = self.get(PRODUCT_VERSION_PATH).await?.plain_value();
        self.session.current().set_version(v.clone());
        Ok(v)
    }

    /// Whether the connected server is Planning Analytics 12 or later.
    pub async fn is_v12(&self) -> Result<bool> {
        Ok(version::is_v12(&self.version().await?))
    }

    /// Fail with `UnsupportedOnVersion` unless `feature` is available.
    pub async fn require(&self, feature: Feature) -> Result<()> {
        version::require(feature, &self.version().await?)
    }

    /// Close the server session unless `keep_alive` is set. Idempotent; never retried.
    pub async fn logout(&self) -> Result<()> {
        let session = self.session.current();
        if !session.is_established() {
            return Ok(());
        }
        if self.config.session.keep_alive {
            debug!("keep_alive set, leaving server session open");
            self.session.clear();
            return Ok(());
        }
        let result: Result<Tm1Response> = async {
            let headers = self.headers_for(&session, &RequestOptions::default())?;
            let response = send(
                &self.http,
                Method::POST,
                &self.url(CLOSE_SESSION_PATH),
                headers,
                Some(b"{}".to_vec()),
                self.config.connection.timeout.filter(|t| !t.is_zero()),
            )
            .await?;
            check_status(response, &Method::POST, CLOSE_SESSION_PATH, self.mode())
        }
        .await;
        self.session.clear();
        match result {
            Ok(_) => {
                info!("Session closed");
                Ok(())
            }
            Err(e) if matches!(e.status(), Some(401) | Some(404)) => {
                debug!(error = %e, "Session already gone at logout");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_label() {
        assert_eq!(endpoint_label("/Cubes('c')/Views"), "/Cubes");
        assert_eq!(endpoint_label("/ExecuteMDX?$expand=Axes"), "/ExecuteMDX");
        assert_eq!(endpoint_label("/Cellsets('x')/Cells"), "/Cellsets");
        assert_eq!(endpoint_label("/$batch"), "/$batch");
    }

    #[test]
    fn test_default_headers() {
        let mut config = Config::default();
        config.session.impersonate = Some("Bob".to_string());
        let headers = default_headers(&config).unwrap();
        assert_eq!(headers.get(ACCEPT).unwrap(), ACCEPT_VALUE);
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), CONTENT_TYPE_VALUE);
        assert_eq!(headers.get(IMPERSONATE_HEADER).unwrap(), "Bob");
        assert!(headers.get(SESSION_CONTEXT_HEADER).is_some());
    }

    #[test]
    fn test_request_options_builder() {
        let opts = RequestOptions::new()
            .header("X-A", "1")
            .timeout(Duration::from_secs(5))
            .async_mode(true);
        assert_eq!(opts.headers, vec![("X-A".to_string(), "1".to_string())]);
        assert_eq!(opts.timeout, Some(Duration::from_secs(5)));
        assert_eq!(opts.async_mode, Some(true));
    }
}
