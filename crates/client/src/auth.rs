//! Authentication modes and session state.
//!
//! Responsibilities:
//! - Derive the [`AuthenticationMode`] from configuration.
//! - Build the static Authorization material for header-based modes.
//! - Hold the current session snapshot (cookie, version, privilege caches).
//!
//! Does NOT handle:
//! - Token exchange or the login request itself (see `client::rest`).
//!
//! Invariants:
//! - Mode selection is a pure function of the configuration.
//! - A session snapshot is replaced as a whole; readers never see a
//!   half-written session, and a replacement drops every cached privilege.
//! - Once a cookie is known the Authorization header is no longer sent.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, SecretString};
use tm1_config::{AuthConfig, Config};

use crate::error::{ClientError, Result};

/// How the client authenticates. Fixed for the lifetime of a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthenticationMode {
    Basic,
    Wia,
    Cam,
    CamSso,
    IbmCloudApiKey,
    ServiceToService,
    PaProxy,
    AccessToken,
    SessionReuse,
}

impl AuthenticationMode {
    /// Select the mode for `config`; the first matching rule wins.
    pub fn resolve(config: &Config) -> Self {
        let auth = &config.auth;
        let conn = &config.connection;
        if auth.session_id.is_some() {
            Self::SessionReuse
        } else if auth.access_token.is_some() {
            Self::AccessToken
        } else if conn.cpd_url.is_some() {
            Self::PaProxy
        } else if auth.api_key.is_some() && (conn.tenant.is_some() || conn.iam_url.is_some()) {
            Self::IbmCloudApiKey
        } else if auth.application_client_id.is_some() && auth.application_client_secret.is_some()
        {
            Self::ServiceToService
        } else if auth.gateway.is_some() {
            Self::CamSso
        } else if auth.namespace.is_some() {
            Self::Cam
        } else if auth.integrated_login {
            Self::Wia
        } else {
            Self::Basic
        }
    }

    /// Whether an expired session may be re-established by logging in again.
    pub fn allows_relogin(self) -> bool {
        !matches!(self, Self::SessionReuse)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Wia => "wia",
            Self::Cam => "cam",
            Self::CamSso => "cam_sso",
            Self::IbmCloudApiKey => "ibm_cloud_api_key",
            Self::ServiceToService => "service_to_service",
            Self::PaProxy => "pa_proxy",
            Self::AccessToken => "access_token",
            Self::SessionReuse => "session_reuse",
        }
    }
}

impl fmt::Display for AuthenticationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn secret(value: String) -> SecretString {
    SecretString::new(value.into())
}

fn b64(raw: &str) -> String {
    STANDARD.encode(raw.as_bytes())
}

fn password(auth: &AuthConfig) -> Result<String> {
    let raw = auth
        .password
        .as_ref()
        .map(|p| p.expose_secret().to_string())
        .unwrap_or_default();
    if !auth.decode_base64 {
        return Ok(raw);
    }
    let bytes = STANDARD
        .decode(raw.as_bytes())
        .map_err(|e| ClientError::Config(format!("password is not valid base64: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|_| ClientError::Config("decoded password is not valid UTF-8".to_string()))
}

/// Authorization header value for modes that need no token exchange.
///
/// Returns `Ok(None)` for modes whose credential is obtained over the wire
/// (IBM Cloud, PA proxy) or that carry no credential (session reuse).
pub(crate) fn static_authorization(
    mode: AuthenticationMode,
    auth: &AuthConfig,
) -> Result<Option<SecretString>> {
    let header = match mode {
        AuthenticationMode::Basic => match (&auth.user, &auth.api_key) {
            (None, Some(key)) => format!("Basic {}", b64(&format!("apikey:{}", key.expose_secret()))),
            (user, _) => {
                let user = user.as_deref().unwrap_or_default();
                format!("Basic {}", b64(&format!("{user}:{}", password(auth)?)))
            }
        },
        AuthenticationMode::Cam => {
            let user = auth.user.as_deref().unwrap_or_default();
            let namespace = auth.namespace.as_deref().unwrap_or_default();
            format!(
                "CAMNamespace {}",
                b64(&format!("{user}:{}:{namespace}", password(auth)?))
            )
        }
        AuthenticationMode::CamSso => match &auth.cam_passport {
            Some(passport) => format!("CAMPassport {}", passport.expose_secret()),
            None => {
                return Err(ClientError::UnsupportedAuth(
                    "CAM SSO requires a pre-obtained cam_passport; gateway exchange is not supported"
                        .to_string(),
                ));
            }
        },
        AuthenticationMode::ServiceToService => {
            let id = auth.application_client_id.as_deref().unwrap_or_default();
            let secret_value = auth
                .application_client_secret
                .as_ref()
                .map(|s| s.expose_secret().to_string())
                .unwrap_or_default();
            format!("Basic {}", b64(&format!("{id}:{secret_value}")))
        }
        AuthenticationMode::AccessToken => match &auth.access_token {
            Some(token) => format!("Bearer {}", token.expose_secret()),
            None => return Ok(None),
        },
        AuthenticationMode::Wia => {
            return Err(ClientError::UnsupportedAuth(
                "integrated Windows authentication is not available in this client".to_string(),
            ));
        }
        AuthenticationMode::IbmCloudApiKey
        | AuthenticationMode::PaProxy
        | AuthenticationMode::SessionReuse => return Ok(None),
    };
    Ok(Some(secret(header)))
}

/// Extract the first `name=value` pair from a set of `Set-Cookie` header values.
pub(crate) fn first_cookie_pair<'a>(values: impl IntoIterator<Item = &'a str>) -> Option<String> {
    values.into_iter().find_map(|v| {
        let pair = v.split(';').next()?.trim();
        if pair.contains('=') && !pair.starts_with('=') {
            Some(pair.to_string())
        } else {
            None
        }
    })
}

/// Privileges derived from the active user's group membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    Admin,
    DataAdmin,
    SecurityAdmin,
    OpsAdmin,
}

impl Privilege {
    /// The TM1 group granting this privilege.
    pub fn group(self) -> &'static str {
        match self {
            Self::Admin => "ADMIN",
            Self::DataAdmin => "DataAdmin",
            Self::SecurityAdmin => "SecurityAdmin",
            Self::OpsAdmin => "OperationsAdmin",
        }
    }

    /// Whether membership in `groups` grants this privilege. Admin implies all.
    pub fn granted_by<S: AsRef<str>>(self, groups: &[S]) -> bool {
        groups.iter().any(|g| {
            let g = g.as_ref();
            g.eq_ignore_ascii_case(Privilege::Admin.group()) || g.eq_ignore_ascii_case(self.group())
        })
    }
}

#[derive(Debug, Default)]
struct PrivilegeCache {
    admin: OnceLock<bool>,
    data_admin: OnceLock<bool>,
    security_admin: OnceLock<bool>,
    ops_admin: OnceLock<bool>,
}

impl PrivilegeCache {
    fn slot(&self, privilege: Privilege) -> &OnceLock<bool> {
        match privilege {
            Privilege::Admin => &self.admin,
            Privilege::DataAdmin => &self.data_admin,
            Privilege::SecurityAdmin => &self.security_admin,
            Privilege::OpsAdmin => &self.ops_admin,
        }
    }
}

/// One established (or not yet established) server session.
#[derive(Debug, Default)]
pub struct Session {
    cookie: Option<SecretString>,
    authorization: Option<SecretString>,
    version: OnceLock<String>,
    privileges: PrivilegeCache,
    established: bool,
    generation: u64,
}

impl Session {
    /// `Cookie` header value, e.g. `TM1SessionId=abc`.
    pub(crate) fn cookie(&self) -> Option<&str> {
        self.cookie.as_ref().map(|c| c.expose_secret())
    }

    pub(crate) fn authorization(&self) -> Option<&str> {
        self.authorization.as_ref().map(|a| a.expose_secret())
    }

    /// Monotonic counter bumped on every install or clear.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_established(&self) -> bool {
        self.established
    }

    pub fn has_cookie(&self) -> bool {
        self.cookie.is_some()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.get().map(String::as_str)
    }

    /// Record the product version if it is not known yet.
    pub(crate) fn set_version(&self, version: String) {
        let _ = self.version.set(version);
    }

    pub fn privilege(&self, privilege: Privilege) -> Option<bool> {
        self.privileges.slot(privilege).get().copied()
    }

    pub(crate) fn cache_privilege(&self, privilege: Privilege, value: bool) {
        let _ = self.privileges.slot(privilege).set(value);
    }
}

/// Holds the current session snapshot and serializes re-login.
///
/// Readers call [`SessionManager::current`] and get a stable `Arc<Session>`.
/// Writers replace the snapshot while holding the login gate, so concurrent
/// 401s collapse into a single login.
#[derive(Debug)]
pub struct SessionManager {
    mode: AuthenticationMode,
    current: ArcSwap<Session>,
    generations: AtomicU64,
    gate: tokio::sync::Mutex<()>,
}

impl SessionManager {
    pub fn new(mode: AuthenticationMode) -> Self {
        Self {
            mode,
            current: ArcSwap::from_pointee(Session::default()),
            generations: AtomicU64::new(0),
            gate: tokio::sync::Mutex::new(()),
        }
    }

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn mode(&self) -> AuthenticationMode {
        self.mode
    }

    pub fn current(&self) -> Arc<Session> {
        self.current.load_full()
    }

    /// Install a freshly established session.
    ///
    /// The Authorization header is kept only when the server handed out no cookie.
    pub(crate) fn install(
        &self,
        cookie: Option<String>,
        authorization: Option<SecretString>,
        version: Option<String>,
    ) -> Arc<Session> {
        let generation = self.next_generation();
        let cookie = cookie.map(secret);
        let authorization = if cookie.is_some() { None } else { authorization };
        let session = Session {
            cookie,
            authorization,
            established: true,
            generation,
            ..Session::default()
        };
        if let Some(v) = version {
            session.set_version(v);
        }
        let session = Arc::new(session);
        self.current.store(Arc::clone(&session));
        session
    }

    /// Forget the current session; the next request logs in again.
    pub(crate) fn clear(&self) {
        let generation = self.next_generation();
        self.current.store(Arc::new(Session {
            generation,
            ..Session::default()
        }));
        tracing::debug!(generation, "Session cleared");
    }

    pub(crate) async fn lock_gate(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.gate.lock().await
    }
}
