//! Session lifecycle policy.
//!
//! Responsibilities:
//! - Control re-login and reconnect behavior, logout on close, and retry budget.
//! - Carry the session-context tag and optional impersonation target.
//!
//! Does NOT handle:
//! - Holding live session state such as cookies (see client crate `auth::SessionManager`).

use crate::constants::{DEFAULT_MAX_RETRY_ATTEMPTS, DEFAULT_SESSION_CONTEXT};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_session_context() -> String {
    DEFAULT_SESSION_CONTEXT.to_string()
}

fn default_max_retry_attempts() -> usize {
    DEFAULT_MAX_RETRY_ATTEMPTS
}

/// Session lifecycle policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    /// Application tag sent as `TM1-SessionContext`.
    #[serde(default = "default_session_context")]
    pub session_context: String,
    /// User to act as (`TM1-Impersonate`); unsupported on v12.
    #[serde(default)]
    pub impersonate: Option<String>,
    /// Re-login transparently when the server answers 401.
    #[serde(default = "default_true")]
    pub reconnect_on_session_timeout: bool,
    /// Reconnect when the connection drops mid-request.
    #[serde(default = "default_true")]
    pub reconnect_on_remote_disconnect: bool,
    /// Keep the server session alive on logout.
    #[serde(default)]
    pub keep_alive: bool,
    /// Re-login/reconnect attempts per request.
    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_context: default_session_context(),
            impersonate: None,
            reconnect_on_session_timeout: true,
            reconnect_on_remote_disconnect: true,
            keep_alive: false,
            max_retry_attempts: DEFAULT_MAX_RETRY_ATTEMPTS,
        }
    }
}
