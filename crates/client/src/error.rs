//! Error types for the TM1 client.
//!
//! Every failure surfaced by the client is a [`ClientError`]. HTTP failures
//! carry the method and path of the request that produced them; server
//! messages come verbatim from the OData error envelope.

use std::time::Duration;
use thiserror::Error;

use crate::auth::AuthenticationMode;

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur during TM1 client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Invalid or inconsistent configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// DNS, TCP, TLS, or connection-reset failure.
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// Deadline exceeded, either on a plain request or while polling an async operation.
    #[error("Request timed out{}", .0.map(|d| format!(" after {d:?}")).unwrap_or_default())]
    Timeout(Option<Duration>),

    /// The server rejected the credentials after all re-login attempts.
    #[error("Authentication failed ({mode}) at {path}: {reason}")]
    AuthFailure {
        mode: AuthenticationMode,
        path: String,
        reason: String,
    },

    /// HTTP 403.
    #[error("Forbidden at {path}: {message}")]
    Forbidden { path: String, message: String },

    /// HTTP 404 where the operation expects the object to exist.
    #[error("Not found: {path}: {message}")]
    NotFound { path: String, message: String },

    /// HTTP 409.
    #[error("Conflict at {path}: {message}")]
    Conflict { path: String, message: String },

    /// Any other HTTP status >= 400.
    #[error("Server error ({status}) on {method} {path}: {message}{}", .code.as_ref().map(|c| format!(" [code: {c}]")).unwrap_or_default())]
    ServerError {
        status: u16,
        code: Option<String>,
        message: String,
        method: String,
        path: String,
    },

    /// Unparsable body or a required field missing from a response.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// An MDX query could not be assembled.
    #[error("Invalid MDX: {0}")]
    InvalidMdx(String),

    /// A caller-supplied argument failed client-side validation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is gated on a server version the connected server does not satisfy.
    #[error("{op} is not supported on version {have} (requires {need})")]
    UnsupportedOnVersion {
        op: String,
        have: String,
        need: String,
    },

    /// The configured authentication mode cannot be used by this client.
    #[error("Unsupported authentication: {0}")]
    UnsupportedAuth(String),

    /// A TurboIntegrator process did not complete successfully.
    #[error("Process failed with status {status}{}", .error_log_file.as_ref().map(|f| format!(" (error log: {f})")).unwrap_or_default())]
    ProcessFailed {
        status: String,
        error_log_file: Option<String>,
        error_log: Option<String>,
    },

    /// The caller cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,
}

impl ClientError {
    /// True for HTTP 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this error indicates authentication failure.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::AuthFailure { .. } | Self::UnsupportedAuth(_))
    }

    /// Check if this error is worth retrying at the caller's discretion.
    ///
    /// Transport failures, timeouts, and gateway-class 5xx responses are
    /// transient; everything else reflects a request or state problem.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::ServerError { status, .. } => Self::is_retryable_status(*status),
            _ => false,
        }
    }

    /// Retryable status codes: 429, 502, 503, 504.
    pub fn is_retryable_status(status: u16) -> bool {
        matches!(status, 429 | 502 | 503 | 504)
    }

    /// The HTTP status associated with this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::AuthFailure { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Conflict { .. } => Some(409),
            Self::ServerError { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when a transport error happened below HTTP (reset, refused, broken pipe).
    pub(crate) fn is_connection_loss(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_connect() || e.is_request() || e.is_body(),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(None)
        } else {
            Self::Transport(error)
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(error: serde_json::Error) -> Self {
        Self::ProtocolError(format!("invalid JSON: {error}"))
    }
}

impl From<tm1_config::ConfigError> for ClientError {
    fn from(error: tm1_config::ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server_error(status: u16) -> ClientError {
        ClientError::ServerError {
            status,
            code: Some("278".to_string()),
            message: "boom".to_string(),
            method: "GET".to_string(),
            path: "/Cubes".to_string(),
        }
    }

    #[test]
    fn test_error_is_retryable() {
        assert!(ClientError::Timeout(Some(Duration::from_secs(1))).is_retryable());
        assert!(server_error(503).is_retryable());
        assert!(!server_error(500).is_retryable());
        assert!(!ClientError::InvalidMdx("no axes".into()).is_retryable());
    }

    #[test]
    fn test_error_is_auth_error() {
        let err = ClientError::AuthFailure {
            mode: AuthenticationMode::Basic,
            path: "/Configuration/ProductVersion/$value".into(),
            reason: "bad password".into(),
        };
        assert!(err.is_auth_error());
        assert_eq!(err.status(), Some(401));
        assert!(ClientError::UnsupportedAuth("wia".into()).is_auth_error());
        assert!(!ClientError::Cancelled.is_auth_error());
    }

    #[test]
    fn test_status_mapping() {
        let nf = ClientError::NotFound {
            path: "/Cubes('x')".into(),
            message: "Cube not found".into(),
        };
        assert!(nf.is_not_found());
        assert_eq!(nf.status(), Some(404));
        assert_eq!(server_error(500).status(), Some(500));
        assert_eq!(ClientError::Cancelled.status(), None);
    }

    #[test]
    fn test_server_error_display_includes_context() {
        let msg = server_error(500).to_string();
        assert!(msg.contains("GET /Cubes"));
        assert!(msg.contains("code: 278"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn test_process_failed_display() {
        let err = ClientError::ProcessFailed {
            status: "Aborted".into(),
            error_log_file: Some("TM1ProcessError_1.log".into()),
            error_log: None,
        };
        assert_eq!(
            err.to_string(),
            "Process failed with status Aborted (error log: TM1ProcessError_1.log)"
        );
    }

    #[test]
    fn test_is_retryable_status_not_retryable() {
        assert!(!ClientError::is_retryable_status(400));
        assert!(!ClientError::is_retryable_status(401));
        assert!(!ClientError::is_retryable_status(404));
        assert!(!ClientError::is_retryable_status(500));
        assert!(ClientError::is_retryable_status(429));
    }
}
