//! Metrics for TM1 REST calls.
//!
//! Labels are `endpoint`, `method`, `status`, `reason` and `error_category`.
//! Nothing is exported from here; the application installs a recorder.

use crate::error::ClientError;
use std::time::Duration;

/// Metric name for request duration histogram.
pub const METRIC_REQUEST_DURATION: &str = "tm1_api_request_duration_seconds";

/// Metric name for total request counter.
pub const METRIC_REQUESTS_TOTAL: &str = "tm1_api_requests_total";

/// Metric name for session re-login counter.
pub const METRIC_RELOGINS_TOTAL: &str = "tm1_api_relogins_total";

/// Metric name for async status poll counter.
pub const METRIC_ASYNC_POLLS_TOTAL: &str = "tm1_api_async_polls_total";

/// Metric name for error counter.
pub const METRIC_ERRORS_TOTAL: &str = "tm1_api_errors_total";

/// Metric name for cells read by cellset extraction.
pub const METRIC_CELLS_EXTRACTED: &str = "tm1_cellset_cells_extracted_total";

/// `error_category` label values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection refused, reset, DNS, TLS
    Transport,
    /// Request or async poll deadline
    Timeout,
    /// 401 after all retries, or unsupported auth mode
    Auth,
    /// Other HTTP 4xx
    Http4xx,
    /// HTTP 5xx
    Http5xx,
    /// Undecodable response
    Protocol,
    /// Rejected before any request was sent
    Validation,
    /// TurboIntegrator failure
    Process,
    Cancelled,
}

impl ErrorCategory {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transport => "transport",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Auth => "auth",
            ErrorCategory::Http4xx => "http_4xx",
            ErrorCategory::Http5xx => "http_5xx",
            ErrorCategory::Protocol => "protocol",
            ErrorCategory::Validation => "validation",
            ErrorCategory::Process => "process",
            ErrorCategory::Cancelled => "cancelled",
        }
    }
}

impl From<&ClientError> for ErrorCategory {
    fn from(error: &ClientError) -> Self {
        match error {
            ClientError::Transport(_) => ErrorCategory::Transport,
            ClientError::Timeout(_) => ErrorCategory::Timeout,
            ClientError::AuthFailure { .. } | ClientError::UnsupportedAuth(_) => {
                ErrorCategory::Auth
            }
            ClientError::Forbidden { .. }
            | ClientError::NotFound { .. }
            | ClientError::Conflict { .. } => ErrorCategory::Http4xx,
            ClientError::ServerError { status, .. } => {
                if (500..600).contains(status) {
                    ErrorCategory::Http5xx
                } else {
                    ErrorCategory::Http4xx
                }
            }
            ClientError::ProtocolError(_) => ErrorCategory::Protocol,
            ClientError::Config(_)
            | ClientError::InvalidMdx(_)
            | ClientError::InvalidArgument(_)
            | ClientError::UnsupportedOnVersion { .. } => ErrorCategory::Validation,
            ClientError::ProcessFailed { .. } => ErrorCategory::Process,
            ClientError::Cancelled => ErrorCategory::Cancelled,
        }
    }
}

/// Records request, session and cellset metrics through the `metrics` facade.
///
/// Handed to the engine through [`crate::Tm1ClientBuilder::metrics`]; a
/// disabled collector turns every call into a no-op.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    enabled: bool,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self { enabled: true }
    }

    pub fn disabled() -> Self {
        Self { enabled: false }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Latency of one HTTP exchange. `status` is `None` when no response arrived.
    pub fn record_request_duration(
        &self,
        endpoint: &str,
        method: &str,
        duration: Duration,
        status: Option<u16>,
    ) {
        if self.enabled {
            let status = status.map_or_else(|| "none".to_string(), |s| s.to_string());
            metrics::histogram!(METRIC_REQUEST_DURATION,
                "endpoint" => endpoint.to_string(),
                "method" => method.to_string(),
                "status" => status,
            )
            .record(duration.as_secs_f64());
        }
    }

    /// One attempt; replays after a re-login count again.
    pub fn record_request(&self, endpoint: &str, method: &str) {
        if self.enabled {
            metrics::counter!(METRIC_REQUESTS_TOTAL,
                "endpoint" => endpoint.to_string(),
                "method" => method.to_string(),
            )
            .increment(1);
        }
    }

    pub fn record_relogin(&self, reason: &'static str) {
        if self.enabled {
            metrics::counter!(METRIC_RELOGINS_TOTAL, "reason" => reason).increment(1);
        }
    }

    pub fn record_async_poll(&self) {
        if self.enabled {
            metrics::counter!(METRIC_ASYNC_POLLS_TOTAL).increment(1);
        }
    }

    pub fn record_cells_extracted(&self, count: usize) {
        if self.enabled {
            metrics::counter!(METRIC_CELLS_EXTRACTED).increment(count as u64);
        }
    }

    pub fn record_error(&self, endpoint: &str, method: &str, error: &ClientError) {
        if self.enabled {
            metrics::counter!(METRIC_ERRORS_TOTAL,
                "endpoint" => endpoint.to_string(),
                "method" => method.to_string(),
                "error_category" => ErrorCategory::from(error).as_str(),
            )
            .increment(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthenticationMode;

    #[test]
    fn test_error_category_as_str() {
        assert_eq!(ErrorCategory::Transport.as_str(), "transport");
        assert_eq!(ErrorCategory::Http4xx.as_str(), "http_4xx");
        assert_eq!(ErrorCategory::Http5xx.as_str(), "http_5xx");
        assert_eq!(ErrorCategory::Timeout.as_str(), "timeout");
        assert_eq!(ErrorCategory::Process.as_str(), "process");
    }

    #[test]
    fn test_error_categorization() {
        assert_eq!(
            ErrorCategory::from(&ClientError::Timeout(Some(Duration::from_secs(1)))),
            ErrorCategory::Timeout
        );
        let auth = ClientError::AuthFailure {
            mode: AuthenticationMode::Basic,
            path: "/x".into(),
            reason: "401".into(),
        };
        assert_eq!(ErrorCategory::from(&auth), ErrorCategory::Auth);

        let server = |status| ClientError::ServerError {
            status,
            code: None,
            message: String::new(),
            method: "GET".into(),
            path: "/x".into(),
        };
        assert_eq!(ErrorCategory::from(&server(500)), ErrorCategory::Http5xx);
        assert_eq!(ErrorCategory::from(&server(400)), ErrorCategory::Http4xx);
        assert_eq!(
            ErrorCategory::from(&ClientError::InvalidMdx("x".into())),
            ErrorCategory::Validation
        );
    }

    #[test]
    fn test_metrics_collector_enabled() {
        let collector = MetricsCollector::new();
        assert!(collector.is_enabled());

        let disabled = MetricsCollector::disabled();
        assert!(!disabled.is_enabled());
        // Recording on a disabled collector is a no-op.
        disabled.record_relogin("session_timeout");
        disabled.record_async_poll();
    }
}
