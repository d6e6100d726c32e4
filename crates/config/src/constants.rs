//! Centralized constants for the TM1 client workspace.
//!
//! This module contains default values used across crates to avoid
//! magic number duplication and improve maintainability.

// =============================================================================
// Connection & Timeout Defaults
// =============================================================================

/// Default number of pooled idle connections per host.
pub const DEFAULT_CONNECTION_POOL_SIZE: usize = 10;

/// Maximum allowed connection pool size.
pub const MAX_CONNECTION_POOL_SIZE: usize = 1024;

/// Maximum allowed request timeout in seconds (24 hours).
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Default maximum number of HTTP redirects to follow.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Default number of re-login / reconnect attempts per request.
pub const DEFAULT_MAX_RETRY_ATTEMPTS: usize = 3;

/// Maximum allowed retry attempts. Backoff is `2^n` seconds, so this bounds
/// the worst-case wait of a single request.
pub const MAX_MAX_RETRY_ATTEMPTS: usize = 10;

/// Interval between TCP keep-alive probes when `tcp_keep_alive` is enabled.
pub const DEFAULT_TCP_KEEP_ALIVE_SECS: u64 = 30;

// =============================================================================
// Session Defaults
// =============================================================================

/// Default value of the `TM1-SessionContext` header.
pub const DEFAULT_SESSION_CONTEXT: &str = "tm1-client";

/// Cookie name carrying the session id on TM1 11.x servers.
pub const V11_SESSION_COOKIE: &str = "TM1SessionId";

/// Cookie name carrying the session id on Planning Analytics 12.x.
pub const V12_SESSION_COOKIE: &str = "paSession";

/// Default IBM Cloud IAM endpoint used when a tenant is configured.
pub const DEFAULT_IAM_URL: &str = "https://iam.cloud.ibm.com";

// =============================================================================
// Async Request Polling
// =============================================================================

/// Backoff schedule for `_async` polling in milliseconds. The last entry
/// repeats until the request completes or times out.
pub const ASYNC_POLL_SCHEDULE_MS: [u64; 4] = [100, 300, 600, 1000];

// =============================================================================
// Cellset & Bulk Load Defaults
// =============================================================================

/// Default number of concurrent slab requests for parallel cellset extraction.
pub const DEFAULT_MAX_WORKERS: usize = 8;

/// Prefix for temporary files uploaded by the bulk loader.
pub const DATA_LOAD_FILE_PREFIX: &str = "tm1go_dataload_temp_";
