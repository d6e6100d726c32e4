//! Configuration type definitions for the TM1 client.
//!
//! Responsibilities:
//! - Define configuration types for the transport target, credentials, and session policy.
//! - Provide serialization helpers for sensitive types (secrets, durations).
//! - Ensure consistent defaults and type safety across the configuration system.
//!
//! Does NOT handle:
//! - Configuration loading from environment variables (see `loader` module).
//! - Authentication mode selection or URL derivation (see client crate).
//!
//! Invariants:
//! - All secret values use `secrecy::SecretString` to prevent accidental logging.
//! - Serialization helpers (`opt_secret_string`, `opt_duration_seconds`) are private modules.

mod auth;
mod connection;
mod session;

pub use auth::AuthConfig;
pub use connection::{Config, ConnectionConfig};
pub use session::SessionConfig;
