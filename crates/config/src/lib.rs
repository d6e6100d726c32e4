//! Configuration management for the TM1 REST client.
//!
//! This crate provides the immutable configuration bag consumed by
//! `tm1-client`, its defaults, and a loader that reads `TM1_*` environment
//! variables (optionally from a `.env` file).

pub mod constants;
mod loader;
pub mod types;

pub use loader::{ConfigError, ConfigLoader, env_var_or_none};
pub use types::{AuthConfig, Config, ConnectionConfig, SessionConfig};
