//! Error types for configuration loading.
//!
//! Variants name the offending variable or limit. `.env` errors carry
//! positions and I/O kinds only, never line contents.

use std::io::ErrorKind;
use thiserror::Error;

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },

    #[error("Server address is required. Set TM1_ADDRESS or TM1_BASE_URL.")]
    MissingTarget,

    #[error("invalid timeout: {message}")]
    InvalidTimeout { message: String },

    #[error("invalid max retry attempts: {message}")]
    InvalidMaxRetries { message: String },

    #[error("invalid connection pool size: {message}")]
    InvalidPoolSize { message: String },

    /// `.env` exists but does not parse. Only the byte offset is reported.
    #[error(".env parse error at byte {error_index} (set DOTENV_DISABLED=1 to skip .env)")]
    DotenvParse { error_index: usize },

    #[error(".env could not be read: {kind}")]
    DotenvIo { kind: ErrorKind },

    #[error(".env could not be loaded (set DOTENV_DISABLED=1 to skip .env)")]
    DotenvUnknown,
}
