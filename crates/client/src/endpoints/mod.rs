//! Wire-level building blocks: URL encoding, OData query options, single
//! HTTP exchanges, async-operation decoding and pre-session token exchanges.
//!
//! # What this module does NOT handle:
//! - Session reuse, re-login or retry (see [`crate::client::rest`])

pub mod async_ops;
pub mod auth;
pub mod query;
pub mod request;
pub mod url_encoding;

pub use query::{QueryOptions, with_sandbox};
pub use request::{Tm1Response, backoff, check_status};
pub use url_encoding::{encode_key, encode_path_segment, keyed, odata_literal};
