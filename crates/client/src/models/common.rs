//! Common types shared across TM1 models.
//!
//! This module contains the OData collection wrapper and the error envelope.
//! It does NOT contain entity-specific models.

use serde::{Deserialize, Serialize};

/// OData collection response: `{"value": [...]}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ODataCollection<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

/// A navigation reference carrying only a name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NamedRef {
    #[serde(rename = "Name")]
    pub name: String,
}

/// Error envelope returned by the server on failures.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default, deserialize_with = "crate::serde_helpers::opt_string_from_number_or_string")]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}
