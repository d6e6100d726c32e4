//! Sandbox models.

use serde::{Deserialize, Serialize};

/// A personal sandbox layered over the base model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Sandbox {
    pub name: String,
    #[serde(default = "default_true")]
    pub include_in_sandbox_dimension: bool,
    #[serde(default, skip_serializing)]
    pub is_loaded: bool,
    #[serde(default, skip_serializing)]
    pub is_active: bool,
    #[serde(default, skip_serializing)]
    pub is_queued: bool,
}

fn default_true() -> bool {
    true
}

impl Sandbox {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            include_in_sandbox_dimension: true,
            is_loaded: false,
            is_active: false,
            is_queued: false,
        }
    }
}
