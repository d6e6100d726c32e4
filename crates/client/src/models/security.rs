//! User and group models.

use serde::Deserialize;

/// A TM1 user with group memberships.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    pub name: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default, deserialize_with = "crate::serde_helpers::names_from_objects")]
    pub groups: Vec<String>,
}
