//! Server file (blob) models.

use serde::Deserialize;

/// A file stored in the server's file area.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileEntry {
    pub name: String,
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
}
