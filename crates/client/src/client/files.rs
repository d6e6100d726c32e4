//! Server file methods.
//!
//! TM1 11 keeps files under `/Contents('Blobs')` as documents; Planning
//! Analytics 12 keeps them under `/Contents('Files')`.

use serde_json::json;
use tracing::debug;

use crate::client::Tm1Client;
use crate::endpoints::{QueryOptions, keyed};
use crate::error::Result;
use crate::models::FileEntry;

impl Tm1Client {
    async fn files_root(&self) -> Result<&'static str> {
        Ok(if self.rest.is_v12().await? {
            "/Contents('Files')/Contents"
        } else {
            "/Contents('Blobs')/Contents"
        })
    }

    async fn file_path(&self, name: &str) -> Result<String> {
        let root = self.files_root().await?;
        keyed(root, name)
    }

    pub async fn get_all_file_names(&self) -> Result<Vec<String>> {
        let root = self.files_root().await?;
        self.get_names(root, QueryOptions::new()).await
    }

    pub async fn get_files(&self) -> Result<Vec<FileEntry>> {
        let root = self.files_root().await?;
        self.get_collection(root, &QueryOptions::new()).await
    }

    pub async fn file_exists(&self, name: &str) -> Result<bool> {
        let path = self.file_path(name).await?;
        self.rest.exists(&path).await
    }

    /// Create a file entry and upload its content.
    pub async fn create_file(&self, name: &str, content: Vec<u8>) -> Result<()> {
        let root = self.files_root().await?;
        let body = if self.rest.is_v12().await? {
            json!({ "@odata.type": "#ibm.tm1.api.v1.File", "Name": name })
        } else {
            json!({ "@odata.type": "#ibm.tm1.api.v1.Document", "ID": name, "Name": name })
        };
        debug!(file = name, bytes = content.len(), "Creating file");
        self.rest.post(root, &body).await?;
        self.update_file(name, content).await
    }

    /// Replace a file's content.
    pub async fn update_file(&self, name: &str, content: Vec<u8>) -> Result<()> {
        let path = format!("{}/Content", self.file_path(name).await?);
        self.rest.put_bytes(&path, content).await?;
        Ok(())
    }

    pub async fn update_or_create_file(&self, name: &str, content: Vec<u8>) -> Result<()> {
        if self.file_exists(name).await? {
            self.update_file(name, content).await
        } else {
            self.create_file(name, content).await
        }
    }

    /// Raw content of a file.
    pub async fn get_file(&self, name: &str) -> Result<Vec<u8>> {
        let path = format!("{}/Content", self.file_path(name).await?);
        Ok(self.rest.get(&path).await?.body)
    }

    pub async fn delete_file(&self, name: &str) -> Result<()> {
        let path = self.file_path(name).await?;
        self.rest.delete_absent_ok(&path).await
    }
}
