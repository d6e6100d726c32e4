//! Sandbox methods.

use serde_json::json;
use tracing::info;

use crate::client::Tm1Client;
use crate::endpoints::{QueryOptions, encode_key, keyed};
use crate::error::Result;
use crate::models::Sandbox;

impl Tm1Client {
    pub async fn get_sandbox(&self, name: &str) -> Result<Sandbox> {
        self.rest.get_json(&keyed("/Sandboxes", name)?).await
    }

    pub async fn get_all_sandboxes(&self) -> Result<Vec<Sandbox>> {
        self.get_collection("/Sandboxes", &QueryOptions::new()).await
    }

    pub async fn get_all_sandbox_names(&self) -> Result<Vec<String>> {
        self.get_names("/Sandboxes", QueryOptions::new()).await
    }

    pub async fn sandbox_exists(&self, name: &str) -> Result<bool> {
        self.rest.exists(&keyed("/Sandboxes", name)?).await
    }

    pub async fn create_sandbox(&self, sandbox: &Sandbox) -> Result<()> {
        info!(sandbox = %sandbox.name, "Creating sandbox");
        self.rest
            .post("/Sandboxes", &serde_json::to_value(sandbox)?)
            .await?;
        Ok(())
    }

    pub async fn update_sandbox(&self, sandbox: &Sandbox) -> Result<()> {
        self.rest
            .patch(
                &keyed("/Sandboxes", &sandbox.name)?,
                &serde_json::to_value(sandbox)?,
            )
            .await?;
        Ok(())
    }

    pub async fn update_or_create_sandbox(&self, sandbox: &Sandbox) -> Result<()> {
        if self.sandbox_exists(&sandbox.name).await? {
            self.update_sandbox(sandbox).await
        } else {
            self.create_sandbox(sandbox).await
        }
    }

    pub async fn delete_sandbox(&self, name: &str) -> Result<()> {
        self.rest.delete_absent_ok(&keyed("/Sandboxes", name)?).await
    }

    /// Publish the sandbox's changes into the base model.
    pub async fn publish_sandbox(&self, name: &str) -> Result<()> {
        info!(sandbox = name, "Publishing sandbox");
        let path = format!("{}/tm1.Publish", keyed("/Sandboxes", name)?);
        self.rest.post(&path, &json!({})).await?;
        Ok(())
    }

    /// Throw away the sandbox's changes.
    pub async fn discard_sandbox(&self, name: &str) -> Result<()> {
        let path = format!("{}/tm1.DiscardChanges", keyed("/Sandboxes", name)?);
        self.rest.post(&path, &json!({})).await?;
        Ok(())
    }

    /// Merge `source` into `target`, optionally discarding `source` afterwards.
    pub async fn merge_sandbox(&self, source: &str, target: &str, clean_after: bool) -> Result<()> {
        info!(source, target, "Merging sandbox");
        let path = format!("{}/tm1.Merge", keyed("/Sandboxes", source)?);
        let body = json!({
            "Target@odata.bind": format!("Sandboxes('{}')", encode_key(target)?),
            "CleanAfter": clean_after,
        });
        self.rest.post(&path, &body).await?;
        Ok(())
    }
}
