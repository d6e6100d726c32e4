//! Client-level session helpers.
//!
//! This module contains methods on [`Tm1Client`] that open and close the
//! server session and answer questions about the active user.
//!
//! # What this module does NOT handle:
//! - Session snapshot storage (handled by [`crate::auth::SessionManager`])
//! - The login request itself (handled by [`crate::client::rest::RestService`])
//!
//! # Invariants
//! - Privilege answers are cached per session and per privilege; a re-login
//!   starts with an empty cache

use tracing::debug;

use crate::auth::Privilege;
use crate::client::Tm1Client;
use crate::error::{ClientError, Result};
use crate::models::{NamedRef, ODataCollection};

impl Tm1Client {
    /// Open the session now instead of on the first request.
    pub async fn login(&self) -> Result<()> {
        self.rest.ensure_session().await.map(|_| ())
    }

    /// Close the server session (unless `keep_alive` is configured).
    ///
    /// Idempotent: calling it twice, or on a session the server already
    /// dropped, succeeds.
    pub async fn logout(&self) -> Result<()> {
        self.rest.logout().await
    }

    /// Discard the current session and log in again.
    pub async fn re_authenticate(&self) -> Result<()> {
        self.rest.re_authenticate().await
    }

    /// Whether the server answers an authenticated request.
    pub async fn is_connected(&self) -> bool {
        match self.rest.get("/Configuration/ServerName/$value").await {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "Connection check failed");
                false
            }
        }
    }

    /// Name of the user the session belongs to.
    pub async fn whoami(&self) -> Result<String> {
        let user: NamedRef = self.rest.get_json("/ActiveUser?$select=Name").await?;
        Ok(user.name)
    }

    /// Groups of the active user.
    pub async fn active_user_groups(&self) -> Result<Vec<String>> {
        let groups: ODataCollection<NamedRef> = self
            .rest
            .get_json("/ActiveUser/Groups?$select=Name")
            .await?;
        Ok(groups.value.into_iter().map(|g| g.name).collect())
    }

    /// Whether the active user holds `privilege`, cached for the session's lifetime.
    pub async fn has_privilege(&self, privilege: Privilege) -> Result<bool> {
        let session = self.rest.ensure_session().await?;
        if let Some(cached) = session.privilege(privilege) {
            return Ok(cached);
        }
        let granted = privilege.granted_by(&self.active_user_groups().await?);
        session.cache_privilege(privilege, granted);
        Ok(granted)
    }

    pub async fn is_admin(&self) -> Result<bool> {
        self.has_privilege(Privilege::Admin).await
    }

    pub async fn is_data_admin(&self) -> Result<bool> {
        self.has_privilege(Privilege::DataAdmin).await
    }

    pub async fn is_security_admin(&self) -> Result<bool> {
        self.has_privilege(Privilege::SecurityAdmin).await
    }

    pub async fn is_ops_admin(&self) -> Result<bool> {
        self.has_privilege(Privilege::OpsAdmin).await
    }

    /// Fail with `Forbidden` before issuing `op` when the privilege is missing.
    pub(crate) async fn require_privilege(&self, privilege: Privilege, op: &str) -> Result<()> {
        if self.has_privilege(privilege).await? {
            Ok(())
        } else {
            Err(ClientError::Forbidden {
                path: op.to_string(),
                message: format!("{op} requires the {} privilege", privilege.group()),
            })
        }
    }
}
