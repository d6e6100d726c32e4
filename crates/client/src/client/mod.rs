//! Main TM1 REST API client and API methods.
//!
//! This module provides the primary [`Tm1Client`]. It owns a shared
//! [`rest::RestService`] that handles authentication, session reuse and
//! async requests; every entity method is a thin layer over it.
//!
//! # Submodules
//! - [`builder`]: Client construction and configuration
//! - [`rest`]: HTTP engine (retry, re-login, async polling)
//! - `session`: Login, logout, version and privilege helpers
//! - `cubes`, `dimensions`, `hierarchies`, `elements`, `subsets`, `views`:
//!   model objects
//! - `processes`, `files`, `sandboxes`, `configuration`, `security`, `batch`
//! - `cellsets`: MDX execution and cell extraction
//! - `data_load`: CSV bulk loading through a temporary process
//!
//! # What this module does NOT handle:
//! - Direct HTTP exchanges (delegated to [`crate::endpoints`])
//! - Session snapshot storage (delegated to [`crate::auth::SessionManager`])
//!
//! # Invariants
//! - `Tm1Client` is cheap to clone; clones share one session and one connection pool
//! - Deletes treat 404 as success; `*_exists` methods map 404 to `false`

pub mod builder;
pub mod rest;
mod session;

mod batch;
mod cellsets;
mod configuration;
mod cubes;
mod data_load;
mod dimensions;
mod elements;
mod files;
mod hierarchies;
mod processes;
mod sandboxes;
mod security;
mod subsets;
mod views;

use std::sync::Arc;

pub use cellsets::CellExtractOptions;
pub use data_load::{DataLoadOptions, LoadValueKind};

use crate::endpoints::QueryOptions;
use crate::error::Result;
use rest::RestService;

/// TM1 REST API client.
///
/// # Creating a Client
///
/// ```rust,ignore
/// use tm1_client::Tm1Client;
/// use tm1_config::Config;
///
/// let config = Config::v11("localhost", 8010, true, "admin", "apple");
/// let client = Tm1Client::builder().from_config(&config).connect().await?;
/// let cubes = client.get_all_cube_names(true).await?;
/// client.logout().await?;
/// ```
#[derive(Debug, Clone)]
pub struct Tm1Client {
    pub(crate) rest: Arc<RestService>,
}

impl Tm1Client {
    /// Create a new client builder.
    pub fn builder() -> builder::Tm1ClientBuilder {
        builder::Tm1ClientBuilder::new()
    }

    /// Service root every request path is appended to.
    pub fn base_url(&self) -> &str {
        &self.rest.roots().base_url
    }

    /// The underlying HTTP engine, for requests no façade covers.
    pub fn rest(&self) -> &RestService {
        &self.rest
    }

    /// GET a collection and return its `value` array.
    pub(crate) async fn get_collection<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &QueryOptions,
    ) -> Result<Vec<T>> {
        let collection: crate::models::ODataCollection<T> =
            self.rest.get_json(&query.apply(path)).await?;
        Ok(collection.value)
    }

    /// Names of a collection, optionally filtered.
    pub(crate) async fn get_names(&self, path: &str, query: QueryOptions) -> Result<Vec<String>> {
        let named: Vec<crate::models::NamedRef> =
            self.get_collection(path, &query.select("Name")).await?;
        Ok(named.into_iter().map(|n| n.name).collect())
    }
}
