//! Cube methods.
//!
//! Responsibilities:
//! - CRUD over `/Cubes` plus the rule, load and lock actions.
//!
//! Invariants:
//! - `delete_cube`, `load_cube`, `unload_cube` and `reorder_cube_dimensions`
//!   assert the Data Admin privilege before any request is sent.
//! - Version-gated actions consult [`crate::version::FEATURE_GATES`].

use serde_json::{Value, json};
use tracing::{debug, info};

use crate::auth::Privilege;
use crate::client::Tm1Client;
use crate::endpoints::{QueryOptions, encode_key, keyed};
use crate::error::Result;
use crate::models::{Cube, ODataCollection, RuleSyntaxError, is_control_name};
use crate::version::Feature;

const CUBE_EXPAND: &str = "Dimensions($select=Name)";

impl Tm1Client {
    /// Get a cube with its dimension names and rules.
    pub async fn get_cube(&self, name: &str) -> Result<Cube> {
        let path = QueryOptions::new()
            .expand(CUBE_EXPAND)
            .apply(&keyed("/Cubes", name)?);
        self.rest.get_json(&path).await
    }

    /// All cubes, optionally without control cubes.
    pub async fn get_all_cubes(&self, skip_control: bool) -> Result<Vec<Cube>> {
        let cubes: Vec<Cube> = self
            .get_collection("/Cubes", &QueryOptions::new().expand(CUBE_EXPAND))
            .await?;
        Ok(cubes
            .into_iter()
            .filter(|c| !(skip_control && c.is_control()))
            .collect())
    }

    pub async fn get_all_cube_names(&self, skip_control: bool) -> Result<Vec<String>> {
        let names = self.get_names("/Cubes", QueryOptions::new()).await?;
        Ok(names
            .into_iter()
            .filter(|n| !(skip_control && is_control_name(n)))
            .collect())
    }

    /// Cubes that are neither control cubes nor legacy `{` objects.
    ///
    /// Both exclusions travel in one `$filter`.
    pub async fn get_model_cubes(&self) -> Result<Vec<Cube>> {
        let query = QueryOptions::new()
            .expand(CUBE_EXPAND)
            .filter("not startswith(Name,'}')")
            .filter("not startswith(Name,'{')");
        self.get_collection("/Cubes", &query).await
    }

    /// Control cubes (names starting with `}`).
    pub async fn get_control_cubes(&self) -> Result<Vec<Cube>> {
        let query = QueryOptions::new()
            .expand(CUBE_EXPAND)
            .filter("startswith(Name,'}')");
        self.get_collection("/Cubes", &query).await
    }

    /// Dimension names of a cube in cube order.
    pub async fn get_cube_dimension_names(&self, cube: &str) -> Result<Vec<String>> {
        self.get_names(
            &format!("{}/Dimensions", keyed("/Cubes", cube)?),
            QueryOptions::new(),
        )
        .await
    }

    pub async fn cube_exists(&self, name: &str) -> Result<bool> {
        self.rest.exists(&keyed("/Cubes", name)?).await
    }

    pub async fn create_cube(&self, cube: &Cube) -> Result<()> {
        info!(cube = %cube.name, "Creating cube");
        self.rest.post("/Cubes", &cube.body()?).await?;
        Ok(())
    }

    /// Update a cube's rules. Dimensions of an existing cube cannot change.
    pub async fn update_cube(&self, cube: &Cube) -> Result<()> {
        let body = json!({
            "Name": cube.name,
            "Rules": cube.rules.clone().unwrap_or_default(),
        });
        self.rest.patch(&keyed("/Cubes", &cube.name)?, &body).await?;
        Ok(())
    }

    pub async fn update_or_create_cube(&self, cube: &Cube) -> Result<()> {
        if self.cube_exists(&cube.name).await? {
            self.update_cube(cube).await
        } else {
            self.create_cube(cube).await
        }
    }

    /// Delete a cube. Requires Data Admin; a missing cube is not an error.
    pub async fn delete_cube(&self, name: &str) -> Result<()> {
        self.require_privilege(Privilege::DataAdmin, "DeleteCube")
            .await?;
        info!(cube = name, "Deleting cube");
        self.rest.delete_absent_ok(&keyed("/Cubes", name)?).await
    }

    /// Compile the cube's rules and return the errors found.
    pub async fn check_cube_rules(&self, name: &str) -> Result<Vec<RuleSyntaxError>> {
        let path = format!("{}/tm1.CheckRules", keyed("/Cubes", name)?);
        let errors: ODataCollection<RuleSyntaxError> = self.rest.post(&path, &json!({})).await?.json()?;
        debug!(cube = name, errors = errors.value.len(), "Checked rules");
        Ok(errors.value)
    }

    pub async fn update_cube_rules(&self, name: &str, rules: &str) -> Result<()> {
        self.rest
            .patch(&keyed("/Cubes", name)?, &json!({ "Rules": rules }))
            .await?;
        Ok(())
    }

    async fn cube_action(&self, name: &str, action: &str) -> Result<()> {
        let path = format!("{}/tm1.{action}", keyed("/Cubes", name)?);
        self.rest.post(&path, &json!({})).await?;
        Ok(())
    }

    /// Load a cube into memory (11.6+, Data Admin).
    pub async fn load_cube(&self, name: &str) -> Result<()> {
        self.rest.require(Feature::LoadCube).await?;
        self.require_privilege(Privilege::DataAdmin, "Load").await?;
        self.cube_action(name, "Load").await
    }

    /// Unload a cube from memory (11.6+, Data Admin).
    pub async fn unload_cube(&self, name: &str) -> Result<()> {
        self.rest.require(Feature::UnloadCube).await?;
        self.require_privilege(Privilege::DataAdmin, "Unload").await?;
        self.cube_action(name, "Unload").await
    }

    pub async fn lock_cube(&self, name: &str) -> Result<()> {
        self.cube_action(name, "Lock").await
    }

    pub async fn unlock_cube(&self, name: &str) -> Result<()> {
        self.cube_action(name, "Unlock").await
    }

    /// Dimension names in storage order (11.4+).
    pub async fn cube_dimensions_storage_order(&self, name: &str) -> Result<Vec<String>> {
        self.rest.require(Feature::DimensionsStorageOrder).await?;
        self.get_names(
            &format!("{}/tm1.DimensionsStorageOrder()", keyed("/Cubes", name)?),
            QueryOptions::new(),
        )
        .await
    }

    /// Change the storage order of a cube's dimensions (11.4+, Data Admin).
    ///
    /// Returns the memory change reported by the server in percent.
    pub async fn reorder_cube_dimensions(&self, name: &str, dimensions: &[&str]) -> Result<f64> {
        self.rest.require(Feature::ReorderDimensions).await?;
        self.require_privilege(Privilege::DataAdmin, "ReorderDimensions")
            .await?;
        let binds = dimensions
            .iter()
            .map(|d| Ok(format!("Dimensions('{}')", encode_key(d)?)))
            .collect::<Result<Vec<_>>>()?;
        let path = format!("{}/tm1.ReorderDimensions", keyed("/Cubes", name)?);
        let response = self
            .rest
            .post(&path, &json!({ "Dimensions@odata.bind": binds }))
            .await?;
        if response.body.is_empty() {
            return Ok(0.0);
        }
        let body: Value = response.json()?;
        Ok(body["value"].as_f64().unwrap_or(0.0))
    }
}
