//! Hierarchy methods.

use serde_json::Value;
use tracing::info;

use crate::client::Tm1Client;
use crate::endpoints::{QueryOptions, keyed};
use crate::error::Result;
use crate::models::{ElementAttribute, Hierarchy};

/// `$expand` returning everything [`Hierarchy`] carries.
pub(crate) const HIERARCHY_EXPAND: &str = "Elements($select=Name,Type,Level,Index,UniqueName),Edges,ElementAttributes,Subsets($select=Name),DefaultMember($select=Name)";

/// `/Dimensions('d')/Hierarchies('h')`
pub(crate) fn hierarchy_path(dimension: &str, hierarchy: &str) -> Result<String> {
    Ok(format!(
        "{}{}",
        keyed("/Dimensions", dimension)?,
        keyed("/Hierarchies", hierarchy)?
    ))
}

impl Tm1Client {
    pub async fn get_hierarchy(&self, dimension: &str, hierarchy: &str) -> Result<Hierarchy> {
        let path = QueryOptions::new()
            .expand(HIERARCHY_EXPAND)
            .apply(&hierarchy_path(dimension, hierarchy)?);
        let mut h: Hierarchy = self.rest.get_json(&path).await?;
        h.dimension_name.get_or_insert_with(|| dimension.to_string());
        Ok(h)
    }

    /// Names of all hierarchies of a dimension, including `Leaves`.
    pub async fn get_hierarchy_names(&self, dimension: &str) -> Result<Vec<String>> {
        self.get_names(
            &format!("{}/Hierarchies", keyed("/Dimensions", dimension)?),
            QueryOptions::new(),
        )
        .await
    }

    pub async fn hierarchy_exists(&self, dimension: &str, hierarchy: &str) -> Result<bool> {
        self.rest
            .exists(&hierarchy_path(dimension, hierarchy)?)
            .await
    }

    fn owning_dimension(hierarchy: &Hierarchy) -> &str {
        hierarchy
            .dimension_name
            .as_deref()
            .unwrap_or(hierarchy.name.as_str())
    }

    /// Create a hierarchy with its elements, edges and attributes.
    pub async fn create_hierarchy(&self, hierarchy: &Hierarchy) -> Result<()> {
        let dimension = Self::owning_dimension(hierarchy);
        info!(dimension, hierarchy = %hierarchy.name, "Creating hierarchy");
        let path = format!("{}/Hierarchies", keyed("/Dimensions", dimension)?);
        self.rest.post(&path, &hierarchy.body()).await?;
        for attribute in &hierarchy.element_attributes {
            self.create_element_attribute(dimension, &hierarchy.name, attribute)
                .await?;
        }
        Ok(())
    }

    /// Replace elements and edges, then add attributes the server does not have yet.
    pub async fn update_hierarchy(&self, hierarchy: &Hierarchy) -> Result<()> {
        let dimension = Self::owning_dimension(hierarchy);
        self.rest
            .patch(&hierarchy_path(dimension, &hierarchy.name)?, &hierarchy.body())
            .await?;
        let existing: Vec<String> = self
            .get_element_attributes(dimension, &hierarchy.name)
            .await?
            .into_iter()
            .map(|a| a.name)
            .collect();
        let missing: Vec<&ElementAttribute> = hierarchy
            .element_attributes
            .iter()
            .filter(|a| !existing.iter().any(|e| e.eq_ignore_ascii_case(&a.name)))
            .collect();
        for attribute in missing {
            self.create_element_attribute(dimension, &hierarchy.name, attribute)
                .await?;
        }
        Ok(())
    }

    pub async fn update_or_create_hierarchy(&self, hierarchy: &Hierarchy) -> Result<()> {
        let dimension = Self::owning_dimension(hierarchy);
        if self.hierarchy_exists(dimension, &hierarchy.name).await? {
            self.update_hierarchy(hierarchy).await
        } else {
            self.create_hierarchy(hierarchy).await
        }
    }

    pub async fn delete_hierarchy(&self, dimension: &str, hierarchy: &str) -> Result<()> {
        self.rest
            .delete_absent_ok(&hierarchy_path(dimension, hierarchy)?)
            .await
    }

    /// Name of the hierarchy's default member, if one is set.
    pub async fn get_default_member(
        &self,
        dimension: &str,
        hierarchy: &str,
    ) -> Result<Option<String>> {
        let path = format!(
            "{}/DefaultMember?$select=Name",
            hierarchy_path(dimension, hierarchy)?
        );
        let response = match self.rest.get(&path).await {
            Ok(r) => r,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        if response.body.is_empty() {
            return Ok(None);
        }
        let body: Value = response.json()?;
        Ok(body["Name"].as_str().map(str::to_string))
    }
}
