//! Dimension methods.

use tracing::info;

use crate::client::Tm1Client;
use crate::client::hierarchies::HIERARCHY_EXPAND;
use crate::endpoints::{QueryOptions, keyed};
use crate::error::Result;
use crate::models::{Dimension, is_control_name};

impl Tm1Client {
    /// Get a dimension with all of its hierarchies.
    pub async fn get_dimension(&self, name: &str) -> Result<Dimension> {
        let path = QueryOptions::new()
            .expand(format!("Hierarchies($expand={HIERARCHY_EXPAND})"))
            .apply(&keyed("/Dimensions", name)?);
        let dimension: Dimension = self.rest.get_json(&path).await?;
        Ok(dimension.link_hierarchies())
    }

    pub async fn get_all_dimension_names(&self, skip_control: bool) -> Result<Vec<String>> {
        let names = self.get_names("/Dimensions", QueryOptions::new()).await?;
        Ok(names
            .into_iter()
            .filter(|n| !(skip_control && is_control_name(n)))
            .collect())
    }

    pub async fn dimension_exists(&self, name: &str) -> Result<bool> {
        self.rest.exists(&keyed("/Dimensions", name)?).await
    }

    /// Create a dimension and the element attributes of its hierarchies.
    pub async fn create_dimension(&self, dimension: &Dimension) -> Result<()> {
        info!(dimension = %dimension.name, "Creating dimension");
        self.rest.post("/Dimensions", &dimension.body()).await?;
        for hierarchy in &dimension.hierarchies {
            for attribute in &hierarchy.element_attributes {
                self.create_element_attribute(&dimension.name, &hierarchy.name, attribute)
                    .await?;
            }
        }
        Ok(())
    }

    /// Update every hierarchy of the dimension, creating the ones that are new.
    pub async fn update_dimension(&self, dimension: &Dimension) -> Result<()> {
        let existing = self.get_hierarchy_names(&dimension.name).await?;
        for hierarchy in &dimension.hierarchies {
            let mut hierarchy = hierarchy.clone();
            hierarchy.dimension_name = Some(dimension.name.clone());
            if existing.iter().any(|h| h.eq_ignore_ascii_case(&hierarchy.name)) {
                self.update_hierarchy(&hierarchy).await?;
            } else {
                self.create_hierarchy(&hierarchy).await?;
            }
        }
        Ok(())
    }

    pub async fn update_or_create_dimension(&self, dimension: &Dimension) -> Result<()> {
        if self.dimension_exists(&dimension.name).await? {
            self.update_dimension(dimension).await
        } else {
            self.create_dimension(dimension).await
        }
    }

    pub async fn delete_dimension(&self, name: &str) -> Result<()> {
        info!(dimension = name, "Deleting dimension");
        self.rest.delete_absent_ok(&keyed("/Dimensions", name)?).await
    }
}
