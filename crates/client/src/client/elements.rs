//! Element, edge and element attribute methods.

use serde_json::json;

use crate::client::Tm1Client;
use crate::client::hierarchies::hierarchy_path;
use crate::endpoints::{QueryOptions, encode_key, keyed};
use crate::error::Result;
use crate::models::{Edge, Element, ElementAttribute};

const ELEMENT_SELECT: &str = "Name,Type,Level,Index,UniqueName";

impl Tm1Client {
    pub async fn get_element(
        &self,
        dimension: &str,
        hierarchy: &str,
        element: &str,
    ) -> Result<Element> {
        let path = format!(
            "{}{}",
            hierarchy_path(dimension, hierarchy)?,
            keyed("/Elements", element)?
        );
        self.rest
            .get_json(&QueryOptions::new().select(ELEMENT_SELECT).apply(&path))
            .await
    }

    pub async fn get_elements(&self, dimension: &str, hierarchy: &str) -> Result<Vec<Element>> {
        let path = format!("{}/Elements", hierarchy_path(dimension, hierarchy)?);
        self.get_collection(&path, &QueryOptions::new().select(ELEMENT_SELECT))
            .await
    }

    pub async fn get_element_names(&self, dimension: &str, hierarchy: &str) -> Result<Vec<String>> {
        let path = format!("{}/Elements", hierarchy_path(dimension, hierarchy)?);
        self.get_names(&path, QueryOptions::new()).await
    }

    /// Names of non-consolidated elements.
    pub async fn get_leaf_element_names(
        &self,
        dimension: &str,
        hierarchy: &str,
    ) -> Result<Vec<String>> {
        let path = format!("{}/Elements", hierarchy_path(dimension, hierarchy)?);
        self.get_names(&path, QueryOptions::new().filter("Type ne 3"))
            .await
    }

    /// Names of elements at `level` (0 = leaves).
    pub async fn get_elements_filtered_by_level(
        &self,
        dimension: &str,
        hierarchy: &str,
        level: u32,
    ) -> Result<Vec<String>> {
        let path = format!("{}/Elements", hierarchy_path(dimension, hierarchy)?);
        self.get_names(&path, QueryOptions::new().filter(format!("Level eq {level}")))
            .await
    }

    pub async fn element_exists(
        &self,
        dimension: &str,
        hierarchy: &str,
        element: &str,
    ) -> Result<bool> {
        let path = format!(
            "{}{}",
            hierarchy_path(dimension, hierarchy)?,
            keyed("/Elements", element)?
        );
        self.rest.exists(&path).await
    }

    pub async fn create_element(
        &self,
        dimension: &str,
        hierarchy: &str,
        element: &Element,
    ) -> Result<()> {
        let path = format!("{}/Elements", hierarchy_path(dimension, hierarchy)?);
        self.rest.post(&path, &serde_json::to_value(element)?).await?;
        Ok(())
    }

    pub async fn update_element(
        &self,
        dimension: &str,
        hierarchy: &str,
        element: &Element,
    ) -> Result<()> {
        let path = format!(
            "{}{}",
            hierarchy_path(dimension, hierarchy)?,
            keyed("/Elements", &element.name)?
        );
        self.rest.patch(&path, &serde_json::to_value(element)?).await?;
        Ok(())
    }

    pub async fn delete_element(&self, dimension: &str, hierarchy: &str, element: &str) -> Result<()> {
        let path = format!(
            "{}{}",
            hierarchy_path(dimension, hierarchy)?,
            keyed("/Elements", element)?
        );
        self.rest.delete_absent_ok(&path).await
    }

    pub async fn get_edges(&self, dimension: &str, hierarchy: &str) -> Result<Vec<Edge>> {
        let path = format!("{}/Edges", hierarchy_path(dimension, hierarchy)?);
        self.get_collection(&path, &QueryOptions::new()).await
    }

    /// Add edges in one request.
    pub async fn add_edges(&self, dimension: &str, hierarchy: &str, edges: &[Edge]) -> Result<()> {
        if edges.is_empty() {
            return Ok(());
        }
        let path = format!("{}/Edges", hierarchy_path(dimension, hierarchy)?);
        self.rest.post(&path, &serde_json::to_value(edges)?).await?;
        Ok(())
    }

    pub async fn remove_edge(
        &self,
        dimension: &str,
        hierarchy: &str,
        parent: &str,
        component: &str,
    ) -> Result<()> {
        let path = format!(
            "{}/Edges(ParentName='{}',ComponentName='{}')",
            hierarchy_path(dimension, hierarchy)?,
            encode_key(parent)?,
            encode_key(component)?
        );
        self.rest.delete_absent_ok(&path).await
    }

    pub async fn get_element_attributes(
        &self,
        dimension: &str,
        hierarchy: &str,
    ) -> Result<Vec<ElementAttribute>> {
        let path = format!("{}/ElementAttributes", hierarchy_path(dimension, hierarchy)?);
        self.get_collection(&path, &QueryOptions::new()).await
    }

    pub async fn create_element_attribute(
        &self,
        dimension: &str,
        hierarchy: &str,
        attribute: &ElementAttribute,
    ) -> Result<()> {
        let path = format!("{}/ElementAttributes", hierarchy_path(dimension, hierarchy)?);
        self.rest
            .post(
                &path,
                &json!({ "Name": attribute.name, "Type": attribute.attribute_type }),
            )
            .await?;
        Ok(())
    }

    pub async fn delete_element_attribute(
        &self,
        dimension: &str,
        hierarchy: &str,
        attribute: &str,
    ) -> Result<()> {
        let path = format!(
            "{}{}",
            hierarchy_path(dimension, hierarchy)?,
            keyed("/ElementAttributes", attribute)?
        );
        self.rest.delete_absent_ok(&path).await
    }
}
