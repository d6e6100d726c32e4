//! Subset methods, public and private.

use tracing::debug;

use crate::client::Tm1Client;
use crate::client::hierarchies::hierarchy_path;
use crate::endpoints::{QueryOptions, keyed};
use crate::error::Result;
use crate::models::Subset;
use crate::models::subset::SubsetWire;

const SUBSET_EXPAND: &str =
    "Hierarchy($select=Name;$expand=Dimension($select=Name)),Elements($select=Name)";

fn collection(private: bool) -> &'static str {
    if private { "/PrivateSubsets" } else { "/Subsets" }
}

fn subsets_path(dimension: &str, hierarchy: &str, private: bool) -> Result<String> {
    Ok(format!(
        "{}{}",
        hierarchy_path(dimension, hierarchy)?,
        collection(private)
    ))
}

fn subset_path(dimension: &str, hierarchy: &str, name: &str, private: bool) -> Result<String> {
    Ok(format!(
        "{}{}",
        hierarchy_path(dimension, hierarchy)?,
        keyed(collection(private), name)?
    ))
}

impl Tm1Client {
    pub async fn get_subset(
        &self,
        dimension: &str,
        hierarchy: &str,
        name: &str,
        private: bool,
    ) -> Result<Subset> {
        let path = QueryOptions::new()
            .select("Name,Expression,Alias")
            .expand(SUBSET_EXPAND)
            .apply(&subset_path(dimension, hierarchy, name, private)?);
        let wire: SubsetWire = self.rest.get_json(&path).await?;
        Ok(wire.into_subset(dimension, hierarchy))
    }

    pub async fn get_all_subset_names(
        &self,
        dimension: &str,
        hierarchy: &str,
        private: bool,
    ) -> Result<Vec<String>> {
        self.get_names(
            &subsets_path(dimension, hierarchy, private)?,
            QueryOptions::new(),
        )
        .await
    }

    pub async fn subset_exists(
        &self,
        dimension: &str,
        hierarchy: &str,
        name: &str,
        private: bool,
    ) -> Result<bool> {
        self.rest
            .exists(&subset_path(dimension, hierarchy, name, private)?)
            .await
    }

    pub async fn create_subset(&self, subset: &Subset, private: bool) -> Result<()> {
        let path = subsets_path(&subset.dimension_name, &subset.hierarchy_name, private)?;
        self.rest.post(&path, &subset.body()?).await?;
        Ok(())
    }

    /// Update a subset. A static subset's element list is replaced, not merged.
    pub async fn update_subset(&self, subset: &Subset, private: bool) -> Result<()> {
        let path = subset_path(
            &subset.dimension_name,
            &subset.hierarchy_name,
            &subset.name,
            private,
        )?;
        if !subset.is_dynamic() {
            debug!(subset = %subset.name, "Clearing static subset elements");
            self.rest
                .delete_absent_ok(&format!("{path}/Elements/$ref"))
                .await?;
        }
        self.rest.patch(&path, &subset.body()?).await?;
        Ok(())
    }

    pub async fn update_or_create_subset(&self, subset: &Subset, private: bool) -> Result<()> {
        if self
            .subset_exists(
                &subset.dimension_name,
                &subset.hierarchy_name,
                &subset.name,
                private,
            )
            .await?
        {
            self.update_subset(subset, private).await
        } else {
            self.create_subset(subset, private).await
        }
    }

    pub async fn delete_subset(
        &self,
        dimension: &str,
        hierarchy: &str,
        name: &str,
        private: bool,
    ) -> Result<()> {
        self.rest
            .delete_absent_ok(&subset_path(dimension, hierarchy, name, private)?)
            .await
    }
}
