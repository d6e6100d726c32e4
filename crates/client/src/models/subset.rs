//! Subset models.
//!
//! A subset is static (an explicit element list) or dynamic (an MDX expression).

use serde::Deserialize;
use serde_json::{Value, json};

use crate::endpoints::url_encoding::encode_key;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct Subset {
    pub name: String,
    pub dimension_name: String,
    pub hierarchy_name: String,
    pub alias: Option<String>,
    /// MDX for a dynamic subset.
    pub expression: Option<String>,
    /// Members of a static subset.
    pub elements: Vec<String>,
}

impl Subset {
    pub fn new_static(
        name: impl Into<String>,
        dimension: impl Into<String>,
        hierarchy: impl Into<String>,
        elements: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            dimension_name: dimension.into(),
            hierarchy_name: hierarchy.into(),
            alias: None,
            expression: None,
            elements,
        }
    }

    pub fn new_dynamic(
        name: impl Into<String>,
        dimension: impl Into<String>,
        hierarchy: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            dimension_name: dimension.into(),
            hierarchy_name: hierarchy.into(),
            alias: None,
            expression: Some(expression.into()),
            elements: Vec::new(),
        }
    }

    pub fn is_dynamic(&self) -> bool {
        self.expression.is_some()
    }

    fn hierarchy_bind(&self) -> Result<String> {
        Ok(format!(
            "Dimensions('{}')/Hierarchies('{}')",
            encode_key(&self.dimension_name)?,
            encode_key(&self.hierarchy_name)?
        ))
    }

    /// Request body for create and update.
    pub fn body(&self) -> Result<Value> {
        let hierarchy = self.hierarchy_bind()?;
        let mut body = json!({
            "Name": self.name,
            "Hierarchy@odata.bind": hierarchy,
        });
        if let Some(alias) = &self.alias {
            body["Alias"] = Value::String(alias.clone());
        }
        match &self.expression {
            Some(expression) => body["Expression"] = Value::String(expression.clone()),
            None => {
                let binds = self
                    .elements
                    .iter()
                    .map(|e| Ok(format!("{hierarchy}/Elements('{}')", encode_key(e)?)))
                    .collect::<Result<Vec<_>>>()?;
                body["Elements@odata.bind"] = json!(binds);
            }
        }
        Ok(body)
    }
}

#[derive(Debug, Deserialize)]
struct HierarchyRef {
    #[serde(rename = "Name")]
    name: String,
    #[serde(
        rename = "Dimension",
        default,
        deserialize_with = "crate::serde_helpers::opt_name_from_object"
    )]
    dimension: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct SubsetWire {
    name: String,
    #[serde(default)]
    alias: Option<String>,
    #[serde(default)]
    expression: Option<String>,
    #[serde(default)]
    hierarchy: Option<HierarchyRef>,
    #[serde(default, deserialize_with = "crate::serde_helpers::names_from_objects")]
    elements: Vec<String>,
}

impl SubsetWire {
    /// Convert, using the addressed dimension and hierarchy when the payload omits them.
    pub(crate) fn into_subset(self, dimension: &str, hierarchy: &str) -> Subset {
        let (hierarchy_name, dimension_name) = match self.hierarchy {
            Some(h) => (h.name, h.dimension.unwrap_or_else(|| dimension.to_string())),
            None => (hierarchy.to_string(), dimension.to_string()),
        };
        let expression = self.expression.filter(|e| !e.trim().is_empty());
        Subset {
            name: self.name,
            dimension_name,
            hierarchy_name,
            alias: self.alias.filter(|a| !a.is_empty()),
            elements: if expression.is_some() {
                Vec::new()
            } else {
                self.elements
            },
            expression,
        }
    }
}
