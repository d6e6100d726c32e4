//! Cube models.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::endpoints::url_encoding::encode_key;
use crate::error::Result;

/// A cube: an ordered list of dimensions plus optional rules.
/// Use [`Cube::body`] for the create payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Cube {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(
        rename = "Dimensions",
        default,
        deserialize_with = "crate::serde_helpers::names_from_objects"
    )]
    pub dimensions: Vec<String>,
    #[serde(rename = "Rules", default)]
    pub rules: Option<String>,
    #[serde(rename = "LastDataUpdate", default)]
    pub last_data_update: Option<String>,
    #[serde(rename = "LastSchemaUpdate", default)]
    pub last_schema_update: Option<String>,
}

impl Cube {
    pub fn new(name: impl Into<String>, dimensions: Vec<String>) -> Self {
        Self {
            name: name.into(),
            dimensions,
            rules: None,
            last_data_update: None,
            last_schema_update: None,
        }
    }

    pub fn with_rules(mut self, rules: impl Into<String>) -> Self {
        self.rules = Some(rules.into());
        self
    }

    pub fn has_rules(&self) -> bool {
        self.rules.as_deref().is_some_and(|r| !r.trim().is_empty())
    }

    /// Control cubes start with `}`.
    pub fn is_control(&self) -> bool {
        is_control_name(&self.name)
    }

    /// Request body for create.
    pub fn body(&self) -> Result<Value> {
        let binds = self
            .dimensions
            .iter()
            .map(|d| Ok(format!("Dimensions('{}')", encode_key(d)?)))
            .collect::<Result<Vec<_>>>()?;
        let mut body = json!({
            "Name": self.name,
            "Dimensions@odata.bind": binds,
        });
        if let Some(rules) = &self.rules {
            body["Rules"] = Value::String(rules.clone());
        }
        Ok(body)
    }
}

/// One error reported by `tm1.CheckRules`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuleSyntaxError {
    #[serde(default)]
    pub line_number: i64,
    #[serde(default)]
    pub message: String,
}

/// Names beginning with `}` (or `{` for some legacy objects) are control objects.
pub fn is_control_name(name: &str) -> bool {
    name.starts_with('}') || name.starts_with('{')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_deserializes_dimension_names() {
        let cube: Cube = serde_json::from_str(
            r#"{"Name":"Sales","Rules":null,"Dimensions":[{"Name":"Year"},{"Name":"Region"}]}"#,
        )
        .unwrap();
        assert_eq!(cube.dimensions, vec!["Year", "Region"]);
        assert!(!cube.has_rules());
    }

    #[test]
    fn test_cube_body_binds_dimensions() {
        let body = Cube::new("Sales", vec!["Year".into(), "Sales Region".into()])
            .with_rules("SKIPCHECK;")
            .body()
            .unwrap();
        assert_eq!(
            body["Dimensions@odata.bind"],
            json!(["Dimensions('Year')", "Dimensions('Sales%20Region')"])
        );
        assert_eq!(body["Rules"], "SKIPCHECK;");
    }

    #[test]
    fn test_control_names() {
        assert!(is_control_name("}ClientGroups"));
        assert!(!is_control_name("Sales"));
    }
}
