//! Dimension, hierarchy, element and edge models.
//!
//! Hierarchies refer to their dimension by name only; records are plain
//! values and never link to one another.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Element kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ElementType {
    #[default]
    Numeric,
    String,
    Consolidated,
}

impl ElementType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Numeric => "Numeric",
            Self::String => "String",
            Self::Consolidated => "Consolidated",
        }
    }
}

/// A member of a hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Element {
    pub name: String,
    #[serde(rename = "Type", default)]
    pub element_type: ElementType,
    #[serde(default, skip_serializing)]
    pub unique_name: Option<String>,
    #[serde(default, skip_serializing)]
    pub level: Option<i64>,
    #[serde(default, skip_serializing)]
    pub index: Option<i64>,
    #[serde(default, skip_serializing)]
    pub attributes: Option<serde_json::Map<String, Value>>,
}

impl Element {
    pub fn new(name: impl Into<String>, element_type: ElementType) -> Self {
        Self {
            name: name.into(),
            element_type,
            unique_name: None,
            level: None,
            index: None,
            attributes: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.element_type != ElementType::Consolidated
    }
}

/// Parent/child relation with a weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Edge {
    pub parent_name: String,
    pub component_name: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl Edge {
    pub fn new(parent: impl Into<String>, component: impl Into<String>, weight: f64) -> Self {
        Self {
            parent_name: parent.into(),
            component_name: component.into(),
            weight,
        }
    }
}

/// Attribute kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeType {
    Numeric,
    String,
    Alias,
}

/// An element attribute definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ElementAttribute {
    pub name: String,
    #[serde(rename = "Type")]
    pub attribute_type: AttributeType,
}

/// A hierarchy within a dimension.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Hierarchy {
    pub name: String,
    /// Owning dimension; filled in by the client when the server omits it.
    #[serde(
        rename = "Dimension",
        default,
        deserialize_with = "crate::serde_helpers::opt_name_from_object"
    )]
    pub dimension_name: Option<String>,
    #[serde(default, deserialize_with = "crate::serde_helpers::null_as_default")]
    pub elements: Vec<Element>,
    #[serde(default, deserialize_with = "crate::serde_helpers::null_as_default")]
    pub edges: Vec<Edge>,
    #[serde(default, deserialize_with = "crate::serde_helpers::null_as_default")]
    pub element_attributes: Vec<ElementAttribute>,
    #[serde(default, deserialize_with = "crate::serde_helpers::names_from_objects")]
    pub subsets: Vec<String>,
    #[serde(default, deserialize_with = "crate::serde_helpers::opt_name_from_object")]
    pub default_member: Option<String>,
}

impl Hierarchy {
    pub fn new(name: impl Into<String>, dimension_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dimension_name: Some(dimension_name.into()),
            elements: Vec::new(),
            edges: Vec::new(),
            element_attributes: Vec::new(),
            subsets: Vec::new(),
            default_member: None,
        }
    }

    pub fn add_element(&mut self, name: impl Into<String>, element_type: ElementType) {
        self.elements.push(Element::new(name, element_type));
    }

    pub fn add_edge(&mut self, parent: impl Into<String>, component: impl Into<String>, weight: f64) {
        self.edges.push(Edge::new(parent, component, weight));
    }

    pub fn add_element_attribute(&mut self, name: impl Into<String>, attribute_type: AttributeType) {
        self.element_attributes.push(ElementAttribute {
            name: name.into(),
            attribute_type,
        });
    }

    /// Request body for create and update. Attributes go through their own endpoint.
    pub fn body(&self) -> Value {
        json!({
            "Name": self.name,
            "Elements": self.elements,
            "Edges": self.edges,
        })
    }
}

/// A dimension with its hierarchies.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dimension {
    pub name: String,
    #[serde(default, deserialize_with = "crate::serde_helpers::null_as_default")]
    pub hierarchies: Vec<Hierarchy>,
}

impl Dimension {
    /// A dimension with one same-named hierarchy.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            hierarchies: vec![Hierarchy::new(name.clone(), name.clone())],
            name,
        }
    }

    pub fn default_hierarchy(&self) -> Option<&Hierarchy> {
        self.hierarchies.iter().find(|h| h.name.eq_ignore_ascii_case(&self.name))
    }

    pub fn default_hierarchy_mut(&mut self) -> Option<&mut Hierarchy> {
        let name = self.name.clone();
        self.hierarchies
            .iter_mut()
            .find(|h| h.name.eq_ignore_ascii_case(&name))
    }

    pub fn body(&self) -> Value {
        json!({
            "Name": self.name,
            "Hierarchies": self.hierarchies.iter().map(Hierarchy::body).collect::<Vec<_>>(),
        })
    }

    /// Fill in the back-reference on every hierarchy.
    pub(crate) fn link_hierarchies(mut self) -> Self {
        for h in &mut self.hierarchies {
            h.dimension_name.get_or_insert_with(|| self.name.clone());
        }
        self
    }
}
