//! View models.
//!
//! A view is either an MDX view or a native view built from subset
//! selections. Each variant renders its own request body.

use serde::Deserialize;
use serde_json::{Value, json};

use crate::endpoints::url_encoding::encode_key;
use crate::error::{ClientError, Result};

/// A public or private cube view.
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Native(NativeView),
    Mdx(MdxView),
}

impl View {
    pub fn name(&self) -> &str {
        match self {
            View::Native(v) => &v.name,
            View::Mdx(v) => &v.name,
        }
    }

    pub fn body(&self) -> Result<Value> {
        match self {
            View::Native(v) => v.body(),
            View::Mdx(v) => Ok(v.body()),
        }
    }

    /// Parse a view payload; the presence of `MDX` selects the variant.
    pub(crate) fn from_json(value: Value) -> Result<Self> {
        if value.get("MDX").is_some() {
            let wire: MdxViewWire = serde_json::from_value(value)?;
            Ok(View::Mdx(MdxView {
                name: wire.name,
                mdx: wire.mdx,
            }))
        } else {
            let wire: NativeViewWire = serde_json::from_value(value)?;
            wire.into_view().map(View::Native)
        }
    }
}

/// A view defined by an MDX statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MdxView {
    pub name: String,
    pub mdx: String,
}

impl MdxView {
    pub fn new(name: impl Into<String>, mdx: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mdx: mdx.into(),
        }
    }

    pub fn body(&self) -> Value {
        json!({
            "@odata.type": "ibm.tm1.api.v1.MDXView",
            "Name": self.name,
            "MDX": self.mdx,
        })
    }
}

/// A named subset placed on a row or column axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisSelection {
    pub dimension: String,
    pub hierarchy: String,
    pub subset: String,
}

/// A title selection: subset plus the selected element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleSelection {
    pub dimension: String,
    pub hierarchy: String,
    pub subset: String,
    pub selected: String,
}

fn subset_bind(dimension: &str, hierarchy: &str, subset: &str) -> Result<String> {
    Ok(format!(
        "Dimensions('{}')/Hierarchies('{}')/Subsets('{}')",
        encode_key(dimension)?,
        encode_key(hierarchy)?,
        encode_key(subset)?
    ))
}

/// A view assembled from subsets on columns, rows and titles.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeView {
    pub name: String,
    pub columns: Vec<AxisSelection>,
    pub rows: Vec<AxisSelection>,
    pub titles: Vec<TitleSelection>,
    pub suppress_empty_columns: bool,
    pub suppress_empty_rows: bool,
    pub format_string: String,
}

impl NativeView {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            rows: Vec::new(),
            titles: Vec::new(),
            suppress_empty_columns: false,
            suppress_empty_rows: false,
            format_string: "0.#########".to_string(),
        }
    }

    pub fn add_column(mut self, dimension: &str, subset: &str) -> Self {
        self.columns.push(AxisSelection {
            dimension: dimension.to_string(),
            hierarchy: dimension.to_string(),
            subset: subset.to_string(),
        });
        self
    }

    pub fn add_row(mut self, dimension: &str, subset: &str) -> Self {
        self.rows.push(AxisSelection {
            dimension: dimension.to_string(),
            hierarchy: dimension.to_string(),
            subset: subset.to_string(),
        });
        self
    }

    pub fn add_title(mut self, dimension: &str, subset: &str, selected: &str) -> Self {
        self.titles.push(TitleSelection {
            dimension: dimension.to_string(),
            hierarchy: dimension.to_string(),
            subset: subset.to_string(),
            selected: selected.to_string(),
        });
        self
    }

    pub fn body(&self) -> Result<Value> {
        let axis = |sel: &[AxisSelection]| -> Result<Vec<Value>> {
            sel.iter()
                .map(|s| {
                    Ok(json!({
                        "Subset@odata.bind": subset_bind(&s.dimension, &s.hierarchy, &s.subset)?
                    }))
                })
                .collect()
        };
        let titles = self
            .titles
            .iter()
            .map(|t| {
                Ok(json!({
                    "Subset@odata.bind": subset_bind(&t.dimension, &t.hierarchy, &t.subset)?,
                    "Selected@odata.bind": format!(
                        "Dimensions('{}')/Hierarchies('{}')/Elements('{}')",
                        encode_key(&t.dimension)?,
                        encode_key(&t.hierarchy)?,
                        encode_key(&t.selected)?
                    ),
                }))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(json!({
            "@odata.type": "ibm.tm1.api.v1.NativeView",
            "Name": self.name,
            "Columns": axis(&self.columns)?,
            "Rows": axis(&self.rows)?,
            "Titles": titles,
            "SuppressEmptyColumns": self.suppress_empty_columns,
            "SuppressEmptyRows": self.suppress_empty_rows,
            "FormatString": self.format_string,
        }))
    }
}

/// `$expand` clause that returns everything [`View::from_json`] needs for native views.
pub(crate) const NATIVE_VIEW_EXPAND: &str = "tm1.NativeView/Rows/Subset($expand=Hierarchy($select=Name;$expand=Dimension($select=Name));$select=Name),\
tm1.NativeView/Columns/Subset($expand=Hierarchy($select=Name;$expand=Dimension($select=Name));$select=Name),\
tm1.NativeView/Titles/Subset($expand=Hierarchy($select=Name;$expand=Dimension($select=Name));$select=Name),\
tm1.NativeView/Titles/Selected($select=Name)";

#[derive(Debug, Deserialize)]
struct MdxViewWire {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "MDX")]
    mdx: String,
}

#[derive(Debug, Deserialize)]
struct DimRef {
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
struct SubsetRef {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Hierarchy")]
    hierarchy: Option<DimRef>,
}

#[derive(Debug, Deserialize)]
struct SelectionWire {
    #[serde(rename = "Subset")]
    subset: SubsetRef,
    #[serde(
        rename = "Selected",
        default,
        deserialize_with = "crate::serde_helpers::opt_name_from_object"
    )]
    selected: Option<String>,
}

impl SelectionWire {
    fn axis(self) -> Result<AxisSelection> {
        let hierarchy = self.subset.hierarchy.ok_or_else(|| {
            ClientError::ProtocolError(format!(
                "view selection for subset {} has no hierarchy",
                self.subset.name
            ))
        })?;
        Ok(AxisSelection {
            dimension: hierarchy.dimension.unwrap_or_else(|| hierarchy.name.clone()),
            hierarchy: hierarchy.name,
            subset: self.subset.name,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NativeViewWire {
    name: String,
    #[serde(default, deserialize_with = "crate::serde_helpers::null_as_default")]
    columns: Vec<SelectionWire>,
    #[serde(default, deserialize_with = "crate::serde_helpers::null_as_default")]
    rows: Vec<SelectionWire>,
    #[serde(default, deserialize_with = "crate::serde_helpers::null_as_default")]
    titles: Vec<SelectionWire>,
    #[serde(default)]
    suppress_empty_columns: bool,
    #[serde(default)]
    suppress_empty_rows: bool,
    #[serde(default)]
    format_string: Option<String>,
}

impl NativeViewWire {
    fn into_view(self) -> Result<NativeView> {
        let columns = self
            .columns
            .into_iter()
            .map(SelectionWire::axis)
            .collect::<Result<_>>()?;
        let rows = self
            .rows
            .into_iter()
            .map(SelectionWire::axis)
            .collect::<Result<_>>()?;
        let titles = self
            .titles
            .into_iter()
            .map(|t| {
                let selected = t.selected.clone().unwrap_or_default();
                let axis = t.axis()?;
                Ok(TitleSelection {
                    dimension: axis.dimension,
                    hierarchy: axis.hierarchy,
                    subset: axis.subset,
                    selected,
                })
            })
            .collect::<Result<_>>()?;
        Ok(NativeView {
            name: self.name,
            columns,
            rows,
            titles,
            suppress_empty_columns: self.suppress_empty_columns,
            suppress_empty_rows: self.suppress_empty_rows,
            format_string: self.format_string.unwrap_or_else(|| "0.#########".to_string()),
        })
    }
}
