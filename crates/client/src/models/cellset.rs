//! Cellset models.
//!
//! Invariants (checked by the cellset engine, not by deserialization):
//! - axis `i` has ordinal `i` and exactly `cardinality` tuples;
//! - every tuple has one member per axis hierarchy;
//! - cell count equals the product of axis cardinalities, cells in row-major order.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A cell value: number, string, or empty.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    Number(f64),
    String(String),
    #[default]
    Null,
}

impl CellValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Number(v)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::String(s) => f.write_str(s),
            CellValue::Null => Ok(()),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            // Integral values go out without a fractional part.
            CellValue::Number(v) if v.fract() == 0.0 && v.abs() < 9.0e15 => {
                serializer.serialize_i64(*v as i64)
            }
            CellValue::Number(v) => serializer.serialize_f64(*v),
            CellValue::String(s) => serializer.serialize_str(s),
            CellValue::Null => serializer.serialize_none(),
        }
    }
}

struct CellValueVisitor;

impl<'de> Visitor<'de> for CellValueVisitor {
    type Value = CellValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number, a string, or null")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<CellValue, E> {
        Ok(CellValue::Number(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<CellValue, E> {
        Ok(CellValue::Number(v as f64))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<CellValue, E> {
        Ok(CellValue::Number(v as f64))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<CellValue, E> {
        Ok(CellValue::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<CellValue, E> {
        Ok(CellValue::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> Result<CellValue, E> {
        Ok(CellValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<CellValue, E> {
        Ok(CellValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<CellValue, D::Error> {
        d.deserialize_any(CellValueVisitor)
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(CellValueVisitor)
    }
}

/// One cell of a cellset.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Cell {
    #[serde(default)]
    pub ordinal: Option<usize>,
    #[serde(default)]
    pub value: CellValue,
    #[serde(default)]
    pub formatted_value: Option<String>,
    #[serde(default)]
    pub consolidated: Option<bool>,
    #[serde(default)]
    pub rule_derived: Option<bool>,
    /// Bit-packed updateability flags.
    #[serde(default)]
    pub updateable: Option<i64>,
}

/// A hierarchy placed on an axis.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AxisHierarchy {
    pub name: String,
    #[serde(default)]
    pub unique_name: String,
}

/// A member within a tuple.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Member {
    pub name: String,
    #[serde(default)]
    pub unique_name: String,
    #[serde(rename = "Type", default)]
    pub member_type: Option<String>,
    #[serde(default)]
    pub ordinal: Option<i64>,
    #[serde(default)]
    pub display_info: Option<i64>,
    #[serde(default)]
    pub display_info_above: Option<i64>,
    #[serde(default)]
    pub attributes: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tuple {
    #[serde(default)]
    pub ordinal: Option<usize>,
    #[serde(default, deserialize_with = "crate::serde_helpers::null_as_default")]
    pub members: Vec<Member>,
}

/// One axis of a cellset: 0 = columns, 1 = rows, 2 = titles.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Axis {
    pub ordinal: usize,
    #[serde(deserialize_with = "crate::serde_helpers::usize_from_string_or_number")]
    pub cardinality: usize,
    #[serde(default, deserialize_with = "crate::serde_helpers::null_as_default")]
    pub hierarchies: Vec<AxisHierarchy>,
    #[serde(default, deserialize_with = "crate::serde_helpers::null_as_default")]
    pub tuples: Vec<Tuple>,
}

/// A cellset's axes, cells and source cube.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Cellset {
    #[serde(rename = "ID", default)]
    pub id: Option<String>,
    #[serde(
        rename = "Cube",
        default,
        deserialize_with = "crate::serde_helpers::opt_name_from_object"
    )]
    pub cube: Option<String>,
    #[serde(rename = "Axes", default, deserialize_with = "crate::serde_helpers::null_as_default")]
    pub axes: Vec<Axis>,
    #[serde(rename = "Cells", default, deserialize_with = "crate::serde_helpers::null_as_default")]
    pub cells: Vec<Cell>,
}

impl Cellset {
    /// Product of axis cardinalities (1 for an axis-less cellset).
    pub fn expected_cell_count(&self) -> usize {
        self.axes.iter().map(|a| a.cardinality).product()
    }
}

/// Body element for a cell update PATCH.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellUpdate {
    #[serde(rename = "Ordinal")]
    pub ordinal: usize,
    #[serde(rename = "Value")]
    pub value: CellValue,
}
