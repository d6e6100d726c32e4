//! Serde helpers for TM1's OData payload shapes.
//!
//! Responsibilities:
//! - Accept either JSON numbers or strings where the server is inconsistent
//!   (error codes, `$count` bodies).
//! - Flatten navigation properties that only carry a name (`{"Name": "x"}`)
//!   into plain strings.
//! - Treat explicit `null` like an absent collection.
//!
//! Explicitly does NOT handle:
//! - Validating higher-level semantics (shape checks live with the cellset engine).

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    U64(u64),
    I64(i64),
    F64(f64),
}

impl StringOrNumber {
    fn into_string(self) -> String {
        match self {
            StringOrNumber::String(s) => s,
            StringOrNumber::U64(v) => v.to_string(),
            StringOrNumber::I64(v) => v.to_string(),
            StringOrNumber::F64(v) => v.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NameRef {
    #[serde(rename = "Name")]
    name: String,
}

pub fn opt_string_from_number_or_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(StringOrNumber::into_string))
}

/// Parse a count that may arrive as a bare number or a quoted string.
pub fn usize_from_string_or_number<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::U64(v) => usize::try_from(v).map_err(D::Error::custom),
        StringOrNumber::I64(v) => usize::try_from(v).map_err(D::Error::custom),
        StringOrNumber::F64(v) if v >= 0.0 && v.fract() == 0.0 => Ok(v as usize),
        StringOrNumber::F64(v) => Err(D::Error::custom(format!("not a count: {v}"))),
        StringOrNumber::String(s) => s.trim().parse::<usize>().map_err(D::Error::custom),
    }
}

/// `null` becomes `T::default()`.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `[{"Name": "a"}, {"Name": "b"}]` becomes `["a", "b"]`; `null` becomes empty.
pub fn names_from_objects<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let refs = Option::<Vec<NameRef>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(refs.into_iter().map(|r| r.name).collect())
}

/// `{"Name": "a"}` becomes `Some("a")`.
pub fn opt_name_from_object<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<NameRef>::deserialize(deserializer)?.map(|r| r.name))
}
