//! Product version comparison and feature gates.
//!
//! Versions are dotted strings as reported by
//! `/Configuration/ProductVersion/$value` (`11.8.01300.1`, `12.4.0`).
//! Missing segments compare as zero and non-numeric segments count as zero.

use std::cmp::Ordering;

use crate::error::{ClientError, Result};

/// Operations whose availability depends on the server version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    DimensionsStorageOrder,
    ReorderDimensions,
    LoadCube,
    UnloadCube,
    Impersonation,
}

/// How a feature relates to its version bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    /// Available from this version on.
    AtLeast(&'static str),
    /// Available only below this version.
    Below(&'static str),
}

/// Every version-gated operation, with its bound.
pub const FEATURE_GATES: &[(Feature, &str, Bound)] = &[
    (
        Feature::DimensionsStorageOrder,
        "DimensionsStorageOrder",
        Bound::AtLeast("11.4"),
    ),
    (
        Feature::ReorderDimensions,
        "ReorderDimensions",
        Bound::AtLeast("11.4"),
    ),
    (Feature::LoadCube, "Load", Bound::AtLeast("11.6")),
    (Feature::UnloadCube, "Unload", Bound::AtLeast("11.6")),
    (Feature::Impersonation, "Impersonate", Bound::Below("12.0")),
];

fn segments(v: &str) -> Vec<u64> {
    v.trim()
        .split('.')
        .map(|s| s.trim().parse::<u64>().unwrap_or(0))
        .collect()
}

/// Compare two dotted versions segment by segment.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a, b) = (segments(a), segments(b));
    let len = a.len().max(b.len());
    for i in 0..len {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

/// True iff `a >= b`.
pub fn vge(a: &str, b: &str) -> bool {
    compare_versions(a, b) != Ordering::Less
}

/// True for Planning Analytics 12 and later.
pub fn is_v12(version: &str) -> bool {
    vge(version, "12")
}

/// Fail with [`ClientError::UnsupportedOnVersion`] unless `have` satisfies the gate.
pub fn require(feature: Feature, have: &str) -> Result<()> {
    let Some((_, op, bound)) = FEATURE_GATES.iter().find(|(f, _, _)| *f == feature) else {
        return Ok(());
    };
    let (ok, need) = match bound {
        Bound::AtLeast(min) => (vge(have, min), format!(">= {min}")),
        Bound::Below(max) => (!vge(have, max), format!("< {max}")),
    };
    if ok {
        Ok(())
    } else {
        Err(ClientError::UnsupportedOnVersion {
            op: (*op).to_string(),
            have: have.to_string(),
            need,
        })
    }
}
