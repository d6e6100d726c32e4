//! `proptest` strategies for TM1 payloads.
//!
//! Cellsets are generated as server JSON so tests exercise deserialization
//! and the engine's validation together.

use proptest::collection::vec;
use proptest::prelude::*;
use serde_json::{Value, json};

use crate::models::CellValue;
use crate::tabular::Table;

/// Dotted product versions such as `11.8.01300.1`.
pub fn version_string() -> impl Strategy<Value = String> {
    vec(0u32..40, 1..5).prop_map(|parts| {
        parts
            .iter()
            .map(u32::to_string)
            .collect::<Vec<_>>()
            .join(".")
    })
}

/// Element-like names without quotes or brackets.
pub fn element_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9 _-]{1,12}"
}

/// A cell value of any kind.
pub fn cell_value() -> impl Strategy<Value = CellValue> {
    prop_oneof![
        (-1.0e9f64..1.0e9).prop_map(CellValue::Number),
        element_name().prop_map(CellValue::String),
        Just(CellValue::Null),
    ]
}

/// Axis cardinalities for one to three axes, at most 6 tuples each.
pub fn axis_cardinalities() -> impl Strategy<Value = Vec<usize>> {
    vec(1usize..=6, 1..=3)
}

/// Server JSON for a well-formed cellset with the given cardinalities.
///
/// Axis `i` holds one hierarchy `Dim{i}`; tuple `t` on it is member `m{i}_{t}`.
/// Cell `k` has value `k`.
pub fn cellset_json(cardinalities: &[usize]) -> Value {
    let axes: Vec<Value> = cardinalities
        .iter()
        .enumerate()
        .map(|(i, &card)| {
            let dim = format!("Dim{i}");
            let tuples: Vec<Value> = (0..card)
                .map(|t| {
                    json!({
                        "Ordinal": t,
                        "Members": [{
                            "Name": format!("m{i}_{t}"),
                            "UniqueName": format!("[{dim}].[{dim}].[m{i}_{t}]"),
                        }]
                    })
                })
                .collect();
            json!({
                "Ordinal": i,
                "Cardinality": card,
                "Hierarchies": [{"Name": dim, "UniqueName": format!("[{dim}].[{dim}]")}],
                "Tuples": tuples,
            })
        })
        .collect();
    let total: usize = cardinalities.iter().product();
    let cells: Vec<Value> = (0..total)
        .map(|k| json!({"Ordinal": k, "Value": k}))
        .collect();
    json!({ "ID": "generated", "Cube": {"Name": "Generated"}, "Axes": axes, "Cells": cells })
}

/// A load table with `dims` element columns plus a numeric value column.
pub fn load_table(dims: usize, max_rows: usize) -> impl Strategy<Value = Table> {
    let row = (vec(element_name(), dims), -1.0e6f64..1.0e6);
    vec(row, 1..=max_rows.max(1)).prop_map(move |rows| {
        let mut columns: Vec<String> = (0..dims).map(|i| format!("Dim{i}")).collect();
        columns.push("Value".to_string());
        let rows = rows
            .into_iter()
            .map(|(names, value)| {
                let mut row: Vec<CellValue> = names.into_iter().map(CellValue::String).collect();
                row.push(CellValue::Number(value));
                row
            })
            .collect();
        Table { columns, rows }
    })
}
