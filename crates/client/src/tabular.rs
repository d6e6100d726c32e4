//! Tabular projection of cellsets.
//!
//! A [`Table`] has one column per hierarchy per axis (axis order, then
//! hierarchy order), followed by a single `Value` column, and one row per cell.
//! The same shape is what the bulk loader and the table-to-MDX builder consume.

use crate::error::{ClientError, Result};
use crate::models::{CellValue, Cellset};

/// Name of the trailing value column.
pub const VALUE_COLUMN: &str = "Value";

/// Rows of cell values under named columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row; its width must match the header.
    pub fn push_row(&mut self, row: Vec<CellValue>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(ClientError::InvalidArgument(format!(
                "row has {} values but the table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of column `idx`, top to bottom.
    pub fn column(&self, idx: usize) -> impl Iterator<Item = &CellValue> {
        self.rows.iter().filter_map(move |r| r.get(idx))
    }

    /// Serialize as CSV: header row, `,` delimiter, `"` quoting, UTF-8.
    pub fn to_csv(&self) -> Result<Vec<u8>> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b',')
            .quote(b'"')
            .from_writer(Vec::new());
        let csv_err = |e: csv::Error| ClientError::InvalidArgument(format!("cannot write CSV: {e}"));
        writer.write_record(&self.columns).map_err(csv_err)?;
        for row in &self.rows {
            writer
                .write_record(row.iter().map(|v| v.to_string()))
                .map_err(csv_err)?;
        }
        writer
            .into_inner()
            .map_err(|e| ClientError::InvalidArgument(format!("cannot flush CSV: {}", e.error())))
    }
}

/// Project a cellset onto a table.
///
/// Cell `k` (its ordinal when present) maps to tuple `(k / c0 / .. / c{i-1}) mod ci`
/// on axis `i`, where `ci` is that axis's cardinality.
pub fn cellset_to_table(cellset: &Cellset) -> Result<Table> {
    let mut columns: Vec<String> = cellset
        .axes
        .iter()
        .flat_map(|axis| {
            axis.hierarchies.iter().map(|h| {
                if h.unique_name.is_empty() {
                    h.name.clone()
                } else {
                    h.unique_name.clone()
                }
            })
        })
        .collect();
    columns.push(VALUE_COLUMN.to_string());

    let mut table = Table::new(columns);
    for (k, cell) in cellset.cells.iter().enumerate() {
        let ordinal = cell.ordinal.unwrap_or(k);
        let mut row = Vec::with_capacity(table.columns.len());
        let mut stride = 1usize;
        for axis in &cellset.axes {
            if axis.cardinality == 0 {
                return Err(ClientError::ProtocolError(format!(
                    "axis {} is empty but the cellset has cells",
                    axis.ordinal
                )));
            }
            let idx = (ordinal / stride) % axis.cardinality;
            stride = stride.saturating_mul(axis.cardinality);
            let tuple = axis.tuples.get(idx).ok_or_else(|| {
                ClientError::ProtocolError(format!(
                    "axis {} has no tuple {idx}",
                    axis.ordinal
                ))
            })?;
            row.extend(
                tuple
                    .members
                    .iter()
                    .map(|m| CellValue::String(m.name.clone())),
            );
        }
        row.push(cell.value.clone());
        table.push_row(row).map_err(|_| {
            ClientError::ProtocolError(format!(
                "tuple members of cell {ordinal} do not match the axis hierarchies"
            ))
        })?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cellset_2x2() -> Cellset {
        serde_json::from_value(json!({
            "ID": "cs",
            "Cube": {"Name": "Sales"},
            "Axes": [
                {"Ordinal": 0, "Cardinality": 2,
                 "Hierarchies": [{"Name": "Year", "UniqueName": "[Year].[Year]"}],
                 "Tuples": [
                    {"Ordinal": 0, "Members": [{"Name": "2023"}]},
                    {"Ordinal": 1, "Members": [{"Name": "2024"}]}]},
                {"Ordinal": 1, "Cardinality": 2,
                 "Hierarchies": [{"Name": "Region", "UniqueName": "[Region].[Region]"}],
                 "Tuples": [
                    {"Ordinal": 0, "Members": [{"Name": "US"}]},
                    {"Ordinal": 1, "Members": [{"Name": "UK"}]}]}
            ],
            "Cells": [
                {"Ordinal": 0, "Value": 1},
                {"Ordinal": 1, "Value": 2},
                {"Ordinal": 2, "Value": 3},
                {"Ordinal": 3, "Value": null}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_projection_columns_and_rows() {
        let table = cellset_to_table(&cellset_2x2()).unwrap();
        assert_eq!(table.columns, vec!["[Year].[Year]", "[Region].[Region]", "Value"]);
        assert_eq!(table.len(), 4);
        assert_eq!(
            table.rows[2],
            vec![
                CellValue::from("2023"),
                CellValue::from("UK"),
                CellValue::Number(3.0)
            ]
        );
        assert!(table.rows[3][2].is_null());
    }

    #[test]
    fn test_projection_uses_ordinals_of_filtered_cells() {
        let mut cs = cellset_2x2();
        cs.cells.retain(|c| c.ordinal == Some(3));
        let table = cellset_to_table(&cs).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows[0][0], CellValue::from("2024"));
        assert_eq!(table.rows[0][1], CellValue::from("UK"));
    }

    #[test]
    fn test_to_csv() {
        let table = Table::from_rows(
            vec!["Line".into(), "Measure".into(), "Value".into()],
            vec![
                vec!["e1".into(), "Value".into(), CellValue::Number(21000000.0)],
                vec!["e,2".into(), "Value".into(), CellValue::Number(0.5)],
            ],
        )
        .unwrap();
        let csv = String::from_utf8(table.to_csv().unwrap()).unwrap();
        assert_eq!(csv, "Line,Measure,Value\ne1,Value,21000000\n\"e,2\",Value,0.5\n");
    }

    #[test]
    fn test_push_row_width_mismatch() {
        let mut t = Table::new(vec!["a".into(), "Value".into()]);
        assert!(matches!(
            t.push_row(vec![CellValue::Null]),
            Err(ClientError::InvalidArgument(_))
        ));
    }
}
