//! Cellset creation, extraction and write-back.
//!
//! Responsibilities:
//! - Create cellsets from MDX or saved views and release them.
//! - Extract cells serially or in concurrent ordinal slabs.
//! - Validate cellset shape against axis cardinalities.
//! - Write values through a cellset.
//!
//! Invariants:
//! - A cellset created by a composite operation here is deleted on every exit path.
//! - Parallel extraction writes each slab into its own range of one preallocated vector.

use futures::future::try_join_all;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tm1_config::constants::DEFAULT_MAX_WORKERS;
use tracing::{debug, info, warn};

use crate::client::Tm1Client;
use crate::client::rest::RequestOptions;
use crate::client::views::view_path;
use crate::endpoints::{QueryOptions, keyed, with_sandbox};
use crate::error::{ClientError, Result};
use crate::models::{Cell, CellUpdate, CellValue, Cellset};
use crate::tabular::{Table, cellset_to_table};

const AXES_AND_CUBE_EXPAND: &str = "Cube($select=Name),\
Axes($select=Ordinal,Cardinality;\
$expand=Hierarchies($select=UniqueName,Name),\
Tuples($expand=Members($select=Name,UniqueName,Type,Ordinal,DisplayInfo,DisplayInfoAbove,Attributes)))";

/// Which cell properties to fetch and which cells to leave out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellExtractOptions {
    /// Cell properties to select; empty means `Value`.
    pub properties: Vec<String>,
    pub top: Option<usize>,
    pub skip: usize,
    pub skip_zeros: bool,
    pub skip_consolidated: bool,
    pub skip_rule_derived: bool,
    pub sandbox: Option<String>,
}

impl CellExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn property(mut self, name: impl Into<String>) -> Self {
        self.properties.push(name.into());
        self
    }

    pub fn top(mut self, top: usize) -> Self {
        self.top = Some(top);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    pub fn skip_zeros(mut self, skip: bool) -> Self {
        self.skip_zeros = skip;
        self
    }

    pub fn skip_consolidated(mut self, skip: bool) -> Self {
        self.skip_consolidated = skip;
        self
    }

    pub fn skip_rule_derived(mut self, skip: bool) -> Self {
        self.skip_rule_derived = skip;
        self
    }

    pub fn sandbox(mut self, sandbox: impl Into<String>) -> Self {
        self.sandbox = Some(sandbox.into());
        self
    }

    fn filters_cells(&self) -> bool {
        self.skip_zeros || self.skip_consolidated || self.skip_rule_derived
    }

    /// Whether the result may hold fewer cells than the cellset.
    fn is_partial(&self) -> bool {
        self.filters_cells() || self.top.is_some() || self.skip > 0
    }

    /// Selected properties, deduplicated in first-seen order.
    pub fn cell_properties(&self) -> Vec<String> {
        let mut props: Vec<String> = if self.properties.is_empty() {
            vec!["Value".to_string()]
        } else {
            self.properties.clone()
        };
        let mut push = |p: &str| {
            if !props.iter().any(|have| have == p) {
                props.push(p.to_string());
            }
        };
        if self.skip_rule_derived {
            push("RuleDerived");
            push("Updateable");
        }
        if self.skip_consolidated {
            push("Consolidated");
        }
        if self.is_partial() {
            push("Ordinal");
        }
        props
    }

    /// `$filter` conjuncts over cell properties.
    pub fn cell_filters(&self) -> Vec<&'static str> {
        let mut filters = Vec::new();
        if self.skip_zeros {
            filters.push("Value ne 0 and Value ne null and Value ne ''");
        }
        if self.skip_consolidated {
            filters.push("Consolidated eq false");
        }
        if self.skip_rule_derived {
            filters.push("RuleDerived eq false");
        }
        filters
    }

    /// Inner options of `$expand=Cells(...)`.
    pub fn cells_expand(&self) -> String {
        let mut parts = vec![format!("$select={}", self.cell_properties().join(","))];
        if let Some(top) = self.top {
            parts.push(format!("$top={top}"));
        }
        if self.skip > 0 {
            parts.push(format!("$skip={}", self.skip));
        }
        let filters = self.cell_filters();
        if !filters.is_empty() {
            parts.push(format!("$filter={}", filters.join(" and ")));
        }
        format!("Cells({})", parts.join(";"))
    }
}

#[derive(Deserialize)]
struct CellsetId {
    #[serde(rename = "ID")]
    id: String,
}

#[derive(Deserialize)]
struct CellsOnly {
    #[serde(rename = "Cells", default)]
    cells: Vec<Cell>,
}

/// End-clamped `[start, end)` ranges of `slab` items covering `0..total`.
fn slab_ranges(total: usize, workers: usize) -> Vec<(usize, usize)> {
    let workers = workers.max(1);
    let slab = total.div_ceil(workers).max(1);
    (0..workers)
        .map(|k| {
            let start = (k * slab).min(total);
            let end = ((k + 1) * slab).min(total);
            (start, end)
        })
        .collect()
}

/// Check the axis post-conditions of a fetched cellset.
fn validate_axes(cellset: &Cellset) -> Result<()> {
    for (i, axis) in cellset.axes.iter().enumerate() {
        if axis.ordinal != i {
            return Err(ClientError::ProtocolError(format!(
                "axis at position {i} has ordinal {}",
                axis.ordinal
            )));
        }
        if axis.tuples.len() != axis.cardinality {
            return Err(ClientError::ProtocolError(format!(
                "axis {i} has cardinality {} but {} tuples",
                axis.cardinality,
                axis.tuples.len()
            )));
        }
        let width = axis.hierarchies.len();
        if let Some(t) = axis.tuples.iter().find(|t| t.members.len() != width) {
            return Err(ClientError::ProtocolError(format!(
                "tuple on axis {i} has {} members for {width} hierarchies",
                t.members.len()
            )));
        }
    }
    Ok(())
}

/// The operation's error wins over a failed release; a failed release after
/// success is returned.
fn finish_with_release<T>(id: &str, outcome: Result<T>, released: Result<()>) -> Result<T> {
    match (outcome, released) {
        (Ok(v), Ok(())) => Ok(v),
        (Ok(_), Err(e)) => Err(e),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(release)) => {
            warn!(cellset = id, error = %release, "Failed to release cellset after error");
            Err(e)
        }
    }
}

impl Tm1Client {
    fn cellset_path(id: &str) -> Result<String> {
        keyed("/Cellsets", id)
    }

    /// Execute MDX and return the new cellset id.
    pub async fn create_cellset(&self, mdx: &str, sandbox: Option<&str>) -> Result<String> {
        let path = with_sandbox("/ExecuteMDX", sandbox);
        let created: CellsetId = self.rest.post(&path, &json!({ "MDX": mdx })).await?.json()?;
        debug!(cellset = %created.id, "Created cellset");
        Ok(created.id)
    }

    /// Execute a saved view and return the new cellset id.
    pub async fn create_cellset_from_view(
        &self,
        cube: &str,
        view: &str,
        private: bool,
        sandbox: Option<&str>,
    ) -> Result<String> {
        let path = with_sandbox(
            &format!("{}/tm1.Execute", view_path(cube, view, private)?),
            sandbox,
        );
        let created: CellsetId = self.rest.post(&path, &json!({})).await?.json()?;
        debug!(cellset = %created.id, cube, view, "Created cellset from view");
        Ok(created.id)
    }

    /// Release a cellset. Missing cellsets are not an error.
    pub async fn delete_cellset(&self, id: &str) -> Result<()> {
        self.rest.delete_absent_ok(&Self::cellset_path(id)?).await
    }

    pub async fn cellset_cell_count(&self, id: &str, sandbox: Option<&str>) -> Result<usize> {
        let path = with_sandbox(&format!("{}/Cells/$count", Self::cellset_path(id)?), sandbox);
        let raw = self.rest.get(&path).await?.plain_value();
        raw.parse().map_err(|_| {
            ClientError::ProtocolError(format!("cell count is not an integer: {raw:?}"))
        })
    }

    /// Cells of a cellset, filtered and paged per `options`.
    pub async fn extract_cellset_raw(
        &self,
        id: &str,
        options: &CellExtractOptions,
    ) -> Result<Vec<Cell>> {
        let path = QueryOptions::new()
            .expand(options.cells_expand())
            .sandbox(options.sandbox.as_deref())
            .apply(&Self::cellset_path(id)?);
        let cells: CellsOnly = self.rest.get_json(&path).await?;
        if let Some(m) = self.rest.metrics() {
            m.record_cells_extracted(cells.cells.len());
        }
        Ok(cells.cells)
    }

    /// All cells of a cellset, fetched as `max_workers` concurrent slabs of ordinals.
    ///
    /// A `max_workers` of zero uses [`DEFAULT_MAX_WORKERS`]. The result equals a
    /// serial extraction. The first failing slab fails the call.
    pub async fn extract_cellset_parallel(
        &self,
        id: &str,
        properties: &[&str],
        sandbox: Option<&str>,
        max_workers: usize,
    ) -> Result<Vec<Cell>> {
        let total = self.cellset_cell_count(id, sandbox).await?;
        if total == 0 {
            return Ok(Vec::new());
        }
        let workers = if max_workers == 0 {
            DEFAULT_MAX_WORKERS
        } else {
            max_workers
        };
        let ranges = slab_ranges(total, workers);
        debug!(cellset = id, total, slabs = ranges.len(), "Extracting cells in parallel");

        let slabs = ranges.iter().map(|&(start, end)| {
            let options = CellExtractOptions {
                properties: properties.iter().map(|p| p.to_string()).collect(),
                top: Some(end - start),
                skip: start,
                sandbox: sandbox.map(str::to_string),
                ..CellExtractOptions::default()
            };
            async move {
                if start == end {
                    return Ok((start, Vec::new()));
                }
                let cells = self.extract_cellset_raw(id, &options).await?;
                if cells.len() != end - start {
                    return Err(ClientError::ProtocolError(format!(
                        "slab {start}..{end} returned {} cells",
                        cells.len()
                    )));
                }
                Ok((start, cells))
            }
        });
        let fetched = try_join_all(slabs).await?;

        let mut cells = vec![Cell::default(); total];
        for (start, slab) in fetched {
            let len = slab.len();
            for (slot, cell) in cells[start..start + len].iter_mut().zip(slab) {
                *slot = cell;
            }
        }
        Ok(cells)
    }

    /// Axes and source cube of a cellset, without cells.
    pub async fn extract_cellset_axes_and_cube(
        &self,
        id: &str,
        sandbox: Option<&str>,
    ) -> Result<Cellset> {
        let path = QueryOptions::new()
            .expand(AXES_AND_CUBE_EXPAND)
            .sandbox(sandbox)
            .apply(&Self::cellset_path(id)?);
        let mut cellset: Cellset = self.rest.get_json(&path).await?;
        validate_axes(&cellset)?;
        cellset.id = Some(id.to_string());
        Ok(cellset)
    }

    /// Axes, cube and cells of a cellset in one request.
    ///
    /// Without filtering or paging, the cell count must equal the product of
    /// axis cardinalities.
    pub async fn extract_cellset(&self, id: &str, options: &CellExtractOptions) -> Result<Cellset> {
        let expand = format!("{AXES_AND_CUBE_EXPAND},{}", options.cells_expand());
        let path = QueryOptions::new()
            .expand(expand)
            .sandbox(options.sandbox.as_deref())
            .apply(&Self::cellset_path(id)?);
        let mut cellset: Cellset = self.rest.get_json(&path).await?;
        validate_axes(&cellset)?;
        if !options.is_partial() && cellset.cells.len() != cellset.expected_cell_count() {
            return Err(ClientError::ProtocolError(format!(
                "cellset has {} cells, axes imply {}",
                cellset.cells.len(),
                cellset.expected_cell_count()
            )));
        }
        if let Some(m) = self.rest.metrics() {
            m.record_cells_extracted(cellset.cells.len());
        }
        cellset.id = Some(id.to_string());
        Ok(cellset)
    }

    /// Write `values` to consecutive ordinals starting at `ordinal_offset`.
    pub async fn update_cellset(
        &self,
        id: &str,
        values: &[CellValue],
        ordinal_offset: usize,
        sandbox: Option<&str>,
    ) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let updates: Vec<CellUpdate> = values
            .iter()
            .enumerate()
            .map(|(i, v)| CellUpdate {
                ordinal: ordinal_offset + i,
                value: v.clone(),
            })
            .collect();
        let path = with_sandbox(&format!("{}/Cells", Self::cellset_path(id)?), sandbox);
        debug!(cellset = id, count = updates.len(), ordinal_offset, "Updating cells");
        self.rest
            .request(
                Method::PATCH,
                &path,
                Some(serde_json::to_vec(&updates)?),
                &RequestOptions::default(),
            )
            .await?;
        Ok(())
    }

    /// Write `values` in consecutive chunks of at most `partition_size` cells.
    pub async fn update_cellset_partitioned(
        &self,
        id: &str,
        values: &[CellValue],
        partition_size: usize,
        sandbox: Option<&str>,
    ) -> Result<()> {
        if partition_size == 0 {
            return Err(ClientError::InvalidArgument(
                "partition_size must be at least 1".to_string(),
            ));
        }
        for (k, chunk) in values.chunks(partition_size).enumerate() {
            self.update_cellset(id, chunk, k * partition_size, sandbox)
                .await?;
        }
        Ok(())
    }

    /// Write `values` into the cells selected by `mdx`.
    pub async fn write_values_through_cellset(
        &self,
        mdx: &str,
        values: &[CellValue],
        sandbox: Option<&str>,
    ) -> Result<()> {
        let id = self.create_cellset(mdx, sandbox).await?;
        let written = self.update_cellset(&id, values, 0, sandbox).await;
        let released = self.delete_cellset(&id).await;
        info!(cellset = %id, count = values.len(), ok = written.is_ok(), "Wrote values through cellset");
        finish_with_release(&id, written, released)
    }

    /// Run MDX and return the whole cellset.
    pub async fn execute_mdx(&self, mdx: &str, options: &CellExtractOptions) -> Result<Cellset> {
        let id = self.create_cellset(mdx, options.sandbox.as_deref()).await?;
        let extracted = self.extract_cellset(&id, options).await;
        let released = self.delete_cellset(&id).await;
        finish_with_release(&id, extracted, released)
    }

    /// Run a saved view and return the whole cellset.
    pub async fn execute_view(
        &self,
        cube: &str,
        view: &str,
        private: bool,
        options: &CellExtractOptions,
    ) -> Result<Cellset> {
        let id = self
            .create_cellset_from_view(cube, view, private, options.sandbox.as_deref())
            .await?;
        let extracted = self.extract_cellset(&id, options).await;
        let released = self.delete_cellset(&id).await;
        finish_with_release(&id, extracted, released)
    }

    /// Run MDX and return only the cell values, in ordinal order.
    pub async fn execute_mdx_values(&self, mdx: &str, sandbox: Option<&str>) -> Result<Vec<CellValue>> {
        let id = self.create_cellset(mdx, sandbox).await?;
        let options = CellExtractOptions {
            sandbox: sandbox.map(str::to_string),
            ..CellExtractOptions::default()
        };
        let extracted = self.extract_cellset_raw(&id, &options).await;
        let released = self.delete_cellset(&id).await;
        let cells = finish_with_release(&id, extracted, released)?;
        Ok(cells.into_iter().map(|c| c.value).collect())
    }

    /// Run MDX and project the cellset onto a table.
    pub async fn execute_mdx_table(&self, mdx: &str, options: &CellExtractOptions) -> Result<Table> {
        let cellset = self.execute_mdx(mdx, options).await?;
        cellset_to_table(&cellset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_properties() {
        let opts = CellExtractOptions::new();
        assert_eq!(opts.cell_properties(), vec!["Value"]);
        assert!(opts.cell_filters().is_empty());
        assert_eq!(opts.cells_expand(), "Cells($select=Value)");
    }

    #[test]
    fn test_skip_flags_add_properties_and_filters() {
        let opts = CellExtractOptions::new()
            .skip_zeros(true)
            .skip_consolidated(true)
            .skip_rule_derived(true);
        assert_eq!(
            opts.cell_properties(),
            vec!["Value", "RuleDerived", "Updateable", "Consolidated", "Ordinal"]
        );
        assert_eq!(opts.cell_filters().len(), 3);
        assert!(opts.cells_expand().contains(" and Consolidated eq false and "));
    }

    #[test]
    fn test_paging_adds_ordinal_without_duplicates() {
        let opts = CellExtractOptions::new()
            .property("Ordinal")
            .property("Value")
            .top(10)
            .skip(20);
        assert_eq!(opts.cell_properties(), vec!["Ordinal", "Value"]);
        assert_eq!(
            opts.cells_expand(),
            "Cells($select=Ordinal,Value;$top=10;$skip=20)"
        );
    }

    #[test]
    fn test_slab_ranges_cover_and_clamp() {
        assert_eq!(slab_ranges(10, 4), vec![(0, 3), (3, 6), (6, 9), (9, 10)]);
        assert_eq!(slab_ranges(9, 6), vec![(0, 2), (2, 4), (4, 6), (6, 8), (8, 9), (9, 9)]);
        assert_eq!(slab_ranges(3, 0), vec![(0, 3)]);
        assert_eq!(slab_ranges(2, 4).len(), 4);
    }

    #[test]
    fn test_validate_axes_rejects_cardinality_mismatch() {
        let cs: Cellset = serde_json::from_value(json!({
            "Axes": [{"Ordinal": 0, "Cardinality": 2,
                      "Hierarchies": [{"Name": "Line"}],
                      "Tuples": [{"Members": [{"Name": "e1"}]}]}]
        }))
        .unwrap();
        assert!(matches!(validate_axes(&cs), Err(ClientError::ProtocolError(_))));
    }

    #[test]
    fn test_validate_axes_rejects_member_width_mismatch() {
        let cs: Cellset = serde_json::from_value(json!({
            "Axes": [{"Ordinal": 0, "Cardinality": 1,
                      "Hierarchies": [{"Name": "Line"}, {"Name": "Measure"}],
                      "Tuples": [{"Members": [{"Name": "e1"}]}]}]
        }))
        .unwrap();
        assert!(validate_axes(&cs).is_err());
    }
}
