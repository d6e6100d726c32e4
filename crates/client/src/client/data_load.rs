//! Bulk cell loading through a temporary CSV file and an unbound process.
//!
//! Steps: serialize the table as CSV, upload it with the file methods, run an
//! unbound TurboIntegrator process whose ASCII data source is that file and
//! whose Data procedure writes one cell per record, then delete the file.
//! The file is deleted whether or not the load succeeded.

use std::time::Duration;

use tm1_config::constants::DATA_LOAD_FILE_PREFIX;
use tracing::{debug, info, warn};

use crate::client::Tm1Client;
use crate::error::{ClientError, Result};
use crate::models::{AsciiSource, Process, ProcessDataSource, ValueKind};
use crate::tabular::Table;

/// Suffix TM1 11 gives uploaded blobs in its data directory.
const V11_BLOB_SUFFIX: &str = ".blb";

/// Type of the value column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadValueKind {
    #[default]
    Numeric,
    String,
}

#[derive(Debug, Clone, Default)]
pub struct DataLoadOptions {
    pub value_kind: LoadValueKind,
    /// Deadline for the process execution.
    pub timeout: Option<Duration>,
}

impl DataLoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value_kind(mut self, kind: LoadValueKind) -> Self {
        self.value_kind = kind;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// TurboIntegrator string literal.
fn ti_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Process that writes each CSV record `v1..vN` as `vN` into cell `(v1..vN-1)` of `cube`.
pub(crate) fn load_process(
    name: &str,
    cube: &str,
    data_file: &str,
    columns: usize,
    value_kind: LoadValueKind,
) -> Process {
    let mut process = Process::new(name);
    process.data_source = ProcessDataSource::Ascii(AsciiSource::csv(data_file));
    for i in 1..columns {
        process.add_variable(format!("v{i}"), ValueKind::String);
    }
    let value_var = format!("v{columns}");
    let (put, kind) = match value_kind {
        LoadValueKind::Numeric => ("CellPutN", ValueKind::Numeric),
        LoadValueKind::String => ("CellPutS", ValueKind::String),
    };
    process.add_variable(value_var.clone(), kind);
    let coordinates: Vec<String> = (1..columns).map(|i| format!("v{i}")).collect();
    process.data = format!(
        "{put}({value_var},{},{});",
        ti_literal(cube),
        coordinates.join(",")
    );
    process
}

impl Tm1Client {
    /// Write every row of `table` into `cube`.
    ///
    /// All columns but the last hold element names in cube dimension order; the
    /// last holds the value.
    pub async fn load_table(&self, cube: &str, table: &Table, options: &DataLoadOptions) -> Result<()> {
        if table.columns.len() < 2 {
            return Err(ClientError::InvalidArgument(
                "a load table needs at least one element column and a value column".to_string(),
            ));
        }
        if table.is_empty() {
            debug!(cube, "Nothing to load");
            return Ok(());
        }
        let csv = table.to_csv()?;
        let tag = rand::random::<u32>();
        let file_name = format!("{DATA_LOAD_FILE_PREFIX}{tag}.csv");
        let server_file = if self.rest.is_v12().await? {
            file_name.clone()
        } else {
            format!("{file_name}{V11_BLOB_SUFFIX}")
        };
        info!(cube, rows = table.len(), file = %file_name, "Loading cells");

        let loaded = match self.create_file(&file_name, csv).await {
            Ok(()) => {
                let process = load_process(
                    &format!("{DATA_LOAD_FILE_PREFIX}{tag}"),
                    cube,
                    &server_file,
                    table.columns.len(),
                    options.value_kind,
                );
                self.run_load_process(&process, options.timeout).await
            }
            Err(e) => Err(e),
        };
        let removed = self.delete_file(&file_name).await;
        match (loaded, removed) {
            (Ok(()), Ok(())) => {
                info!(cube, rows = table.len(), "Cells loaded");
                Ok(())
            }
            (Ok(()), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup)) => {
                warn!(file = %file_name, error = %cleanup, "Failed to delete load file after error");
                Err(e)
            }
        }
    }

    async fn run_load_process(&self, process: &Process, timeout: Option<Duration>) -> Result<()> {
        let result = self.execute_unbound_process(process, &[], timeout).await?;
        if result.is_success() {
            Ok(())
        } else {
            warn!(process = %process.name, status = %result.status, "Load process failed");
            Err(self.process_failure(&result).await)
        }
    }
}
