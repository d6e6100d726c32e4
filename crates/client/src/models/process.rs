//! TurboIntegrator process models.
//!
//! Responsibilities:
//! - Represent a process with its four procedures, parameters, variables and data source.
//! - Render the request body the server expects, including the generated-statements
//!   header every procedure carries.
//! - Decode execution results and compile errors.
//!
//! Does NOT handle:
//! - Executing or compiling anything (see `client::processes`).

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

/// Header the server places at the top of every procedure.
pub const GENERATED_STATEMENTS_HEADER: &str =
    "\r\n#****Begin: Generated Statements***\r\n#****End: Generated Statements****\r\n\r\n";

fn with_generated_header(code: &str) -> String {
    if code.contains("#****Begin: Generated Statements***") {
        code.to_string()
    } else {
        format!("{GENERATED_STATEMENTS_HEADER}{code}")
    }
}

/// Parameter and variable kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    String,
    Numeric,
}

/// A parameter default or an execution argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Number(f64),
    String(String),
}

impl From<&str> for ParameterValue {
    fn from(s: &str) -> Self {
        ParameterValue::String(s.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(s: String) -> Self {
        ParameterValue::String(s)
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Number(v)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessParameter {
    pub name: String,
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub value: Option<ParameterValue>,
    #[serde(rename = "Type")]
    pub kind: ValueKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessVariable {
    pub name: String,
    #[serde(rename = "Type")]
    pub kind: ValueKind,
    #[serde(default)]
    pub position: usize,
    #[serde(default)]
    pub start_byte: usize,
    #[serde(default)]
    pub end_byte: usize,
}

/// ASCII file source settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AsciiSource {
    pub file_name: String,
    pub delimiter: String,
    pub quote: String,
    pub decimal_separator: String,
    pub thousand_separator: String,
    pub header_records: u32,
}

impl AsciiSource {
    /// Comma-separated, double-quoted, one header row.
    pub fn csv(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            delimiter: ",".to_string(),
            quote: "\"".to_string(),
            decimal_separator: ".".to_string(),
            thousand_separator: ",".to_string(),
            header_records: 1,
        }
    }
}

/// Where the Data procedure reads its records from.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ProcessDataSource {
    #[default]
    None,
    Ascii(AsciiSource),
    Odbc {
        dsn: String,
        user: Option<String>,
        query: String,
        uses_unicode: bool,
    },
    CubeView {
        cube: String,
        view: String,
    },
    DimensionSubset {
        dimension: String,
        subset: String,
    },
}

/// Flat wire shape of `DataSource`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct DataSourceWire {
    #[serde(rename = "Type", default)]
    kind: String,
    #[serde(rename = "asciiDecimalSeparator", skip_serializing_if = "Option::is_none", default)]
    ascii_decimal_separator: Option<String>,
    #[serde(rename = "asciiDelimiterChar", skip_serializing_if = "Option::is_none", default)]
    ascii_delimiter_char: Option<String>,
    #[serde(rename = "asciiDelimiterType", skip_serializing_if = "Option::is_none", default)]
    ascii_delimiter_type: Option<String>,
    #[serde(rename = "asciiHeaderRecords", skip_serializing_if = "Option::is_none", default)]
    ascii_header_records: Option<u32>,
    #[serde(rename = "asciiQuoteCharacter", skip_serializing_if = "Option::is_none", default)]
    ascii_quote_character: Option<String>,
    #[serde(rename = "asciiThousandSeparator", skip_serializing_if = "Option::is_none", default)]
    ascii_thousand_separator: Option<String>,
    #[serde(rename = "dataSourceNameForClient", skip_serializing_if = "Option::is_none", default)]
    name_for_client: Option<String>,
    #[serde(rename = "dataSourceNameForServer", skip_serializing_if = "Option::is_none", default)]
    name_for_server: Option<String>,
    #[serde(rename = "userName", skip_serializing_if = "Option::is_none", default)]
    user_name: Option<String>,
    #[serde(rename = "query", skip_serializing_if = "Option::is_none", default)]
    query: Option<String>,
    #[serde(rename = "usesUnicode", skip_serializing_if = "Option::is_none", default)]
    uses_unicode: Option<bool>,
    #[serde(rename = "view", skip_serializing_if = "Option::is_none", default)]
    view: Option<String>,
    #[serde(rename = "subset", skip_serializing_if = "Option::is_none", default)]
    subset: Option<String>,
}

impl From<&ProcessDataSource> for DataSourceWire {
    fn from(source: &ProcessDataSource) -> Self {
        match source {
            ProcessDataSource::None => DataSourceWire {
                kind: "None".to_string(),
                ..Default::default()
            },
            ProcessDataSource::Ascii(a) => DataSourceWire {
                kind: "ASCII".to_string(),
                ascii_decimal_separator: Some(a.decimal_separator.clone()),
                ascii_delimiter_char: Some(a.delimiter.clone()),
                ascii_delimiter_type: Some("Character".to_string()),
                ascii_header_records: Some(a.header_records),
                ascii_quote_character: Some(a.quote.clone()),
                ascii_thousand_separator: Some(a.thousand_separator.clone()),
                name_for_client: Some(a.file_name.clone()),
                name_for_server: Some(a.file_name.clone()),
                ..Default::default()
            },
            ProcessDataSource::Odbc {
                dsn,
                user,
                query,
                uses_unicode,
            } => DataSourceWire {
                kind: "ODBC".to_string(),
                name_for_client: Some(dsn.clone()),
                name_for_server: Some(dsn.clone()),
                user_name: user.clone(),
                query: Some(query.clone()),
                uses_unicode: Some(*uses_unicode),
                ..Default::default()
            },
            ProcessDataSource::CubeView { cube, view } => DataSourceWire {
                kind: "TM1CubeView".to_string(),
                name_for_client: Some(cube.clone()),
                name_for_server: Some(cube.clone()),
                view: Some(view.clone()),
                ..Default::default()
            },
            ProcessDataSource::DimensionSubset { dimension, subset } => DataSourceWire {
                kind: "TM1DimensionSubset".to_string(),
                name_for_client: Some(dimension.clone()),
                name_for_server: Some(dimension.clone()),
                subset: Some(subset.clone()),
                ..Default::default()
            },
        }
    }
}

impl From<DataSourceWire> for ProcessDataSource {
    fn from(w: DataSourceWire) -> Self {
        let server = w.name_for_server.unwrap_or_default();
        match w.kind.as_str() {
            "ASCII" => ProcessDataSource::Ascii(AsciiSource {
                file_name: server,
                delimiter: w.ascii_delimiter_char.unwrap_or_else(|| ",".into()),
                quote: w.ascii_quote_character.unwrap_or_else(|| "\"".into()),
                decimal_separator: w.ascii_decimal_separator.unwrap_or_else(|| ".".into()),
                thousand_separator: w.ascii_thousand_separator.unwrap_or_else(|| ",".into()),
                header_records: w.ascii_header_records.unwrap_or(0),
            }),
            "ODBC" => ProcessDataSource::Odbc {
                dsn: server,
                user: w.user_name,
                query: w.query.unwrap_or_default(),
                uses_unicode: w.uses_unicode.unwrap_or(false),
            },
            "TM1CubeView" => ProcessDataSource::CubeView {
                cube: server,
                view: w.view.unwrap_or_default(),
            },
            "TM1DimensionSubset" => ProcessDataSource::DimensionSubset {
                dimension: server,
                subset: w.subset.unwrap_or_default(),
            },
            _ => ProcessDataSource::None,
        }
    }
}

/// A TurboIntegrator process.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Process {
    pub name: String,
    pub has_security_access: bool,
    pub prolog: String,
    pub metadata: String,
    pub data: String,
    pub epilog: String,
    pub parameters: Vec<ProcessParameter>,
    pub variables: Vec<ProcessVariable>,
    pub data_source: ProcessDataSource,
}

impl Process {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn add_parameter(
        &mut self,
        name: impl Into<String>,
        prompt: impl Into<String>,
        value: ParameterValue,
    ) {
        let kind = match value {
            ParameterValue::Number(_) => ValueKind::Numeric,
            ParameterValue::String(_) => ValueKind::String,
        };
        self.parameters.push(ProcessParameter {
            name: name.into(),
            prompt: prompt.into(),
            value: Some(value),
            kind,
        });
    }

    /// Append a variable at the next position.
    pub fn add_variable(&mut self, name: impl Into<String>, kind: ValueKind) {
        let position = self.variables.len() + 1;
        self.variables.push(ProcessVariable {
            name: name.into(),
            kind,
            position,
            start_byte: 0,
            end_byte: 0,
        });
    }

    /// Request body for create, update and unbound execution.
    pub fn body(&self) -> Value {
        let variables_ui: Vec<&str> = self
            .variables
            .iter()
            .map(|v| match v.kind {
                ValueKind::String => "VarType=32\u{c}ColType=827\u{c}",
                ValueKind::Numeric => "VarType=33\u{c}ColType=827\u{c}",
            })
            .collect();
        json!({
            "Name": self.name,
            "HasSecurityAccess": self.has_security_access,
            "PrologProcedure": with_generated_header(&self.prolog),
            "MetadataProcedure": with_generated_header(&self.metadata),
            "DataProcedure": with_generated_header(&self.data),
            "EpilogProcedure": with_generated_header(&self.epilog),
            "DataSource": DataSourceWire::from(&self.data_source),
            "Parameters": self.parameters,
            "Variables": self.variables,
            "VariablesUIData": variables_ui,
            "UIData": "CubeAction=1511\u{c}DataAction=1503\u{c}CubeLogChanges=0\u{c}",
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ProcessWire {
    name: String,
    #[serde(default)]
    has_security_access: bool,
    #[serde(default, deserialize_with = "crate::serde_helpers::null_as_default")]
    prolog_procedure: String,
    #[serde(default, deserialize_with = "crate::serde_helpers::null_as_default")]
    metadata_procedure: String,
    #[serde(default, deserialize_with = "crate::serde_helpers::null_as_default")]
    data_procedure: String,
    #[serde(default, deserialize_with = "crate::serde_helpers::null_as_default")]
    epilog_procedure: String,
    #[serde(default, deserialize_with = "crate::serde_helpers::null_as_default")]
    parameters: Vec<ProcessParameter>,
    #[serde(default, deserialize_with = "crate::serde_helpers::null_as_default")]
    variables: Vec<ProcessVariable>,
    #[serde(default)]
    data_source: Option<DataSourceWire>,
}

impl From<ProcessWire> for Process {
    fn from(w: ProcessWire) -> Self {
        Process {
            name: w.name,
            has_security_access: w.has_security_access,
            prolog: w.prolog_procedure,
            metadata: w.metadata_procedure,
            data: w.data_procedure,
            epilog: w.epilog_procedure,
            parameters: w.parameters,
            variables: w.variables,
            data_source: w.data_source.map(Into::into).unwrap_or_default(),
        }
    }
}

/// Outcome reported by `ExecuteWithReturn`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum ProcessExecuteStatus {
    CompletedSuccessfully,
    HasMinorErrors,
    Aborted,
    QuitCalled,
    RollbackCalled,
    #[serde(other)]
    Unknown,
}

impl ProcessExecuteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CompletedSuccessfully => "CompletedSuccessfully",
            Self::HasMinorErrors => "HasMinorErrors",
            Self::Aborted => "Aborted",
            Self::QuitCalled => "QuitCalled",
            Self::RollbackCalled => "RollbackCalled",
            Self::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ProcessExecuteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ErrorLogFileRef {
    #[serde(rename = "Filename")]
    filename: String,
}

/// Result of executing a process with return.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessResult {
    #[serde(rename = "ProcessExecuteStatusCode")]
    pub status: ProcessExecuteStatus,
    #[serde(rename = "ErrorLogFile", default)]
    error_log_file: Option<ErrorLogFileRef>,
}

impl ProcessResult {
    pub fn is_success(&self) -> bool {
        self.status == ProcessExecuteStatus::CompletedSuccessfully
    }

    pub fn error_log_file(&self) -> Option<&str> {
        self.error_log_file.as_ref().map(|f| f.filename.as_str())
    }
}

/// A compile error reported by `tm1.Compile`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProcessSyntaxError {
    #[serde(default)]
    pub procedure: String,
    #[serde(default)]
    pub line_number: i64,
    #[serde(default)]
    pub message: String,
}
