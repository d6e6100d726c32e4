//! TurboIntegrator process methods.
//!
//! Responsibilities:
//! - CRUD over `/Processes`.
//! - Compile and execute stored or unbound processes.
//! - Read error log files produced by failed executions.

use std::time::Duration;

use reqwest::Method;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::client::Tm1Client;
use crate::client::rest::RequestOptions;
use crate::endpoints::{QueryOptions, keyed};
use crate::error::{ClientError, Result};
use crate::models::process::ProcessWire;
use crate::models::{
    ODataCollection, ParameterValue, Process, ProcessResult, ProcessSyntaxError, is_control_name,
};

fn parameters_body(parameters: &[(&str, ParameterValue)]) -> Vec<Value> {
    parameters
        .iter()
        .map(|(name, value)| json!({ "Name": name, "Value": value }))
        .collect()
}

fn execute_options(timeout: Option<Duration>) -> RequestOptions {
    match timeout {
        Some(t) => RequestOptions::new().timeout(t),
        None => RequestOptions::new(),
    }
}

impl Tm1Client {
    pub async fn get_process(&self, name: &str) -> Result<Process> {
        let wire: ProcessWire = self.rest.get_json(&keyed("/Processes", name)?).await?;
        Ok(wire.into())
    }

    pub async fn get_all_process_names(&self, skip_control: bool) -> Result<Vec<String>> {
        let names = self.get_names("/Processes", QueryOptions::new()).await?;
        Ok(names
            .into_iter()
            .filter(|n| !(skip_control && is_control_name(n)))
            .collect())
    }

    pub async fn process_exists(&self, name: &str) -> Result<bool> {
        self.rest.exists(&keyed("/Processes", name)?).await
    }

    pub async fn create_process(&self, process: &Process) -> Result<()> {
        info!(process = %process.name, "Creating process");
        self.rest.post("/Processes", &process.body()).await?;
        Ok(())
    }

    pub async fn update_process(&self, process: &Process) -> Result<()> {
        self.rest
            .patch(&keyed("/Processes", &process.name)?, &process.body())
            .await?;
        Ok(())
    }

    pub async fn update_or_create_process(&self, process: &Process) -> Result<()> {
        if self.process_exists(&process.name).await? {
            self.update_process(process).await
        } else {
            self.create_process(process).await
        }
    }

    pub async fn delete_process(&self, name: &str) -> Result<()> {
        self.rest.delete_absent_ok(&keyed("/Processes", name)?).await
    }

    /// Compile a stored process; an empty list means it compiles cleanly.
    pub async fn compile_process(&self, name: &str) -> Result<Vec<ProcessSyntaxError>> {
        let path = format!("{}/tm1.Compile", keyed("/Processes", name)?);
        let errors: ODataCollection<ProcessSyntaxError> =
            self.rest.post(&path, &json!({})).await?.json()?;
        Ok(errors.value)
    }

    /// Compile a process without storing it.
    pub async fn compile_unbound_process(
        &self,
        process: &Process,
    ) -> Result<Vec<ProcessSyntaxError>> {
        let errors: ODataCollection<ProcessSyntaxError> = self
            .rest
            .post("/CompileProcess", &json!({ "Process": process.body() }))
            .await?
            .json()?;
        Ok(errors.value)
    }

    /// Execute a stored process. Failures surface as HTTP errors.
    pub async fn execute_process(
        &self,
        name: &str,
        parameters: &[(&str, ParameterValue)],
        timeout: Option<Duration>,
    ) -> Result<()> {
        let path = format!("{}/tm1.Execute", keyed("/Processes", name)?);
        let body = json!({ "Parameters": parameters_body(parameters) });
        info!(process = name, "Executing process");
        self.rest
            .request(
                Method::POST,
                &path,
                Some(serde_json::to_vec(&body)?),
                &execute_options(timeout),
            )
            .await?;
        Ok(())
    }

    /// Execute a stored process and return its status and error log reference.
    pub async fn execute_process_with_return(
        &self,
        name: &str,
        parameters: &[(&str, ParameterValue)],
        timeout: Option<Duration>,
    ) -> Result<ProcessResult> {
        let path = format!(
            "{}/tm1.ExecuteWithReturn?$expand=ErrorLogFile",
            keyed("/Processes", name)?
        );
        let body = json!({ "Parameters": parameters_body(parameters) });
        info!(process = name, "Executing process with return");
        let result: ProcessResult = self
            .rest
            .request(
                Method::POST,
                &path,
                Some(serde_json::to_vec(&body)?),
                &execute_options(timeout),
            )
            .await?
            .json()?;
        if !result.is_success() {
            warn!(process = name, status = %result.status, "Process did not complete successfully");
        }
        Ok(result)
    }

    /// Execute a process definition without storing it.
    pub async fn execute_unbound_process(
        &self,
        process: &Process,
        parameters: &[(&str, ParameterValue)],
        timeout: Option<Duration>,
    ) -> Result<ProcessResult> {
        let body = json!({
            "Process": process.body(),
            "Parameters": parameters_body(parameters),
        });
        info!(process = %process.name, "Executing unbound process");
        self.rest
            .request(
                Method::POST,
                "/ExecuteProcessWithReturn?$expand=ErrorLogFile",
                Some(serde_json::to_vec(&body)?),
                &execute_options(timeout),
            )
            .await?
            .json()
    }

    /// Text of a process error log file.
    pub async fn get_error_log_content(&self, file_name: &str) -> Result<String> {
        let path = format!("{}/Content", keyed("/ErrorLogFiles", file_name)?);
        Ok(self.rest.get(&path).await?.text())
    }

    /// Turn an unsuccessful result into `ProcessFailed`, attaching the error log when readable.
    pub(crate) async fn process_failure(&self, result: &ProcessResult) -> ClientError {
        let error_log_file = result.error_log_file().map(str::to_string);
        let error_log = match &error_log_file {
            Some(file) => match self.get_error_log_content(file).await {
                Ok(content) => Some(content),
                Err(e) => {
                    warn!(file, error = %e, "Cannot read process error log");
                    None
                }
            },
            None => None,
        };
        ClientError::ProcessFailed {
            status: result.status.to_string(),
            error_log_file,
            error_log,
        }
    }
}
