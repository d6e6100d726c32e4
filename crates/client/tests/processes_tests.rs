//! TurboIntegrator process façade tests.
//!
//! # Invariants
//! - Procedures always carry the generated-statements header exactly once
//! - Execution parameters are sent as `[{Name, Value}]`
//! - `ExecuteWithReturn` decodes the status and the error log reference

mod common;

use common::*;
use serde_json::{Value, json};
use tm1_client::models::{ParameterValue, ProcessExecuteStatus};
use tm1_client::Process;
use wiremock::matchers::{body_json, method, path, query_param};

#[tokio::test]
async fn test_get_process_decodes_procedures() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("GET"))
        .and(path(api("/Processes('load')")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Name": "load",
            "HasSecurityAccess": false,
            "PrologProcedure": "#****Begin: Generated Statements***\r\n#****End: Generated Statements****\r\nx = 1;",
            "MetadataProcedure": null,
            "DataProcedure": "",
            "EpilogProcedure": "",
            "Parameters": [{"Name": "pYear", "Prompt": "", "Value": "2026", "Type": "String"}],
            "Variables": [],
            "DataSource": {"Type": "None"}
        })))
        .mount(&server)
        .await;

    let process = client.get_process("load").await.unwrap();
    assert!(process.prolog.ends_with("x = 1;"));
    assert_eq!(process.metadata, "");
    assert_eq!(process.parameters[0].name, "pYear");
    assert_eq!(
        process.parameters[0].value,
        Some(ParameterValue::String("2026".into()))
    );
}

#[tokio::test]
async fn test_create_process_adds_header_once() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("POST"))
        .and(path(api("/Processes")))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let mut process = Process::new("load");
    process.prolog = "x = 1;".into();
    client.create_process(&process).await.unwrap();

    let requests = received(&server, "POST", &api("/Processes")).await;
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let prolog = body["PrologProcedure"].as_str().unwrap();
    assert_eq!(prolog.matches("#****Begin: Generated Statements***").count(), 1);
    assert!(prolog.ends_with("x = 1;"));
}

#[tokio::test]
async fn test_execute_process_sends_parameters() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("POST"))
        .and(path(api("/Processes('load')/tm1.Execute")))
        .and(body_json(json!({
            "Parameters": [
                {"Name": "pYear", "Value": "2026"},
                {"Name": "pScale", "Value": 1.5}
            ]
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client
        .execute_process(
            "load",
            &[("pYear", "2026".into()), ("pScale", 1.5.into())],
            None,
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_execute_with_return_decodes_status() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("POST"))
        .and(path(api("/Processes('load')/tm1.ExecuteWithReturn")))
        .and(query_param("$expand", "ErrorLogFile"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(load_fixture("processes/execute_aborted.json")),
        )
        .mount(&server)
        .await;

    let result = client
        .execute_process_with_return("load", &[], None)
        .await
        .unwrap();
    assert!(!result.is_success());
    assert_eq!(result.status, ProcessExecuteStatus::Aborted);
    assert_eq!(
        result.error_log_file(),
        Some("TM1ProcessError_20261018_load.log")
    );
}

#[tokio::test]
async fn test_unknown_status_is_tolerated() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("POST"))
        .and(path(api("/Processes('load')/tm1.ExecuteWithReturn")))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ProcessExecuteStatusCode": "SomethingNew"})),
        )
        .mount(&server)
        .await;

    let result = client
        .execute_process_with_return("load", &[], None)
        .await
        .unwrap();
    assert_eq!(result.status, ProcessExecuteStatus::Unknown);
    assert_eq!(result.error_log_file(), None);
}

#[tokio::test]
async fn test_compile_process_returns_errors() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("POST"))
        .and(path(api("/Processes('load')/tm1.Compile")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"Procedure": "Prolog", "LineNumber": 5, "Message": "Variable \"x\" undefined"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(api("/Processes('clean')/tm1.Compile")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .mount(&server)
        .await;

    let errors = client.compile_process("load").await.unwrap();
    assert_eq!(errors[0].procedure, "Prolog");
    assert_eq!(errors[0].line_number, 5);
    assert!(client.compile_process("clean").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_error_log_content() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("GET"))
        .and(path(api("/ErrorLogFiles('TM1ProcessError_x.log')/Content")))
        .respond_with(ResponseTemplate::new(200).set_body_string("line 1: oops"))
        .mount(&server)
        .await;

    assert_eq!(
        client
            .get_error_log_content("TM1ProcessError_x.log")
            .await
            .unwrap(),
        "line 1: oops"
    );
}
