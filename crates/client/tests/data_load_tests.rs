//! Bulk data load tests.
//!
//! # Invariants
//! - The CSV is uploaded under a `tm1go_dataload_temp_` name and always deleted
//! - The load process reads `<file>.blb` on v11 servers and `<file>` on v12
//! - A non-successful process result surfaces as `ProcessFailed` with its log

mod common;

use common::*;
use serde_json::Value;
use tm1_client::tabular::Table;
use tm1_client::{CellValue, DataLoadOptions, LoadValueKind};
use wiremock::matchers::{method, path, path_regex};

const V11_ENTRY: &str = r"^/api/v1/Contents\('Blobs'\)/Contents\('tm1go_dataload_temp_\d+\.csv'\)$";
const V11_CONTENT: &str =
    r"^/api/v1/Contents\('Blobs'\)/Contents\('tm1go_dataload_temp_\d+\.csv'\)/Content$";
const V12_ENTRY: &str = r"^/api/v1/Contents\('Files'\)/Contents\('tm1go_dataload_temp_\d+\.csv'\)$";
const V12_CONTENT: &str =
    r"^/api/v1/Contents\('Files'\)/Contents\('tm1go_dataload_temp_\d+\.csv'\)/Content$";

fn line_table() -> Table {
    Table::from_rows(
        vec!["Line".into(), "Measure".into(), "Value".into()],
        vec![
            vec!["e1".into(), "Value".into(), CellValue::Number(21000000.0)],
            vec!["e2".into(), "Value".into(), CellValue::Number(1.5)],
        ],
    )
    .unwrap()
}

async fn mount_file_endpoints(server: &MockServer, root: &str, entry: &str, content: &str) {
    Mock::given(method("POST"))
        .and(path(api(&format!("/Contents('{root}')/Contents"))))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(content))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(server)
        .await;
    Mock::given(method("DELETE"))
        .and(path_regex(entry))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(server)
        .await;
}

async fn executed_process(server: &MockServer) -> Value {
    let requests = received(server, "POST", &api("/ExecuteProcessWithReturn")).await;
    assert_eq!(requests.len(), 1);
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    body["Process"].clone()
}

#[tokio::test]
async fn test_load_table_v11() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;
    mount_file_endpoints(&server, "Blobs", V11_ENTRY, V11_CONTENT).await;

    Mock::given(method("POST"))
        .and(path(api("/ExecuteProcessWithReturn")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(load_fixture("processes/execute_success.json")),
        )
        .mount(&server)
        .await;

    client
        .load_table("2D", &line_table(), &DataLoadOptions::new())
        .await
        .unwrap();

    let uploads = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "PUT")
        .collect::<Vec<_>>();
    assert_eq!(
        String::from_utf8(uploads[0].body.clone()).unwrap(),
        "Line,Measure,Value\ne1,Value,21000000\ne2,Value,1.5\n"
    );

    let process = executed_process(&server).await;
    assert!(
        process["DataProcedure"]
            .as_str()
            .unwrap()
            .contains("CellPutN(v3,'2D',v1,v2);")
    );
    let server_file = process["DataSource"]["dataSourceNameForServer"].as_str().unwrap();
    assert!(server_file.starts_with("tm1go_dataload_temp_"));
    assert!(server_file.ends_with(".csv.blb"));
    assert_eq!(process["DataSource"]["Type"], "ASCII");
    assert_eq!(process["DataSource"]["asciiHeaderRecords"], 1);
    let kinds: Vec<&str> = process["Variables"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["Type"].as_str().unwrap())
        .collect();
    assert_eq!(kinds, vec!["String", "String", "Numeric"]);
}

#[tokio::test]
async fn test_load_table_v12_uses_plain_file_name() {
    let server = MockServer::start().await;
    let client = connected_v12_client(&server).await;
    mount_file_endpoints(&server, "Files", V12_ENTRY, V12_CONTENT).await;

    Mock::given(method("POST"))
        .and(path(api("/ExecuteProcessWithReturn")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(load_fixture("processes/execute_success.json")),
        )
        .mount(&server)
        .await;

    client
        .load_table(
            "Notes",
            &line_table(),
            &DataLoadOptions::new().value_kind(LoadValueKind::String),
        )
        .await
        .unwrap();

    let process = executed_process(&server).await;
    let server_file = process["DataSource"]["dataSourceNameForServer"].as_str().unwrap();
    assert!(server_file.ends_with(".csv"));
    assert!(
        process["DataProcedure"]
            .as_str()
            .unwrap()
            .contains("CellPutS(v3,'Notes',v1,v2);")
    );
}

#[tokio::test]
async fn test_failed_load_reports_log_and_removes_file() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;
    mount_file_endpoints(&server, "Blobs", V11_ENTRY, V11_CONTENT).await;

    Mock::given(method("POST"))
        .and(path(api("/ExecuteProcessWithReturn")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(load_fixture("processes/execute_aborted.json")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api(
            "/ErrorLogFiles('TM1ProcessError_20261018_load.log')/Content",
        )))
        .respond_with(ResponseTemplate::new(200).set_body_string("Cube \"NoSuchCube\" not found"))
        .mount(&server)
        .await;

    let err = client
        .load_table("NoSuchCube", &line_table(), &DataLoadOptions::new())
        .await
        .unwrap_err();
    match err {
        ClientError::ProcessFailed {
            status,
            error_log_file,
            error_log,
        } => {
            assert_eq!(status, "Aborted");
            assert_eq!(
                error_log_file.as_deref(),
                Some("TM1ProcessError_20261018_load.log")
            );
            assert!(error_log.unwrap().contains("NoSuchCube"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_upload_failure_still_attempts_delete() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("POST"))
        .and(path(api("/Contents('Blobs')/Contents")))
        .respond_with(ResponseTemplate::new(201))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(V11_CONTENT))
        .respond_with(ResponseTemplate::new(500).set_body_json(error_body("", "disk full")))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path_regex(V11_ENTRY))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(api("/ExecuteProcessWithReturn")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client
        .load_table("2D", &line_table(), &DataLoadOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn test_single_column_table_is_rejected() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;
    let table = Table::from_rows(vec!["Value".into()], vec![vec![CellValue::Number(1.0)]]).unwrap();
    let err = client
        .load_table("2D", &table, &DataLoadOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument(_)));
}
