//! Dimension, hierarchy and element façade tests.

mod common;

use common::*;
use serde_json::json;
use tm1_client::Dimension;
use tm1_client::models::{AttributeType, Edge, ElementType};
use wiremock::matchers::{body_json, method, path, query_param};

#[tokio::test]
async fn test_get_dimension_links_hierarchies() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("GET"))
        .and(path(api("/Dimensions('Line')")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(load_fixture("dimensions/dimension_line.json")),
        )
        .mount(&server)
        .await;

    let dimension = client.get_dimension("Line").await.unwrap();
    let hierarchy = dimension.default_hierarchy().unwrap();
    assert_eq!(hierarchy.dimension_name.as_deref(), Some("Line"));
    assert_eq!(hierarchy.elements.len(), 2);
    assert!(!hierarchy.elements[1].is_leaf());
    assert_eq!(hierarchy.edges[0].component_name, "e1");
    assert_eq!(hierarchy.default_member.as_deref(), Some("Total"));
    assert_eq!(hierarchy.subsets, vec!["All"]);
}

#[tokio::test]
async fn test_dimension_names_skip_control() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("GET"))
        .and(path(api("/Dimensions")))
        .and(query_param("$select", "Name"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"Name": "Line"}, {"Name": "}Clients"}, {"Name": "Measure"}]
        })))
        .mount(&server)
        .await;

    assert_eq!(
        client.get_all_dimension_names(true).await.unwrap(),
        vec!["Line", "Measure"]
    );
    assert_eq!(client.get_all_dimension_names(false).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_create_dimension_then_attributes() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    let mut dimension = Dimension::new("Region");
    let hierarchy = dimension.default_hierarchy_mut().unwrap();
    hierarchy.add_element("World", ElementType::Consolidated);
    hierarchy.add_element("US", ElementType::Numeric);
    hierarchy.add_edge("World", "US", 1.0);
    hierarchy.add_element_attribute("Currency", AttributeType::String);

    Mock::given(method("POST"))
        .and(path(api("/Dimensions")))
        .and(body_json(json!({
            "Name": "Region",
            "Hierarchies": [{
                "Name": "Region",
                "Elements": [
                    {"Name": "World", "Type": "Consolidated"},
                    {"Name": "US", "Type": "Numeric"}
                ],
                "Edges": [{"ParentName": "World", "ComponentName": "US", "Weight": 1.0}]
            }]
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(api(
            "/Dimensions('Region')/Hierarchies('Region')/ElementAttributes",
        )))
        .and(body_json(json!({"Name": "Currency", "Type": "String"})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    client.create_dimension(&dimension).await.unwrap();
}

#[tokio::test]
async fn test_update_dimension_creates_new_hierarchies() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    let mut dimension = Dimension::new("Region");
    dimension
        .hierarchies
        .push(tm1_client::Hierarchy::new("ByCurrency", "Region"));

    Mock::given(method("GET"))
        .and(path(api("/Dimensions('Region')/Hierarchies")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"Name": "Region"}, {"Name": "Leaves"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(api("/Dimensions('Region')/Hierarchies('Region')")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api(
            "/Dimensions('Region')/Hierarchies('Region')/ElementAttributes",
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(api("/Dimensions('Region')/Hierarchies")))
        .and(body_json(json!({"Name": "ByCurrency", "Elements": [], "Edges": []})))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    client.update_dimension(&dimension).await.unwrap();
}

#[tokio::test]
async fn test_element_queries() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;
    let elements = api("/Dimensions('Line')/Hierarchies('Line')/Elements");

    Mock::given(method("GET"))
        .and(path(elements.as_str()))
        .and(query_param("$filter", "Type ne 3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [{"Name": "e1"}]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(elements.as_str()))
        .and(query_param("$filter", "Level eq 1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [{"Name": "Total"}]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api("/Dimensions('Line')/Hierarchies('Line')/Elements('e9')")))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    assert_eq!(
        client.get_leaf_element_names("Line", "Line").await.unwrap(),
        vec!["e1"]
    );
    assert_eq!(
        client
            .get_elements_filtered_by_level("Line", "Line", 1)
            .await
            .unwrap(),
        vec!["Total"]
    );
    assert!(!client.element_exists("Line", "Line", "e9").await.unwrap());
}

#[tokio::test]
async fn test_edges_added_in_one_request() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("POST"))
        .and(path(api("/Dimensions('Line')/Hierarchies('Line')/Edges")))
        .and(body_json(json!([
            {"ParentName": "Total", "ComponentName": "e1", "Weight": 1.0},
            {"ParentName": "Total", "ComponentName": "e2", "Weight": -1.0}
        ])))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(api(
            "/Dimensions('Line')/Hierarchies('Line')/Edges(ParentName='Total',ComponentName='e1')",
        )))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let edges = vec![
        Edge::new("Total", "e1", 1.0),
        Edge::new("Total", "e2", -1.0),
    ];
    client.add_edges("Line", "Line", &edges).await.unwrap();
    client.add_edges("Line", "Line", &[]).await.unwrap();
    client.remove_edge("Line", "Line", "Total", "e1").await.unwrap();
}

#[tokio::test]
async fn test_delete_dimension_absent_ok() {
    let server = MockServer::start().await;
    let client = connected_client(&server).await;

    Mock::given(method("DELETE"))
        .and(path(api("/Dimensions('Old')")))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    client.delete_dimension("Old").await.unwrap();
}
