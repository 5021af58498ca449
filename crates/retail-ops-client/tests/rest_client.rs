//! HTTP-level tests for `RestClient` against a mock backend.

use retail_ops_client::{BackendConfig, ClientError, RecordSource, RestClient, TableQuery};
use retail_ops_core::RecordId;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client(server: &MockServer) -> RestClient {
    RestClient::new(BackendConfig::new(server.uri(), "anon-key")).unwrap()
}

#[tokio::test]
async fn select_sends_query_and_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/tasks"))
        .and(query_param("select", "*"))
        .and(query_param("store_id", "eq.1"))
        .and(query_param("order", "created_at.desc"))
        .and(query_param("limit", "50"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "store_id": 1, "created_at": "2024-05-01", "status": "pending"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let query = TableQuery::new("tasks").eq("store_id", 1).order_desc("created_at").limit(50);
    let rows = client(&server).await.select(&query).await.unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["status"], "pending");
}

#[tokio::test]
async fn access_token_used_as_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("apikey", "anon-key"))
        .and(header("authorization", "Bearer user-jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let config = BackendConfig::new(server.uri(), "anon-key").with_access_token("user-jwt");
    let rows = RestClient::new(config)
        .unwrap()
        .select(&TableQuery::new("tasks"))
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn backend_error_message_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "42703",
            "message": "column tasks.nope does not exist",
            "details": null,
            "hint": null
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .await
        .select(&TableQuery::new("tasks").eq("nope", 1))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ClientError::Api {
            status: 400,
            message: "column tasks.nope does not exist".to_string(),
        }
    );
    assert!(!err.is_retriable());
}

#[tokio::test]
async fn non_json_error_body_falls_back_to_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .mount(&server)
        .await;

    let err = client(&server).await.select(&TableQuery::new("tasks")).await.unwrap_err();

    match err {
        ClientError::Api { status, ref message } => {
            assert_eq!(status, 503);
            assert!(message.contains("503"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_retriable());
}

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client(&server).await.select(&TableQuery::new("tasks")).await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
}

#[tokio::test]
async fn unreachable_backend_is_transport_error() {
    let client = RestClient::new(BackendConfig::new("http://127.0.0.1:9", "anon-key")).unwrap();
    let err = client.select(&TableQuery::new("tasks")).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}

#[tokio::test]
async fn update_patches_row_by_id() {
    let server = MockServer::start().await;
    let patch = json!({"status": "completed", "completed_at": "2024-05-01T10:00:00Z"});
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/tasks"))
        .and(query_param("id", "eq.7"))
        .and(header("prefer", "return=representation"))
        .and(body_json(&patch))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 7, "status": "completed"}])))
        .expect(1)
        .mount(&server)
        .await;

    let id: RecordId = "7".parse().unwrap();
    client(&server).await.update("tasks", &id, patch).await.unwrap();
}

#[tokio::test]
async fn update_matching_nothing_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let id: RecordId = "404".parse().unwrap();
    let err = client(&server)
        .await
        .update("tasks", &id, json!({"status": "pending"}))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ClientError::NotFound {
            table: "tasks".to_string(),
            id: "404".to_string(),
        }
    );
}

#[tokio::test]
async fn list_stores_reads_stores_table() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/stores"))
        .and(query_param("order", "id.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "name": "Downtown"},
            {"id": 2, "store_name": "Airport"},
            {"id": 3}
        ])))
        .mount(&server)
        .await;

    let stores = client(&server).await.list_stores().await.unwrap();

    let labels: Vec<_> = stores.iter().map(|s| s.label().to_string()).collect();
    assert_eq!(labels, vec!["Downtown", "Airport", "3"]);
}
