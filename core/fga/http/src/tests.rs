use httpmock::Method::GET;
use httpmock::Method::POST;
use httpmock::MockServer;
use serde_json::json;

use authsync_context::Context;
use authsync_fga::errors::InvalidModel;
use authsync_fga::errors::InvalidTuple;
use authsync_fga::errors::ModelMismatch;
use authsync_fga::errors::ModelUnavailable;
use authsync_fga::errors::StoreNotSelected;
use authsync_fga::errors::StoreUnavailable;
use authsync_fga::errors::Unauthorized;
use authsync_fga::AuthorizationModel;
use authsync_fga::FgaClient;
use authsync_fga::Tuple;
use authsync_fga::TupleFilter;

use super::HttpFga;
use super::StoreConf;

const TOKEN: &str = "test-token";

fn client(server: &MockServer, store_id: Option<&str>, model_id: Option<&str>) -> FgaClient {
    let conf = StoreConf {
        api_host: format!("{}:{}", server.host(), server.port()),
        api_scheme: "http".into(),
        api_token: Some(TOKEN.into()),
        model_id: model_id.map(String::from),
        store_id: store_id.map(String::from),
        timeout_sec: 5,
    };
    let backend = HttpFga::new(&conf).unwrap();
    FgaClient::from(backend)
}

fn model() -> AuthorizationModel {
    AuthorizationModel {
        id: None,
        schema_version: "1.1".into(),
        type_definitions: vec![
            json!({"type": "privileged"}),
            json!({"type": "client", "relations": {"owner": {"this": {}}}}),
        ],
        conditions: None,
    }
}

#[tokio::test]
async fn create_store_selects_it() {
    let context = Context::fixture();
    let server = MockServer::start_async().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/stores")
                .header("authorization", format!("Bearer {}", TOKEN))
                .json_body(json!({"name": "authsync"}));
            then.status(201)
                .header("content-type", "application/json")
                .json_body(json!({"id": "01HSTORE", "name": "authsync"}));
        })
        .await;
    let write = server
        .mock_async(|when, then| {
            when.method(POST).path("/stores/01HSTORE/write");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({}));
        })
        .await;

    let client = client(&server, None, None);
    let id = client.create_store(&context, "authsync").await.unwrap();
    assert_eq!(id, "01HSTORE");
    let tuple = Tuple::new("privileged:superuser", "owner", "client:c1");
    client.write_tuples(&context, vec![tuple]).await.unwrap();
    create.assert_async().await;
    write.assert_async().await;
}

#[tokio::test]
async fn write_tuples_request() {
    let context = Context::fixture();
    let server = MockServer::start_async().await;
    let write = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/stores/01HSTORE/write")
                .header("authorization", format!("Bearer {}", TOKEN))
                .json_body(json!({
                    "authorization_model_id": "01HMODEL",
                    "writes": {"tuple_keys": [{
                        "object": "client:client-123",
                        "relation": "owner",
                        "user": "privileged:superuser",
                    }]},
                }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({}));
        })
        .await;

    let client = client(&server, Some("01HSTORE"), Some("01HMODEL"));
    let tuple = Tuple::new("privileged:superuser", "owner", "client:client-123");
    client.write_tuples(&context, vec![tuple]).await.unwrap();
    write.assert_async().await;
}

#[tokio::test]
async fn delete_tuples_request() {
    let context = Context::fixture();
    let server = MockServer::start_async().await;
    let delete = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/stores/01HSTORE/write")
                .json_body(json!({
                    "deletes": {"tuple_keys": [{
                        "object": "rule:r1",
                        "relation": "owner",
                        "user": "privileged:superuser",
                    }]},
                }));
            then.status(200);
        })
        .await;

    let client = client(&server, Some("01HSTORE"), None);
    let tuple = Tuple::new("privileged:superuser", "owner", "rule:r1");
    client.delete_tuples(&context, vec![tuple]).await.unwrap();
    delete.assert_async().await;
}

#[tokio::test]
async fn write_without_store_fails() {
    let context = Context::fixture();
    let server = MockServer::start_async().await;
    let client = client(&server, None, None);
    let tuple = Tuple::new("privileged:superuser", "owner", "rule:r1");
    let error = client.write_tuples(&context, vec![tuple]).await.unwrap_err();
    assert!(error.is::<StoreNotSelected>());
}

#[tokio::test]
async fn status_codes_are_classified() {
    let context = Context::fixture();
    let cases = [
        (400, "invalid"),
        (401, "unauthorized"),
        (403, "unauthorized"),
        (500, "unavailable"),
        (503, "unavailable"),
    ];
    for (status, kind) in cases {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/stores/01HSTORE/write");
                then.status(status)
                    .header("content-type", "application/json")
                    .json_body(json!({"code": "error", "message": "test"}));
            })
            .await;
        let client = client(&server, Some("01HSTORE"), None);
        let tuple = Tuple::new("privileged:superuser", "owner", "schema:s1");
        let error = client.write_tuples(&context, vec![tuple]).await.unwrap_err();
        let matched = match kind {
            "invalid" => error.is::<InvalidTuple>(),
            "unauthorized" => error.is::<Unauthorized>(),
            _ => error.is::<StoreUnavailable>(),
        };
        assert!(matched, "status {} returned {:?}", status, error);
    }
}

#[tokio::test]
async fn connection_failure_is_unavailable() {
    let context = Context::fixture();
    let conf = StoreConf {
        api_host: "127.0.0.1:1".into(),
        store_id: Some("01HSTORE".into()),
        timeout_sec: 2,
        ..Default::default()
    };
    let client = FgaClient::from(HttpFga::new(&conf).unwrap());
    let tuple = Tuple::new("privileged:superuser", "owner", "schema:s1");
    let error = client.write_tuples(&context, vec![tuple]).await.unwrap_err();
    assert!(error.is::<StoreUnavailable>());
}

#[tokio::test]
async fn read_tuples_pages() {
    let context = Context::fixture();
    let server = MockServer::start_async().await;
    let first = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/stores/01HSTORE/read")
                .json_body(json!({
                    "tuple_key": {"object": "client:c1"},
                    "page_size": 100,
                }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "tuples": [{
                        "key": {"object": "client:c1", "relation": "owner", "user": "privileged:superuser"},
                        "timestamp": "2024-01-01T00:00:00Z",
                    }],
                    "continuation_token": "next",
                }));
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/stores/01HSTORE/read")
                .json_body(json!({
                    "tuple_key": {"object": "client:c1"},
                    "page_size": 100,
                    "continuation_token": "next",
                }));
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "tuples": [{
                        "key": {"object": "client:c1", "relation": "viewer", "user": "user:alice"},
                        "timestamp": "2024-01-01T00:00:00Z",
                    }],
                    "continuation_token": "",
                }));
        })
        .await;

    let client = client(&server, Some("01HSTORE"), None);
    let filter = TupleFilter::object("client:c1");
    let tuples = client.read_all_tuples(&context, &filter).await.unwrap();
    assert_eq!(
        tuples,
        vec![
            Tuple::new("privileged:superuser", "owner", "client:c1"),
            Tuple::new("user:alice", "viewer", "client:c1"),
        ]
    );
    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn write_model_request() {
    let context = Context::fixture();
    let server = MockServer::start_async().await;
    let write = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/stores/01HSTORE/authorization-models")
                .json_body(json!({
                    "schema_version": "1.1",
                    "type_definitions": [
                        {"type": "privileged"},
                        {"type": "client", "relations": {"owner": {"this": {}}}},
                    ],
                }));
            then.status(201)
                .header("content-type", "application/json")
                .json_body(json!({"authorization_model_id": "01HMODEL"}));
        })
        .await;

    let client = client(&server, Some("01HSTORE"), None);
    let id = client.write_model(&context, &model()).await.unwrap();
    assert_eq!(id, "01HMODEL");
    write.assert_async().await;
}

#[tokio::test]
async fn write_model_rejected() {
    let context = Context::fixture();
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/stores/01HSTORE/authorization-models");
            then.status(400)
                .header("content-type", "application/json")
                .json_body(json!({"code": "invalid_authorization_model"}));
        })
        .await;

    let client = client(&server, Some("01HSTORE"), None);
    let error = client.write_model(&context, &model()).await.unwrap_err();
    assert!(error.is::<InvalidModel>());
}

#[tokio::test]
async fn validate_configured_model() {
    let context = Context::fixture();
    let server = MockServer::start_async().await;
    let read = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/stores/01HSTORE/authorization-models/01HMODEL");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"authorization_model": {
                    "id": "01HMODEL",
                    "schema_version": "1.1",
                    "type_definitions": [
                        {"type": "client", "relations": {"owner": {"this": {}}}, "metadata": null},
                        {"type": "privileged", "relations": {}},
                    ],
                    "conditions": {},
                }}));
        })
        .await;

    let client = client(&server, Some("01HSTORE"), Some("01HMODEL"));
    client.validate_model(&context, &model()).await.unwrap();
    read.assert_async().await;
}

#[tokio::test]
async fn validate_latest_model_mismatch() {
    let context = Context::fixture();
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/stores/01HSTORE/authorization-models")
                .query_param("page_size", "1");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"authorization_models": [{
                    "id": "01HOTHER",
                    "schema_version": "1.1",
                    "type_definitions": [{"type": "privileged"}],
                }]}));
        })
        .await;

    let client = client(&server, Some("01HSTORE"), None);
    let error = client.validate_model(&context, &model()).await.unwrap_err();
    assert!(error.is::<ModelMismatch>());
}

#[tokio::test]
async fn missing_model_is_unavailable() {
    let context = Context::fixture();
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/stores/01HSTORE/authorization-models/01HMODEL");
            then.status(404)
                .header("content-type", "application/json")
                .json_body(json!({"code": "authorization_model_not_found"}));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/stores/01HEMPTY/authorization-models");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({"authorization_models": []}));
        })
        .await;

    let configured = client(&server, Some("01HSTORE"), Some("01HMODEL"));
    let error = configured.read_model(&context).await.unwrap_err();
    assert!(error.is::<ModelUnavailable>());

    let latest = client(&server, Some("01HEMPTY"), None);
    let error = latest.read_model(&context).await.unwrap_err();
    assert!(error.is::<ModelUnavailable>());
}
