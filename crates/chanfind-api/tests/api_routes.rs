//! End-to-end route tests against a memory-backed router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use chanfind_api::{AppState, ChannelService, PropertyService, TagService, UserDirectory};
use chanfind_core::AuthorizationService;
use chanfind_db::MemoryStore;

fn app() -> Router {
    let store = MemoryStore::new();
    let authz = AuthorizationService::new(
        vec!["cf-all".to_string()],
        vec!["cf-all".to_string()],
        vec!["cf-all".to_string()],
        vec!["cf-admins".to_string()],
    );
    let users = UserDirectory::parse("alice:cf-all|ops,bob:teamB").unwrap();
    let channels = Arc::new(store.channels());
    let state = AppState::new(
        ChannelService::new(channels.clone(), authz.clone()),
        PropertyService::new(Arc::new(store.properties()), channels.clone(), authz.clone()),
        TagService::new(Arc::new(store.tags()), channels, authz),
        users,
    );
    chanfind_api::router(state)
}

fn basic(user: &str) -> String {
    format!("Basic {}", BASE64.encode(format!("{user}:pw")))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    auth: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = auth {
        builder = builder.header(header::AUTHORIZATION, basic(user));
    }
    let request = match body {
        Some(value) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn seed_channel(app: &Router, name: &str) {
    let (status, _) = send(
        app,
        Method::PUT,
        &format!("/resources/channels/{name}"),
        Some("alice"),
        Some(json!({"name": name, "owner": "ops"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn health_endpoint_responds() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn property_lifecycle_over_http() {
    let app = app();
    seed_channel(&app, "A").await;
    seed_channel(&app, "B").await;

    // PUT create with one bearing channel.
    let (status, created) = send(
        &app,
        Method::PUT,
        "/resources/properties/voltage",
        Some("alice"),
        Some(json!({
            "name": "voltage",
            "owner": "ops",
            "channels": [
                {"name": "A", "properties": [{"name": "voltage", "owner": "ops", "value": "10"}]}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["name"], "voltage");
    assert_eq!(created["channels"][0]["name"], "A");

    // POST update moves the association to B.
    let (status, _) = send(
        &app,
        Method::POST,
        "/resources/properties/voltage",
        Some("alice"),
        Some(json!({
            "name": "voltage",
            "owner": "ops",
            "channels": [
                {"name": "B", "properties": [{"name": "voltage", "owner": "ops", "value": "20"}]}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, read) = send(
        &app,
        Method::GET,
        "/resources/properties/voltage?withChannels=true",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let bearing: Vec<&str> = read["channels"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["name"].as_str().unwrap())
        .collect();
    assert_eq!(bearing, vec!["B"]);

    // A keeps a tombstone instance on the document itself.
    let (_, a) = send(&app, Method::GET, "/resources/channels/A", None, None).await;
    assert_eq!(a["properties"][0]["value"], "");

    // DELETE removes the definition.
    let (status, _) = send(
        &app,
        Method::DELETE,
        "/resources/properties/voltage",
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(
        &app,
        Method::GET,
        "/resources/properties/voltage",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn read_without_channels_omits_the_list() {
    let app = app();
    seed_channel(&app, "A").await;
    let (_, _) = send(
        &app,
        Method::PUT,
        "/resources/properties/voltage",
        Some("alice"),
        Some(json!({
            "name": "voltage",
            "owner": "ops",
            "channels": [
                {"name": "A", "properties": [{"name": "voltage", "owner": "ops", "value": "10"}]}
            ]
        })),
    )
    .await;

    let (status, read) = send(
        &app,
        Method::GET,
        "/resources/properties/voltage?withChannels=false",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(read.get("channels").is_none());
}

#[tokio::test]
async fn anonymous_mutations_are_unauthorized() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::PUT,
        "/resources/properties/voltage",
        None,
        Some(json!({"name": "voltage", "owner": "ops"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    // Reads stay open.
    let (status, _) = send(&app, Method::GET, "/resources/properties", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unprivileged_user_is_rejected() {
    let app = app();
    let (status, _) = send(
        &app,
        Method::PUT,
        "/resources/tags/archived",
        Some("bob"),
        Some(json!({"name": "archived", "owner": "teamB"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn mismatched_payload_name_is_bad_request() {
    let app = app();
    let (status, _) = send(
        &app,
        Method::PUT,
        "/resources/properties/voltage",
        Some("alice"),
        Some(json!({"name": "current", "owner": "ops"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tag_single_channel_routes() {
    let app = app();
    seed_channel(&app, "A").await;
    let (status, _) = send(
        &app,
        Method::PUT,
        "/resources/tags/archived",
        Some("alice"),
        Some(json!({"name": "archived", "owner": "ops"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, tagged) = send(
        &app,
        Method::PUT,
        "/resources/tags/archived/A",
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tagged["channels"][0]["name"], "A");

    let (status, _) = send(
        &app,
        Method::DELETE,
        "/resources/tags/archived/A",
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, read) = send(
        &app,
        Method::GET,
        "/resources/tags/archived?withChannels=true",
        None,
        None,
    )
    .await;
    assert!(read.get("channels").is_none());
}

#[tokio::test]
async fn batch_property_update_route() {
    let app = app();
    seed_channel(&app, "A").await;
    seed_channel(&app, "B").await;

    let (status, updated) = send(
        &app,
        Method::POST,
        "/resources/properties",
        Some("alice"),
        Some(json!([
            {"name": "voltage", "owner": "ops", "channels": [
                {"name": "A", "properties": [{"name": "voltage", "owner": "ops", "value": "10"}]}
            ]},
            {"name": "current", "owner": "ops", "channels": [
                {"name": "B", "properties": [{"name": "current", "owner": "ops", "value": "3"}]}
            ]}
        ])),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated.as_array().unwrap().len(), 2);

    let (_, a) = send(&app, Method::GET, "/resources/channels/A", None, None).await;
    assert_eq!(a["properties"][0]["value"], "10");
}
