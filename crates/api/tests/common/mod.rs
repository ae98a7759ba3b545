#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use fleet_api::config::ServerConfig;
use fleet_api::router::build_app_router;
use fleet_api::state::AppState;
use fleet_core::store::MemoryStore;

pub const MANAGER: i64 = 42;
pub const INSPECTOR: i64 = 3;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        db_max_connections: 1,
    }
}

/// Build the full application router over a fresh in-memory store.
///
/// The store handle is returned so tests can inspect state or simulate an
/// outage.
pub fn build_test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store.clone(), test_config());
    (build_app_router(state), store)
}

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

/// POST as `actor`, with an optional JSON body.
pub async fn post_as(app: &Router, uri: &str, actor: i64, body: Option<Value>) -> Response<Body> {
    let builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("x-actor-id", actor.to_string());
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();
    send(app, request).await
}

pub async fn delete(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// A weekly inspection submission for asset `P001`.
pub fn inspection_body(items: Value) -> Value {
    serde_json::json!({
        "asset_id": "P001",
        "inspector_id": INSPECTOR,
        "items": items,
    })
}

/// One checklist cell of item 7 ("Oil level").
pub fn oil_cell(day: i16, status: &str, comment: Option<&str>) -> Value {
    serde_json::json!({
        "item_number": 7,
        "item_description": "Oil level",
        "day_of_week": day,
        "status": status,
        "comment": comment,
    })
}
