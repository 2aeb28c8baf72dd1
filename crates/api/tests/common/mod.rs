#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use minishop_api::config::{HubConfig, ServerConfig};
use minishop_api::router::build_app_router;
use minishop_api::state::AppState;
use minishop_core::SubjectMap;
use minishop_events::{
    ChannelConfig, MemoryTransport, NotificationStore, Publisher, StoreConfig, TransportConfig,
};

/// Router plus handles on the pieces behind it, so tests can seed the store
/// and observe the bus directly.
pub struct TestApp {
    pub app: Router,
    pub store: Arc<NotificationStore>,
    pub bus: Arc<MemoryTransport>,
}

pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["*".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 1,
    }
}

/// Build the full application router over the in-process bus, with the
/// same middleware stack `main.rs` uses.
pub fn build_test_app() -> TestApp {
    let config = HubConfig {
        server: test_config(),
        transport: TransportConfig::in_memory(),
        subjects: SubjectMap::default(),
        store: StoreConfig::default(),
        channels: ChannelConfig::default(),
    };

    let bus = Arc::new(MemoryTransport::new());
    let store = Arc::new(NotificationStore::new(config.store.capacity));
    let state = AppState {
        publisher: Publisher::new(bus.clone(), Duration::from_millis(200)),
        transport: bus.clone(),
        store: Arc::clone(&store),
        config: Arc::new(config),
    };
    let app = build_app_router(state, &test_config());

    TestApp { app, store, bus }
}

pub async fn send(app: &Router, method: Method, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri).await
}

pub async fn put(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::PUT, uri).await
}

pub async fn post(app: &Router, uri: &str) -> Response<Body> {
    send(app, Method::POST, uri).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
