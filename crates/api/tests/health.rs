//! Health endpoint and general HTTP behaviour.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, get};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Test: GET /health reports broker state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_is_ok_while_broker_connected() {
    let t = common::build_test_app();
    let response = get(&t.app, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["broker"], "connected");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn health_is_degraded_while_broker_disconnected() {
    let t = common::build_test_app();
    t.bus.disconnect();

    let json = body_json(get(&t.app, "/health").await).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["broker"], "disconnected");
}

// ---------------------------------------------------------------------------
// Test: Unknown route returns 404
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_route_returns_404() {
    let t = common::build_test_app();
    let response = get(&t.app, "/this-route-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Test: x-request-id header is present in response
// ---------------------------------------------------------------------------

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let t = common::build_test_app();
    let response = get(&t.app, "/health").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");
    assert_eq!(request_id.to_str().unwrap().len(), 36);
}

#[tokio::test]
async fn incoming_request_id_is_propagated() {
    let t = common::build_test_app();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "trace-me")
        .body(Body::empty())
        .unwrap();

    let response = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-me");
}

// ---------------------------------------------------------------------------
// Test: CORS preflight allows any origin by default
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cors_preflight_allows_any_origin() {
    let t = common::build_test_app();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/notifications")
        .header("Origin", "http://dashboard.test")
        .header("Access-Control-Request-Method", "PUT")
        .body(Body::empty())
        .unwrap();

    let response = t.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    let methods = response.headers()["access-control-allow-methods"]
        .to_str()
        .unwrap();
    assert!(methods.contains("PUT"));
}
