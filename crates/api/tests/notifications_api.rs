//! Integration tests for the `/notifications` query surface.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use chrono::Utc;
use common::{body_json, get, post, post_json, put};
use minishop_core::{NewNotification, Severity};
use minishop_events::Transport;
use serde_json::json;

fn seed(t: &common::TestApp, notification_type: &str, message: &str) -> u64 {
    t.store
        .insert(NewNotification::new(
            notification_type,
            "Seeded",
            message,
            Severity::Info,
        ))
        .id
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_returns_newest_first() {
    let t = common::build_test_app();
    seed(&t, "ORDER_CREATED", "first");
    seed(&t, "ORDER_CREATED", "second");

    let response = get(&t.app, "/notifications").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["message"], "second");
    assert_eq!(items[0]["type"], "ORDER_CREATED");
    assert_eq!(items[0]["read"], false);
    assert!(items[0]["createdAt"].is_string());
}

#[tokio::test]
async fn recent_defaults_to_fifty() {
    let t = common::build_test_app();
    for i in 0..60 {
        seed(&t, "LOW_STOCK", &format!("n{i}"));
    }

    let json = body_json(get(&t.app, "/notifications/recent").await).await;
    assert_eq!(json.as_array().unwrap().len(), 50);

    let json = body_json(get(&t.app, "/notifications/recent?limit=3").await).await;
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0]["message"], "n59");
}

#[tokio::test]
async fn malformed_limit_is_a_json_client_error() {
    let t = common::build_test_app();

    for uri in ["/notifications/recent?limit=-1", "/notifications/recent?limit=abc"] {
        let response = get(&t.app, uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let json = body_json(response).await;
        assert_eq!(json["code"], "BAD_REQUEST");
        assert!(json["error"].is_string());
    }
}

#[tokio::test]
async fn by_type_filters_on_exact_tag() {
    let t = common::build_test_app();
    seed(&t, "ORDER_CREATED", "o");
    seed(&t, "LOW_STOCK", "l");

    let json = body_json(get(&t.app, "/notifications/type/LOW_STOCK").await).await;
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["message"], "l");

    let json = body_json(get(&t.app, "/notifications/type/NOPE").await).await;
    assert!(json.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn since_excludes_older_notifications() {
    let t = common::build_test_app();
    let t0 = Utc::now() - chrono::Duration::hours(1);
    t.store.insert(
        NewNotification::new("X", "Old", "old", Severity::Info)
            .with_created_at(t0 - chrono::Duration::hours(1)),
    );
    seed(&t, "X", "new");

    let uri = format!(
        "/notifications/since?timestamp={}",
        t0.format("%Y-%m-%dT%H:%M:%S")
    );
    let json = body_json(get(&t.app, &uri).await).await;
    let items = json.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["message"], "new");
}

#[tokio::test]
async fn since_accepts_minute_precision() {
    let t = common::build_test_app();
    seed(&t, "X", "new");

    let response = get(&t.app, "/notifications/since?timestamp=2000-01-01T00:00").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn since_with_bad_timestamp_is_a_client_error() {
    let t = common::build_test_app();

    let response = get(&t.app, "/notifications/since?timestamp=last-tuesday").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");
}

// ---------------------------------------------------------------------------
// Read flags
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mark_read_reports_success_and_is_idempotent() {
    let t = common::build_test_app();
    let id = seed(&t, "X", "a");
    seed(&t, "X", "b");

    for _ in 0..2 {
        let json = body_json(put(&t.app, &format!("/notifications/{id}/read")).await).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Notification marked as read");
    }

    let json = body_json(get(&t.app, "/notifications/unread").await).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    let json = body_json(get(&t.app, "/notifications/unread-count").await).await;
    assert_eq!(json["count"], 1);
}

#[tokio::test]
async fn mark_read_unknown_or_malformed_id_is_not_found() {
    let t = common::build_test_app();
    seed(&t, "X", "a");

    for uri in ["/notifications/999/read", "/notifications/abc/read"] {
        let response = put(&t.app, uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Notification not found");
    }
    assert_eq!(t.store.unread_count(), 1);
}

#[tokio::test]
async fn read_all_clears_unread() {
    let t = common::build_test_app();
    seed(&t, "X", "a");
    seed(&t, "Y", "b");

    let json = body_json(put(&t.app, "/notifications/read-all").await).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["message"], "All notifications marked as read");

    let json = body_json(get(&t.app, "/notifications/unread").await).await;
    assert!(json.as_array().unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stats_reports_counts_by_type_and_severity() {
    let t = common::build_test_app();
    let id = seed(&t, "ORDER_CREATED", "a");
    seed(&t, "ORDER_CREATED", "b");
    seed(&t, "LOW_STOCK", "c");
    t.store.mark_read(id);

    let json = body_json(get(&t.app, "/notifications/stats").await).await;
    assert_eq!(json["total"], 3);
    assert_eq!(json["unread"], 2);
    assert_eq!(json["byType"]["ORDER_CREATED"], 2);
    assert_eq!(json["byType"]["LOW_STOCK"], 1);
    assert_eq!(json["bySeverity"]["INFO"], 3);
    assert!(json["lastUpdate"].is_string());
}

// ---------------------------------------------------------------------------
// Synthetic injection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_endpoint_uses_defaults() {
    let t = common::build_test_app();

    let response = post(&t.app, "/notifications/test").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["type"], "TEST");
    assert_eq!(json["title"], "Test Notification");
    assert_eq!(json["message"], "This is a test notification");
    assert_eq!(json["severity"], "INFO");
    assert_eq!(t.store.len(), 1);
}

#[tokio::test]
async fn test_endpoint_accepts_overrides() {
    let t = common::build_test_app();

    let json = body_json(
        post(
            &t.app,
            "/notifications/test?type=LOW_STOCK&title=Low&message=Mug&severity=warning",
        )
        .await,
    )
    .await;
    assert_eq!(json["type"], "LOW_STOCK");
    assert_eq!(json["severity"], "WARNING");
    assert_eq!(json["message"], "Mug");
}

#[tokio::test]
async fn test_endpoint_rejects_unknown_severity() {
    let t = common::build_test_app();

    let response = post(&t.app, "/notifications/test?severity=LOUD").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");
    assert!(t.store.is_empty());
}

// ---------------------------------------------------------------------------
// Direct send
// ---------------------------------------------------------------------------

#[tokio::test]
async fn send_publishes_direct_notification() {
    let t = common::build_test_app();
    let mut subscription = t.bus.subscribe("notifications.send").await.unwrap();

    let response = post_json(
        &t.app,
        "/notifications/send",
        json!({ "message": "Shelf 4 restocked", "userId": "ops" }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(body_json(response).await["success"], true);

    let message = subscription
        .next_message(Duration::from_secs(1))
        .await
        .unwrap()
        .expect("direct notification should be published");
    let payload: serde_json::Value = serde_json::from_slice(&message.payload).unwrap();
    assert_eq!(payload["message"], "Shelf 4 restocked");
    assert_eq!(payload["userId"], "ops");
    assert!(payload["timestamp"].is_string());
}

#[tokio::test]
async fn send_without_message_is_rejected() {
    let t = common::build_test_app();

    let response = post_json(&t.app, "/notifications/send", json!({ "userId": "ops" })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn send_while_broker_down_is_unavailable() {
    let t = common::build_test_app();
    t.bus.disconnect();

    let response = post_json(&t.app, "/notifications/send", json!({ "message": "hi" })).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
