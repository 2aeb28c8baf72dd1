//! Handlers for the `/notifications` resource.
//!
//! Every read is served from a snapshot of the in-memory store.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, NaiveDateTime, Utc};
use minishop_core::types::{NotificationId, Timestamp};
use minishop_core::{EventKind, NewNotification, Notification, Severity};
use minishop_events::messages::NotificationMessage;
use minishop_events::NotificationStats;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::extract::ApiQuery;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Query / response types
// ---------------------------------------------------------------------------

/// Default number of notifications returned by `GET /recent`.
const DEFAULT_RECENT_LIMIT: usize = 50;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct SinceQuery {
    /// RFC 3339, or an ISO-8601 local date-time read as UTC.
    pub timestamp: String,
}

/// Query parameters for `POST /test`. Missing values fall back to a
/// generic test notification.
#[derive(Debug, Deserialize)]
pub struct TestNotificationQuery {
    #[serde(rename = "type")]
    pub notification_type: Option<String>,
    pub title: Option<String>,
    pub message: Option<String>,
    pub severity: Option<String>,
}

/// `{success, message}` result of a mutation.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// GET /notifications
pub async fn list_notifications(State(state): State<AppState>) -> Json<Vec<Notification>> {
    Json(state.store.all())
}

/// GET /notifications/recent?limit=N
pub async fn recent_notifications(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<RecentQuery>,
) -> Json<Vec<Notification>> {
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    Json(state.store.top(limit))
}

/// GET /notifications/unread
pub async fn unread_notifications(State(state): State<AppState>) -> Json<Vec<Notification>> {
    Json(state.store.unread())
}

/// GET /notifications/type/{type}
pub async fn notifications_by_type(
    State(state): State<AppState>,
    Path(notification_type): Path<String>,
) -> Json<Vec<Notification>> {
    Json(state.store.by_type(&notification_type))
}

/// GET /notifications/since?timestamp=...
///
/// Notifications created strictly after `timestamp`. An unparsable
/// timestamp is a 400.
pub async fn notifications_since(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<SinceQuery>,
) -> AppResult<Json<Vec<Notification>>> {
    let t0 = parse_timestamp(&params.timestamp)?;
    Ok(Json(state.store.since(t0)))
}

/// GET /notifications/stats
pub async fn notification_stats(State(state): State<AppState>) -> Json<NotificationStats> {
    Json(state.store.stats())
}

/// GET /notifications/unread-count
pub async fn unread_count(State(state): State<AppState>) -> Json<UnreadCountResponse> {
    Json(UnreadCountResponse {
        count: state.store.unread_count(),
    })
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// PUT /notifications/{id}/read
///
/// Unknown and non-numeric ids both report `success: false`.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<ActionResponse> {
    let found = id
        .parse::<NotificationId>()
        .is_ok_and(|id| state.store.mark_read(id));

    Json(if found {
        ActionResponse {
            success: true,
            message: "Notification marked as read",
        }
    } else {
        ActionResponse {
            success: false,
            message: "Notification not found",
        }
    })
}

/// PUT /notifications/read-all
pub async fn mark_all_read(State(state): State<AppState>) -> Json<ActionResponse> {
    state.store.mark_all_read();
    Json(ActionResponse {
        success: true,
        message: "All notifications marked as read",
    })
}

/// POST /notifications/test
///
/// Insert a synthetic notification directly into the store, bypassing the
/// bus and the delivery channels.
pub async fn create_test_notification(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TestNotificationQuery>,
) -> AppResult<(StatusCode, Json<Notification>)> {
    let severity: Severity = params.severity.as_deref().unwrap_or("INFO").parse()?;

    let notification = state.store.insert(NewNotification::new(
        params.notification_type.unwrap_or_else(|| "TEST".into()),
        params.title.unwrap_or_else(|| "Test Notification".into()),
        params
            .message
            .unwrap_or_else(|| "This is a test notification".into()),
        severity,
    ));

    tracing::info!(id = notification.id, "Test notification created");
    Ok((StatusCode::OK, Json(notification)))
}

/// POST /notifications/send
///
/// Publish a direct notification request onto the bus. The notification
/// shows up in the store once the subscription worker has handled it.
pub async fn send_notification(
    State(state): State<AppState>,
    Json(mut request): Json<NotificationMessage>,
) -> AppResult<(StatusCode, Json<ActionResponse>)> {
    if request.message.as_deref().map_or(true, |m| m.trim().is_empty()) {
        return Err(AppError::BadRequest("message must not be empty".into()));
    }
    if request.timestamp.is_none() {
        request.timestamp = Some(serde_json::Value::String(Utc::now().to_rfc3339()));
    }

    let subject = state
        .config
        .subjects
        .subject_for(&EventKind::NotificationRequested)
        .ok_or_else(|| AppError::InternalError("no subject for direct notifications".into()))?;

    state.publisher.publish(subject, &request).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ActionResponse {
            success: true,
            message: "Notification queued",
        }),
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_timestamp(raw: &str) -> AppResult<Timestamp> {
    let raw = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
        return Ok(t.with_timezone(&Utc));
    }
    // Seconds are optional in ISO-8601 local date-times.
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| AppError::BadRequest(format!("Invalid timestamp '{raw}'")))
}
