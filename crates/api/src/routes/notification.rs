//! Route definitions for the `/notifications` resource.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::notification;
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET    /                 -> list_notifications
/// GET    /recent           -> recent_notifications
/// GET    /unread           -> unread_notifications
/// GET    /unread-count     -> unread_count
/// GET    /type/{type}      -> notifications_by_type
/// GET    /since            -> notifications_since
/// GET    /stats            -> notification_stats
/// PUT    /{id}/read        -> mark_read
/// PUT    /read-all         -> mark_all_read
/// POST   /test             -> create_test_notification
/// POST   /send             -> send_notification
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(notification::list_notifications))
        .route("/recent", get(notification::recent_notifications))
        .route("/unread", get(notification::unread_notifications))
        .route("/unread-count", get(notification::unread_count))
        .route("/type/{type}", get(notification::notifications_by_type))
        .route("/since", get(notification::notifications_since))
        .route("/stats", get(notification::notification_stats))
        .route("/{id}/read", put(notification::mark_read))
        .route("/read-all", put(notification::mark_all_read))
        .route("/test", post(notification::create_test_notification))
        .route("/send", post(notification::send_notification))
}
