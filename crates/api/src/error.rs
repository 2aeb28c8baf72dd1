use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use minishop_core::CoreError;
use minishop_events::{PublishError, TransportError};
use serde_json::json;

/// Error type for HTTP handlers, rendered as `{ "error", "code" }` JSON.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Publishing onto the bus failed.
    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(CoreError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }

            AppError::Publish(PublishError::Transport(
                err @ (TransportError::NotConnected | TransportError::Closed),
            )) => {
                tracing::warn!(error = %err, "Publish rejected, broker unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "BROKER_UNAVAILABLE",
                    "Message broker is not connected".to_string(),
                )
            }
            AppError::Publish(err) => {
                tracing::error!(error = %err, "Publish failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PUBLISH_FAILED",
                    "Failed to publish notification".to_string(),
                )
            }

            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}
