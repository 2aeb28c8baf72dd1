use axum::extract::State;
use axum::{routing::get, Json, Router};
use minishop_events::ConnectionState;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while the broker is not connected.
    pub status: &'static str,
    pub version: &'static str,
    pub broker: ConnectionState,
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let broker = state.transport.monitor().state();
    let status = if broker.is_connected() { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        broker,
    })
}

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
