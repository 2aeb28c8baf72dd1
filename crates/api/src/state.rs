use std::sync::Arc;

use minishop_events::{NotificationStore, Publisher, Transport};

use crate::config::HubConfig;

/// Shared application state available to all handlers via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<HubConfig>,
    pub store: Arc<NotificationStore>,
    /// Publishes direct notification requests onto the bus.
    pub publisher: Publisher,
    /// Held for connection state reporting in `/health`.
    pub transport: Arc<dyn Transport>,
}
