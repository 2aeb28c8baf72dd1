//! Periodic cleanup of expired notifications.
//!
//! Removes notifications older than the retention window on a fixed
//! interval using `tokio::time::interval`.

use std::sync::Arc;
use std::time::Duration;

use minishop_events::NotificationStore;
use tokio_util::sync::CancellationToken;

/// Run the retention loop until `cancel` fires. The first sweep happens
/// immediately.
pub async fn run(
    store: Arc<NotificationStore>,
    retention: chrono::Duration,
    every: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_days = retention.num_days(),
        interval_secs = every.as_secs(),
        "Notification retention job started"
    );

    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Notification retention job stopping");
                break;
            }
            _ = interval.tick() => {
                let removed = store.cleanup(retention);
                if removed > 0 {
                    tracing::info!(removed, remaining = store.len(), "Retention: purged old notifications");
                } else {
                    tracing::debug!("Retention: nothing to purge");
                }
            }
        }
    }
}
