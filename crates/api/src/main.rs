use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use minishop_api::background;
use minishop_api::config::HubConfig;
use minishop_api::router::build_app_router;
use minishop_api::state::AppState;
use minishop_events::{
    transport, ChannelFanout, EnvSource, EventDispatcher, NotificationStore, Publisher,
    SubscriptionManager,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "minishop_api=debug,minishop_events=debug,tower_http=debug".into()
    });
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // --- Configuration ---
    let config = Arc::new(HubConfig::load(&EnvSource::process()).context("invalid configuration")?);
    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        broker = %config.transport.url,
        capacity = config.store.capacity,
        "Loaded configuration"
    );

    // --- Message bus ---
    let cancel = CancellationToken::new();
    let transport = transport::connect(&config.transport, &cancel)
        .await
        .context("failed to connect to message broker")?;

    // --- Event pipeline ---
    let store = Arc::new(NotificationStore::new(config.store.capacity));
    let fanout = ChannelFanout::from_config(&config.channels)
        .context("failed to initialise delivery channels")?;
    tracing::info!(channels = ?fanout.enabled_channels(), "Delivery channels ready");

    let dispatcher = Arc::new(EventDispatcher::new(Arc::clone(&store), fanout));
    let subscriptions = SubscriptionManager::new(Arc::clone(&transport), cancel.child_token());
    subscriptions.start_all(&config.subjects, dispatcher);

    // --- Retention job ---
    let retention_cancel = cancel.child_token();
    let retention_handle = tokio::spawn(background::retention::run(
        Arc::clone(&store),
        config.store.retention,
        config.store.cleanup_interval,
        retention_cancel.clone(),
    ));

    // --- HTTP server ---
    let state = AppState {
        config: Arc::clone(&config),
        store,
        publisher: Publisher::new(Arc::clone(&transport), config.transport.request_timeout),
        transport: Arc::clone(&transport),
    };
    let app = build_app_router(state, &config.server);

    let addr: SocketAddr = config
        .server
        .bind_address()
        .parse()
        .context("invalid HOST/PORT")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Notification hub listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // --- Post-shutdown cleanup ---
    let drain = Duration::from_secs(config.server.shutdown_timeout_secs);

    subscriptions.shutdown(drain).await;

    retention_cancel.cancel();
    if tokio::time::timeout(drain, retention_handle).await.is_err() {
        tracing::warn!("Retention job did not stop in time");
    }

    cancel.cancel();
    if let Err(e) = transport.close().await {
        tracing::warn!(error = %e, "Error closing message bus connection");
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
