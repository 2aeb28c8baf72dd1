//! NATS transport built on `async-nats`.
//!
//! The client reconnects on its own using the configured
//! [`ReconnectPolicy`](super::ReconnectPolicy); connection lifecycle events
//! are forwarded to the [`ConnectionMonitor`].

use std::sync::Arc;
use std::time::Duration;

use async_nats::client::RequestErrorKind;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;

use super::{
    ConnectionEvent, ConnectionMonitor, ConnectionState, InboundMessage, Subscription, Transport,
    TransportError,
};
use crate::config::TransportConfig;

pub struct NatsTransport {
    client: async_nats::Client,
    monitor: Arc<ConnectionMonitor>,
}

impl NatsTransport {
    /// Connect and fail if the server cannot be reached right now.
    pub async fn connect(config: &TransportConfig) -> Result<Self, TransportError> {
        Self::open(config, false).await
    }

    /// Return immediately; the client keeps trying to reach the server in
    /// the background and the monitor reports `Pending` until it does.
    pub async fn connect_lazy(config: &TransportConfig) -> Result<Self, TransportError> {
        Self::open(config, true).await
    }

    async fn open(config: &TransportConfig, lazy: bool) -> Result<Self, TransportError> {
        let monitor = Arc::new(ConnectionMonitor::new(ConnectionState::Pending));
        let wait = config.reconnect.wait;
        let events_monitor = Arc::clone(&monitor);

        let mut options = async_nats::ConnectOptions::new()
            .name(&config.client_name)
            .connection_timeout(config.connect_timeout)
            .ping_interval(config.ping_interval)
            .request_timeout(Some(config.request_timeout))
            .max_reconnects(Some(config.reconnect.max_attempts))
            .reconnect_delay_callback(move |_| wait)
            .event_callback(move |event| {
                let monitor = Arc::clone(&events_monitor);
                async move { on_client_event(&monitor, event) }
            });
        if lazy {
            options = options.retry_on_initial_connect();
        }

        tracing::info!(url = %config.url, name = %config.client_name, "Connecting to NATS");

        let client = options
            .connect(config.url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        if client.connection_state() == async_nats::connection::State::Connected {
            monitor.record(ConnectionEvent::Connected);
        }

        Ok(Self { client, monitor })
    }
}

fn on_client_event(monitor: &ConnectionMonitor, event: async_nats::Event) {
    match event {
        async_nats::Event::Connected => monitor.record(ConnectionEvent::Connected),
        async_nats::Event::Disconnected => monitor.record(ConnectionEvent::Disconnected),
        async_nats::Event::Closed => monitor.record(ConnectionEvent::Closed),
        async_nats::Event::LameDuckMode => monitor.record(ConnectionEvent::LameDuck),
        other => tracing::warn!(event = %other, "NATS client event"),
    }
}

#[async_trait]
impl Transport for NatsTransport {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), TransportError> {
        self.client
            .publish(subject.to_string(), payload)
            .await
            .map_err(|e| TransportError::Publish {
                subject: subject.to_string(),
                reason: e.to_string(),
            })
    }

    async fn request(
        &self,
        subject: &str,
        payload: Bytes,
        timeout: Duration,
    ) -> Result<Bytes, TransportError> {
        let request = self.client.request(subject.to_string(), payload);
        let timed_out = || TransportError::RequestTimeout {
            subject: subject.to_string(),
            timeout,
        };

        match tokio::time::timeout(timeout, request).await {
            Ok(Ok(message)) => Ok(message.payload),
            Ok(Err(e)) => Err(match e.kind() {
                RequestErrorKind::NoResponders => TransportError::NoResponders(subject.to_string()),
                RequestErrorKind::TimedOut => timed_out(),
                _ => TransportError::Request {
                    subject: subject.to_string(),
                    reason: e.to_string(),
                },
            }),
            Err(_) => Err(timed_out()),
        }
    }

    async fn subscribe(&self, subject: &str) -> Result<Subscription, TransportError> {
        let subscriber = self
            .client
            .subscribe(subject.to_string())
            .await
            .map_err(|e| TransportError::Subscribe {
                subject: subject.to_string(),
                reason: e.to_string(),
            })?;

        let messages = subscriber
            .map(|message| InboundMessage {
                subject: message.subject.to_string(),
                payload: message.payload,
                reply: message.reply.map(|r| r.to_string()),
            })
            .boxed();

        Ok(Subscription::new(subject, messages))
    }

    fn monitor(&self) -> &ConnectionMonitor {
        &self.monitor
    }

    /// Drain subscriptions and pending publishes, then close the client.
    async fn close(&self) -> Result<(), TransportError> {
        let drained = self.client.drain().await;
        self.monitor.record(ConnectionEvent::Closed);
        drained.map_err(|e| TransportError::Drain(e.to_string()))
    }
}
