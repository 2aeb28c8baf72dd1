//! Message bus transport.
//!
//! [`Transport`] is the seam between the hub and the broker: publish,
//! request/reply and subscribe primitives plus an observable
//! [`ConnectionMonitor`]. Two implementations exist:
//!
//! - [`NatsTransport`] talks to a NATS server and owns its reconnect and
//!   keep-alive policy.
//! - [`MemoryTransport`] routes messages in-process; it backs local runs
//!   (`BROKER_URL=memory://`) and hermetic tests.

pub mod memory;
pub mod nats;
pub mod reconnect;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

pub use memory::MemoryTransport;
pub use nats::NatsTransport;
pub use reconnect::ReconnectPolicy;

use crate::config::TransportConfig;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The broker connection could not be established.
    #[error("Connection error: {0}")]
    Connect(String),

    /// The transport is known to be disconnected.
    #[error("Not connected to the message bus")]
    NotConnected,

    #[error("Publish to '{subject}' failed: {reason}")]
    Publish { subject: String, reason: String },

    #[error("Subscribe to '{subject}' failed: {reason}")]
    Subscribe { subject: String, reason: String },

    #[error("Request on '{subject}' failed: {reason}")]
    Request { subject: String, reason: String },

    #[error("Request on '{subject}' timed out after {timeout:?}")]
    RequestTimeout { subject: String, timeout: Duration },

    #[error("No responders for '{0}'")]
    NoResponders(String),

    /// The subscription's message stream ended.
    #[error("Subscription to '{0}' closed")]
    SubscriptionClosed(String),

    #[error("Transport closed")]
    Closed,

    #[error("Failed to drain connection: {0}")]
    Drain(String),

    #[error("Cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Messages and subscriptions
// ---------------------------------------------------------------------------

/// A raw message delivered by the transport.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub subject: String,
    pub payload: Bytes,
    /// Reply subject, set when the sender expects a response.
    pub reply: Option<String>,
}

/// A live subscription to one subject.
pub struct Subscription {
    subject: String,
    messages: BoxStream<'static, InboundMessage>,
}

impl Subscription {
    pub fn new(subject: impl Into<String>, messages: BoxStream<'static, InboundMessage>) -> Self {
        Self {
            subject: subject.into(),
            messages,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Wait up to `timeout` for the next message.
    ///
    /// `Ok(None)` means the wait timed out, which is not an error. The
    /// subscription is unusable once this returns
    /// [`TransportError::SubscriptionClosed`].
    pub async fn next_message(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<InboundMessage>, TransportError> {
        match tokio::time::timeout(timeout, self.messages.next()).await {
            Ok(Some(message)) => Ok(Some(message)),
            Ok(None) => Err(TransportError::SubscriptionClosed(self.subject.clone())),
            Err(_elapsed) => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Connection state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No connection has been established yet.
    Pending,
    Connected,
    /// Lost the connection; the client is reconnecting.
    Disconnected,
    /// The connection is gone for good.
    Closed,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

/// Connection lifecycle transitions, published for operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionEvent {
    Connected,
    Disconnected,
    Reconnected,
    Closed,
    /// The server announced it is about to shut down.
    LameDuck,
}

/// Capacity of the connection-event broadcast channel.
const CONNECTION_EVENT_CAPACITY: usize = 64;

/// Tracks the current [`ConnectionState`] and broadcasts every
/// [`ConnectionEvent`].
pub struct ConnectionMonitor {
    state: watch::Sender<ConnectionState>,
    events: broadcast::Sender<ConnectionEvent>,
}

impl ConnectionMonitor {
    pub fn new(initial: ConnectionState) -> Self {
        let (state, _) = watch::channel(initial);
        let (events, _) = broadcast::channel(CONNECTION_EVENT_CAPACITY);
        Self { state, events }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes every state change.
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    /// Apply a lifecycle event.
    ///
    /// A `Connected` event following a disconnect is reported as
    /// `Reconnected`; a `Connected` event while already connected is
    /// ignored.
    pub fn record(&self, event: ConnectionEvent) {
        let previous = self.state();
        let event = match (event, previous) {
            (ConnectionEvent::Connected, ConnectionState::Connected) => return,
            (ConnectionEvent::Connected, ConnectionState::Disconnected) => {
                ConnectionEvent::Reconnected
            }
            (event, _) => event,
        };

        let next = match event {
            ConnectionEvent::Connected | ConnectionEvent::Reconnected => ConnectionState::Connected,
            ConnectionEvent::Disconnected => ConnectionState::Disconnected,
            ConnectionEvent::Closed => ConnectionState::Closed,
            ConnectionEvent::LameDuck => previous,
        };
        self.state.send_replace(next);

        match event {
            ConnectionEvent::Connected => tracing::info!("Connected to message bus"),
            ConnectionEvent::Reconnected => tracing::info!("Reconnected to message bus"),
            ConnectionEvent::Disconnected => tracing::warn!("Disconnected from message bus"),
            ConnectionEvent::Closed => tracing::info!("Message bus connection closed"),
            ConnectionEvent::LameDuck => tracing::warn!("Message bus server entered lame duck mode"),
        }

        // No receivers is fine: nobody is watching the lifecycle.
        let _ = self.events.send(event);
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Publish/subscribe primitives over a message bus.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fire-and-forget publish.
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), TransportError>;

    /// Publish and wait up to `timeout` for a single reply.
    async fn request(
        &self,
        subject: &str,
        payload: Bytes,
        timeout: Duration,
    ) -> Result<Bytes, TransportError>;

    async fn subscribe(&self, subject: &str) -> Result<Subscription, TransportError>;

    fn monitor(&self) -> &ConnectionMonitor;

    /// Flush outstanding messages and close the connection.
    async fn close(&self) -> Result<(), TransportError>;
}

/// Open the transport selected by `config.url`.
///
/// When the broker is required at startup, connection attempts are bounded
/// by `config.startup_attempts` and the last error is returned. Otherwise
/// the client starts disconnected and keeps connecting in the background.
pub async fn connect(
    config: &TransportConfig,
    cancel: &CancellationToken,
) -> Result<Arc<dyn Transport>, TransportError> {
    if config.is_in_memory() {
        tracing::info!("Using in-process message bus");
        return Ok(Arc::new(MemoryTransport::new()));
    }

    if !config.required_at_startup {
        let transport = NatsTransport::connect_lazy(config).await?;
        return Ok(Arc::new(transport));
    }

    let startup_policy = ReconnectPolicy {
        max_attempts: config.startup_attempts,
        ..config.reconnect.clone()
    };
    let transport =
        reconnect::connect_with_retry(&startup_policy, cancel, || NatsTransport::connect(config))
            .await?;
    Ok(Arc::new(transport))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
