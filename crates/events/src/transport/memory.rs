//! In-process transport with exact-subject routing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::{
    ConnectionEvent, ConnectionMonitor, ConnectionState, InboundMessage, Subscription, Transport,
    TransportError,
};

const INBOX_PREFIX: &str = "_INBOX.";

/// Message bus that lives entirely inside the process.
///
/// Every subscriber on a subject receives every message published to it.
/// [`disconnect`](Self::disconnect) and [`reconnect`](Self::reconnect)
/// simulate broker outages.
pub struct MemoryTransport {
    subscribers: RwLock<HashMap<String, Vec<mpsc::UnboundedSender<InboundMessage>>>>,
    monitor: ConnectionMonitor,
    closed: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            monitor: ConnectionMonitor::new(ConnectionState::Connected),
            closed: AtomicBool::new(false),
        }
    }

    /// Simulate losing the broker. Existing subscriptions stay registered.
    pub fn disconnect(&self) {
        self.monitor.record(ConnectionEvent::Disconnected);
    }

    pub fn reconnect(&self) {
        self.monitor.record(ConnectionEvent::Connected);
    }

    /// Number of live subscribers on `subject`.
    pub fn subscriber_count(&self, subject: &str) -> usize {
        self.subscribers
            .read()
            .get(subject)
            .map(|senders| senders.iter().filter(|tx| !tx.is_closed()).count())
            .unwrap_or(0)
    }

    fn ensure_open(&self) -> Result<(), TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        if !self.monitor.state().is_connected() {
            return Err(TransportError::NotConnected);
        }
        Ok(())
    }

    /// Deliver to every live subscriber; returns how many received it.
    fn deliver(&self, message: InboundMessage) -> usize {
        let mut subscribers = self.subscribers.write();
        let Some(senders) = subscribers.get_mut(&message.subject) else {
            return 0;
        };
        senders.retain(|tx| tx.send(message.clone()).is_ok());
        let delivered = senders.len();
        if senders.is_empty() {
            subscribers.remove(&message.subject);
        }
        delivered
    }

    fn register(&self, subject: &str) -> mpsc::UnboundedReceiver<InboundMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .write()
            .entry(subject.to_string())
            .or_default()
            .push(tx);
        rx
    }
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn publish(&self, subject: &str, payload: Bytes) -> Result<(), TransportError> {
        self.ensure_open()?;
        let delivered = self.deliver(InboundMessage {
            subject: subject.to_string(),
            payload,
            reply: None,
        });
        tracing::trace!(subject, delivered, "Published message");
        Ok(())
    }

    async fn request(
        &self,
        subject: &str,
        payload: Bytes,
        timeout: Duration,
    ) -> Result<Bytes, TransportError> {
        self.ensure_open()?;

        let inbox = format!("{INBOX_PREFIX}{}", uuid::Uuid::new_v4().simple());
        let mut replies = self.register(&inbox);

        let delivered = self.deliver(InboundMessage {
            subject: subject.to_string(),
            payload,
            reply: Some(inbox.clone()),
        });

        let result = if delivered == 0 {
            Err(TransportError::NoResponders(subject.to_string()))
        } else {
            match tokio::time::timeout(timeout, replies.recv()).await {
                Ok(Some(reply)) => Ok(reply.payload),
                Ok(None) => Err(TransportError::Closed),
                Err(_) => Err(TransportError::RequestTimeout {
                    subject: subject.to_string(),
                    timeout,
                }),
            }
        };

        self.subscribers.write().remove(&inbox);
        result
    }

    async fn subscribe(&self, subject: &str) -> Result<Subscription, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        let rx = self.register(subject);
        Ok(Subscription::new(
            subject,
            UnboundedReceiverStream::new(rx).boxed(),
        ))
    }

    fn monitor(&self) -> &ConnectionMonitor {
        &self.monitor
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        // Dropping the senders ends every subscription stream.
        self.subscribers.write().clear();
        self.monitor.record(ConnectionEvent::Closed);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
