//! Translates domain events into stored notifications.
//!
//! The dispatcher runs on the subscription worker that received the event.
//! It renders the payload, inserts the notification and hands it to the
//! channel fanout, which delivers in the background.

use std::sync::Arc;

use bytes::Bytes;
use minishop_core::{EventKind, NewNotification, Notification};
use serde::de::DeserializeOwned;

use crate::delivery::ChannelFanout;
use crate::messages::{OrderEvent, PaymentEvent, ProductEvent};
use crate::store::NotificationStore;

// ---------------------------------------------------------------------------
// DomainEvent
// ---------------------------------------------------------------------------

/// An event as received from the bus.
#[derive(Debug, Clone)]
pub struct DomainEvent {
    pub kind: EventKind,
    pub payload: Bytes,
    pub subject: String,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Malformed payload on '{subject}': {reason}")]
    Decode { subject: String, reason: String },
}

/// Receives every event a subscription worker pulls off the bus.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: DomainEvent) -> Result<(), DispatchError>;
}

// ---------------------------------------------------------------------------
// EventDispatcher
// ---------------------------------------------------------------------------

pub struct EventDispatcher {
    store: Arc<NotificationStore>,
    fanout: ChannelFanout,
}

impl EventDispatcher {
    pub fn new(store: Arc<NotificationStore>, fanout: ChannelFanout) -> Self {
        Self { store, fanout }
    }

    /// Render, store and fan out one event.
    pub fn dispatch(&self, event: &DomainEvent) -> Result<Notification, DispatchError> {
        let template = event.kind.template();
        let message = render_message(event)?;

        let notification = self.store.insert(NewNotification::new(
            event.kind.type_tag(),
            template.title,
            message,
            template.severity,
        ));

        tracing::info!(
            id = notification.id,
            notification_type = %notification.notification_type,
            subject = %event.subject,
            "Notification created",
        );

        self.fanout.dispatch(notification.clone());
        Ok(notification)
    }
}

impl EventHandler for EventDispatcher {
    fn handle(&self, event: DomainEvent) -> Result<(), DispatchError> {
        self.dispatch(&event).map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Human-readable message for `event`.
///
/// Direct requests and unrecognised kinds carry their payload text
/// verbatim. Structured kinds are described from their decoded fields; a
/// payload that does not decode falls back to a fixed sentence for the
/// kind. Payloads that are not UTF-8 are rejected.
fn render_message(event: &DomainEvent) -> Result<String, DispatchError> {
    let text = std::str::from_utf8(&event.payload).map_err(|e| DispatchError::Decode {
        subject: event.subject.clone(),
        reason: e.to_string(),
    })?;

    let rendered = match &event.kind {
        EventKind::NotificationRequested | EventKind::Other(_) => Some(text.to_string()),
        EventKind::OrderCreated => decode::<OrderEvent>(event, text).map(|e| e.describe("created")),
        EventKind::OrderUpdated => decode::<OrderEvent>(event, text).map(|e| e.describe("updated")),
        EventKind::OrderCancelled => {
            decode::<OrderEvent>(event, text).map(|e| e.describe("cancelled"))
        }
        EventKind::OrderStatusChanged => {
            decode::<OrderEvent>(event, text).map(|e| e.describe_status_change())
        }
        EventKind::LowStock => decode::<ProductEvent>(event, text).map(|e| e.describe_low_stock()),
        EventKind::PaymentConfirmed => {
            decode::<PaymentEvent>(event, text).map(|e| e.describe("confirmed"))
        }
        EventKind::PaymentFailed => decode::<PaymentEvent>(event, text).map(|e| e.describe("failed")),
    };

    Ok(rendered.unwrap_or_else(|| fallback_message(&event.kind).to_string()))
}

fn decode<T: DeserializeOwned>(event: &DomainEvent, text: &str) -> Option<T> {
    match serde_json::from_str(text) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            tracing::warn!(
                subject = %event.subject,
                kind = %event.kind,
                error = %e,
                "Event payload did not decode, using default message",
            );
            None
        }
    }
}

fn fallback_message(kind: &EventKind) -> &'static str {
    match kind {
        EventKind::OrderCreated => "New order created",
        EventKind::OrderUpdated => "Order updated",
        EventKind::OrderCancelled => "Order cancelled",
        EventKind::OrderStatusChanged => "Order status changed",
        EventKind::LowStock => "Low stock detected",
        EventKind::PaymentConfirmed => "Payment confirmed",
        EventKind::PaymentFailed => "Payment failed",
        EventKind::NotificationRequested | EventKind::Other(_) => "Notification received",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
