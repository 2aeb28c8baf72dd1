//! Subject registry: which bus subject carries which event kind.
//!
//! These defaults must match the subjects the upstream order, product and
//! payment services publish on. Deployments override individual entries
//! through configuration; the map is immutable once loaded.

use crate::event_kind::EventKind;

pub const SUBJECT_NOTIFICATIONS_SEND: &str = "notifications.send";
pub const SUBJECT_ORDERS_CREATED: &str = "orders.created";
pub const SUBJECT_ORDERS_UPDATED: &str = "orders.updated";
pub const SUBJECT_ORDERS_CANCELLED: &str = "orders.cancelled";
pub const SUBJECT_ORDERS_STATUS_CHANGED: &str = "orders.status.changed";
pub const SUBJECT_PRODUCTS_STOCK_LOW: &str = "products.stock.low";
pub const SUBJECT_PAYMENTS_CONFIRMED: &str = "payments.confirmed";
pub const SUBJECT_PAYMENTS_FAILED: &str = "payments.failed";

/// One registry entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectRoute {
    pub kind: EventKind,
    pub subject: String,
}

/// Ordered mapping from event kind to subject string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectMap {
    routes: Vec<SubjectRoute>,
}

impl SubjectMap {
    /// An empty registry. Mostly useful for tests that subscribe to a
    /// hand-picked set of subjects.
    pub fn empty() -> Self {
        Self { routes: Vec::new() }
    }

    /// Set (or replace) the subject for `kind`.
    pub fn with_subject(mut self, kind: EventKind, subject: impl Into<String>) -> Self {
        let subject = subject.into();
        match self.routes.iter_mut().find(|r| r.kind == kind) {
            Some(route) => route.subject = subject,
            None => self.routes.push(SubjectRoute { kind, subject }),
        }
        self
    }

    pub fn routes(&self) -> &[SubjectRoute] {
        &self.routes
    }

    pub fn subject_for(&self, kind: &EventKind) -> Option<&str> {
        self.routes
            .iter()
            .find(|r| &r.kind == kind)
            .map(|r| r.subject.as_str())
    }
}

impl Default for SubjectMap {
    fn default() -> Self {
        Self::empty()
            .with_subject(EventKind::NotificationRequested, SUBJECT_NOTIFICATIONS_SEND)
            .with_subject(EventKind::OrderCreated, SUBJECT_ORDERS_CREATED)
            .with_subject(EventKind::OrderUpdated, SUBJECT_ORDERS_UPDATED)
            .with_subject(EventKind::OrderCancelled, SUBJECT_ORDERS_CANCELLED)
            .with_subject(EventKind::OrderStatusChanged, SUBJECT_ORDERS_STATUS_CHANGED)
            .with_subject(EventKind::LowStock, SUBJECT_PRODUCTS_STOCK_LOW)
            .with_subject(EventKind::PaymentConfirmed, SUBJECT_PAYMENTS_CONFIRMED)
            .with_subject(EventKind::PaymentFailed, SUBJECT_PAYMENTS_FAILED)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
