//! Classification of domain events into notification templates.
//!
//! Every event kind maps to a fixed `(title, severity)` pair through
//! [`EventKind::template`]. The match is exhaustive, so adding a kind
//! without a template is a compile error; kinds that arrive on subjects
//! the registry does not know are carried as [`EventKind::Other`] and get
//! the generic template.

use std::fmt;

use crate::notification::Severity;

/// Title and severity a notification inherits from its event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationTemplate {
    pub title: &'static str,
    pub severity: Severity,
}

/// Logical kind of a domain event travelling on the bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A service asked for a notification to be shown verbatim.
    NotificationRequested,
    OrderCreated,
    OrderUpdated,
    OrderCancelled,
    OrderStatusChanged,
    LowStock,
    PaymentConfirmed,
    PaymentFailed,
    /// Anything else, carrying its own type tag.
    Other(String),
}

impl EventKind {
    /// Every kind with a dedicated subject in the registry.
    pub const KNOWN: [EventKind; 8] = [
        EventKind::NotificationRequested,
        EventKind::OrderCreated,
        EventKind::OrderUpdated,
        EventKind::OrderCancelled,
        EventKind::OrderStatusChanged,
        EventKind::LowStock,
        EventKind::PaymentConfirmed,
        EventKind::PaymentFailed,
    ];

    /// Notification type tag stored on records created from this kind.
    pub fn type_tag(&self) -> &str {
        match self {
            EventKind::NotificationRequested => "DIRECT",
            EventKind::OrderCreated => "ORDER_CREATED",
            EventKind::OrderUpdated => "ORDER_UPDATED",
            EventKind::OrderCancelled => "ORDER_CANCELLED",
            EventKind::OrderStatusChanged => "ORDER_STATUS_CHANGED",
            EventKind::LowStock => "LOW_STOCK",
            EventKind::PaymentConfirmed => "PAYMENT_CONFIRMED",
            EventKind::PaymentFailed => "PAYMENT_FAILED",
            EventKind::Other(tag) => tag,
        }
    }

    pub fn template(&self) -> NotificationTemplate {
        let (title, severity) = match self {
            EventKind::OrderCreated => ("New Order", Severity::Success),
            EventKind::OrderUpdated => ("Order Updated", Severity::Info),
            EventKind::OrderCancelled => ("Order Cancelled", Severity::Warning),
            EventKind::OrderStatusChanged => ("Order Status Changed", Severity::Info),
            EventKind::LowStock => ("Low Stock", Severity::Error),
            EventKind::PaymentConfirmed => ("Payment Confirmed", Severity::Success),
            EventKind::PaymentFailed => ("Payment Failed", Severity::Error),
            EventKind::NotificationRequested => ("Direct Notification", Severity::Info),
            EventKind::Other(_) => ("Notification", Severity::Info),
        };
        NotificationTemplate { title, severity }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_tag())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn template_of(kind: EventKind) -> (&'static str, Severity) {
        let t = kind.template();
        (t.title, t.severity)
    }

    #[test]
    fn core_kinds_map_to_their_templates() {
        assert_eq!(template_of(EventKind::OrderCreated), ("New Order", Severity::Success));
        assert_eq!(
            template_of(EventKind::OrderCancelled),
            ("Order Cancelled", Severity::Warning)
        );
        assert_eq!(template_of(EventKind::LowStock), ("Low Stock", Severity::Error));
        assert_eq!(
            template_of(EventKind::PaymentConfirmed),
            ("Payment Confirmed", Severity::Success)
        );
        assert_eq!(
            template_of(EventKind::NotificationRequested),
            ("Direct Notification", Severity::Info)
        );
    }

    #[test]
    fn unrecognized_kind_gets_generic_template() {
        let kind = EventKind::Other("INVENTORY_AUDIT".into());
        assert_eq!(template_of(kind.clone()), ("Notification", Severity::Info));
        assert_eq!(kind.type_tag(), "INVENTORY_AUDIT");
    }

    #[test]
    fn direct_requests_are_tagged_direct() {
        assert_eq!(EventKind::NotificationRequested.type_tag(), "DIRECT");
        assert_eq!(EventKind::LowStock.to_string(), "LOW_STOCK");
    }

    #[test]
    fn known_kinds_have_distinct_tags() {
        let kinds = EventKind::KNOWN;
        let mut tags: Vec<&str> = kinds.iter().map(EventKind::type_tag).collect();
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), kinds.len());
    }
}
