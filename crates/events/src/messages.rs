//! Wire formats of the events exchanged with the order, product and
//! payment services.
//!
//! Every field is optional on decode: upstream services omit fields
//! freely and a missing value must never drop the event. Timestamps are
//! kept as raw JSON because producers disagree on their encoding.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const UNKNOWN: &str = "unknown";

fn or_unknown(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(UNKNOWN)
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl OrderEvent {
    /// "Order 42 <verb>", with the owning user when known.
    pub fn describe(&self, verb: &str) -> String {
        let mut text = format!("Order {} {verb}", or_unknown(&self.order_id));
        if let Some(user) = &self.user_id {
            text.push_str(&format!(" for user {user}"));
        }
        text
    }

    pub fn describe_status_change(&self) -> String {
        match &self.status {
            Some(status) => format!(
                "Order {} status changed to {status}",
                or_unknown(&self.order_id)
            ),
            None => self.describe("status changed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ProductEvent {
    pub fn describe_low_stock(&self) -> String {
        match (&self.name, &self.product_id) {
            (Some(name), Some(id)) => format!("Product {name} ({id}) is running low on stock"),
            (Some(name), None) => format!("Product {name} is running low on stock"),
            (None, id) => format!("Product {} is running low on stock", or_unknown(id)),
        }
    }
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
}

impl PaymentEvent {
    pub fn describe(&self, outcome: &str) -> String {
        let mut text = format!("Payment for order {} {outcome}", or_unknown(&self.order_id));
        if let Some(amount) = self.amount {
            text.push_str(&format!(" ({amount:.2})"));
        }
        text
    }
}

// ---------------------------------------------------------------------------
// Direct notifications
// ---------------------------------------------------------------------------

/// Request to notify a user directly, published on the direct-notification
/// subject.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl NotificationMessage {
    /// A message stamped with the current time.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            timestamp: Some(Value::String(Utc::now().to_rfc3339())),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_event_tolerates_missing_and_unknown_fields() {
        let event: OrderEvent =
            serde_json::from_str(r#"{"orderId":"42","extra":true,"timestamp":[2024,1,2,3,4]}"#)
                .unwrap();

        assert_eq!(event.order_id.as_deref(), Some("42"));
        assert!(event.user_id.is_none());
        assert_eq!(event.describe("created"), "Order 42 created");
    }

    #[test]
    fn order_description_includes_user_and_status() {
        let event = OrderEvent {
            order_id: Some("7".into()),
            user_id: Some("u-1".into()),
            status: Some("SHIPPED".into()),
            ..Default::default()
        };
        assert_eq!(event.describe("cancelled"), "Order 7 cancelled for user u-1");
        assert_eq!(event.describe_status_change(), "Order 7 status changed to SHIPPED");
    }

    #[test]
    fn low_stock_description_variants() {
        let both = ProductEvent {
            product_id: Some("p1".into()),
            name: Some("Widget".into()),
            ..Default::default()
        };
        assert_eq!(both.describe_low_stock(), "Product Widget (p1) is running low on stock");
        assert_eq!(
            ProductEvent::default().describe_low_stock(),
            "Product unknown is running low on stock"
        );
    }

    #[test]
    fn payment_description_formats_amount() {
        let event: PaymentEvent =
            serde_json::from_str(r#"{"orderId":"9","amount":12.5}"#).unwrap();
        assert_eq!(event.describe("confirmed"), "Payment for order 9 confirmed (12.50)");
    }

    #[test]
    fn notification_message_uses_type_key() {
        let mut msg = NotificationMessage::new("hello");
        msg.notification_type = Some("PROMO".into());

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "PROMO");
        assert_eq!(json["message"], "hello");
        assert!(json.get("userId").is_none());
    }
}
