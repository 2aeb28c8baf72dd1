//! The notification record and its severity classification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{NotificationId, Timestamp};

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// How important a notification is to the person reading it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl Severity {
    /// Wire name, e.g. `"WARNING"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Success => "SUCCESS",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = CoreError;

    /// Case-insensitive parse of the wire name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "INFO" => Ok(Severity::Info),
            "SUCCESS" => Ok(Severity::Success),
            "WARNING" => Ok(Severity::Warning),
            "ERROR" => Ok(Severity::Error),
            other => Err(CoreError::Validation(format!(
                "unknown severity '{other}', expected one of INFO, SUCCESS, WARNING, ERROR"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// A stored, user-visible notification.
///
/// Instances are only produced by the notification store, which assigns
/// `id` and `created_at`. The only field that ever changes afterwards is
/// `read`, and only from `false` to `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    /// Type tag mirroring the originating event kind, or `"DIRECT"`.
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub created_at: Timestamp,
    pub read: bool,
}

/// The caller-supplied part of a notification, before the store stamps it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    /// Creation time override. `None` means "now, at insertion".
    pub created_at: Option<Timestamp>,
}

impl NewNotification {
    pub fn new(
        notification_type: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            notification_type: notification_type.into(),
            title: title.into(),
            message: message.into(),
            severity,
            created_at: None,
        }
    }

    /// Pin the creation timestamp instead of using the insertion time.
    pub fn with_created_at(mut self, created_at: Timestamp) -> Self {
        self.created_at = Some(created_at);
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn severity_parses_case_insensitively() {
        assert_eq!("info".parse::<Severity>().unwrap(), Severity::Info);
        assert_eq!(" Warning ".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("ERROR".parse::<Severity>().unwrap(), Severity::Error);
    }

    #[test]
    fn unknown_severity_is_a_validation_error() {
        assert_matches!("CRITICAL".parse::<Severity>(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn notification_serializes_with_camel_case_and_type_tag() {
        let n = Notification {
            id: 7,
            notification_type: "LOW_STOCK".into(),
            title: "Low Stock".into(),
            message: "Widget is running low".into(),
            severity: Severity::Error,
            created_at: chrono::Utc::now(),
            read: false,
        };

        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["type"], "LOW_STOCK");
        assert_eq!(json["severity"], "ERROR");
        assert_eq!(json["read"], false);
        assert!(json["createdAt"].is_string());
    }

    #[test]
    fn new_notification_defaults_to_insertion_time() {
        let draft = NewNotification::new("TEST", "t", "m", Severity::Info);
        assert!(draft.created_at.is_none());

        let at = chrono::Utc::now() - chrono::Duration::days(3);
        assert_eq!(draft.with_created_at(at).created_at, Some(at));
    }
}
