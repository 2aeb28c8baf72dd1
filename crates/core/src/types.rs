/// Process-unique notification identifier, assigned in creation order.
pub type NotificationId = u64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
