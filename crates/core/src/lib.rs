//! Domain types shared by the notification hub crates.
//!
//! Nothing in here performs I/O: the notification record, its severity,
//! the event-kind classification table and the subject registry are all
//! plain data plus the pure functions that operate on them.

pub mod error;
pub mod event_kind;
pub mod notification;
pub mod subjects;
pub mod types;

pub use error::CoreError;
pub use event_kind::{EventKind, NotificationTemplate};
pub use notification::{NewNotification, Notification, Severity};
pub use subjects::{SubjectMap, SubjectRoute};
