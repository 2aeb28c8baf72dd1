//! Bounded, concurrently accessed notification record.
//!
//! [`NotificationStore`] keeps the most recent `capacity` notifications,
//! newest first. Every query returns an owned snapshot so callers never
//! hold the lock while serializing or filtering.
//!
//! Locking: inserts, cleanup and capacity eviction take the write lock;
//! queries and read-flag updates take the read lock. The read flag is an
//! atomic on each entry, so marking notifications read never blocks
//! concurrent queries.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use minishop_core::types::{NotificationId, Timestamp};
use minishop_core::{NewNotification, Notification, Severity};
use parking_lot::RwLock;
use serde::Serialize;

struct Entry {
    id: NotificationId,
    notification_type: String,
    title: String,
    message: String,
    severity: Severity,
    created_at: Timestamp,
    read: AtomicBool,
}

impl Entry {
    fn is_read(&self) -> bool {
        self.read.load(Ordering::Acquire)
    }

    fn snapshot(&self) -> Notification {
        Notification {
            id: self.id,
            notification_type: self.notification_type.clone(),
            title: self.title.clone(),
            message: self.message.clone(),
            severity: self.severity,
            created_at: self.created_at,
            read: self.is_read(),
        }
    }
}

struct Inner {
    entries: VecDeque<Arc<Entry>>,
    next_id: NotificationId,
}

/// Aggregate counters over the current contents of the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationStats {
    pub total: usize,
    pub unread: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_severity: BTreeMap<String, usize>,
    /// When this snapshot was taken.
    pub last_update: Timestamp,
}

pub struct NotificationStore {
    inner: RwLock<Inner>,
    capacity: usize,
}

impl NotificationStore {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: RwLock::new(Inner {
                entries: VecDeque::with_capacity(capacity),
                next_id: 1,
            }),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stamp and store `new` at the head, evicting the oldest entries once
    /// over capacity.
    pub fn insert(&self, new: NewNotification) -> Notification {
        let mut inner = self.inner.write();

        let id = inner.next_id;
        inner.next_id += 1;

        let entry = Arc::new(Entry {
            id,
            notification_type: new.notification_type,
            title: new.title,
            message: new.message,
            severity: new.severity,
            created_at: new.created_at.unwrap_or_else(Utc::now),
            read: AtomicBool::new(false),
        });
        let stored = entry.snapshot();

        inner.entries.push_front(entry);
        while inner.entries.len() > self.capacity {
            inner.entries.pop_back();
        }

        stored
    }

    /// Every notification, newest first.
    pub fn all(&self) -> Vec<Notification> {
        self.collect(|_| true, usize::MAX)
    }

    /// The `limit` newest notifications.
    pub fn top(&self, limit: usize) -> Vec<Notification> {
        self.collect(|_| true, limit)
    }

    pub fn by_type(&self, notification_type: &str) -> Vec<Notification> {
        self.collect(|e| e.notification_type == notification_type, usize::MAX)
    }

    pub fn unread(&self) -> Vec<Notification> {
        self.collect(|e| !e.is_read(), usize::MAX)
    }

    /// Notifications created strictly after `t0`.
    pub fn since(&self, t0: Timestamp) -> Vec<Notification> {
        self.collect(|e| e.created_at > t0, usize::MAX)
    }

    /// Mark the notification with `id` as read. Returns whether it exists.
    pub fn mark_read(&self, id: NotificationId) -> bool {
        let inner = self.inner.read();
        match inner.entries.iter().find(|e| e.id == id) {
            Some(entry) => {
                entry.read.store(true, Ordering::Release);
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&self) {
        let inner = self.inner.read();
        for entry in &inner.entries {
            entry.read.store(true, Ordering::Release);
        }
    }

    pub fn unread_count(&self) -> usize {
        self.inner
            .read()
            .entries
            .iter()
            .filter(|e| !e.is_read())
            .count()
    }

    /// Remove notifications created before `now - max_age`. Returns how many
    /// were removed.
    pub fn cleanup(&self, max_age: chrono::Duration) -> usize {
        let cutoff = Utc::now() - max_age;
        let mut inner = self.inner.write();
        let before = inner.entries.len();
        inner.entries.retain(|e| e.created_at >= cutoff);
        before - inner.entries.len()
    }

    pub fn stats(&self) -> NotificationStats {
        let inner = self.inner.read();
        let mut stats = NotificationStats {
            total: inner.entries.len(),
            unread: 0,
            by_type: BTreeMap::new(),
            by_severity: BTreeMap::new(),
            last_update: Utc::now(),
        };

        for entry in &inner.entries {
            if !entry.is_read() {
                stats.unread += 1;
            }
            *stats
                .by_type
                .entry(entry.notification_type.clone())
                .or_default() += 1;
            *stats
                .by_severity
                .entry(entry.severity.as_str().to_string())
                .or_default() += 1;
        }

        stats
    }

    fn collect(&self, keep: impl Fn(&Entry) -> bool, limit: usize) -> Vec<Notification> {
        let inner = self.inner.read();
        inner
            .entries
            .iter()
            .filter(|e| keep(e))
            .take(limit)
            .map(|e| e.snapshot())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
