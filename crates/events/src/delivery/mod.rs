//! External delivery channels for notifications.
//!
//! Each enabled channel receives `(message, type)` for every stored
//! notification. Channels are best-effort: there is no retry, and a
//! failing or panicking channel never affects the others or the caller.

pub mod email;
pub mod push;
pub mod sms;

use std::sync::Arc;

use async_trait::async_trait;
use minishop_core::Notification;

use crate::config::ChannelConfig;

pub use email::EmailChannel;
pub use push::PushChannel;
pub use sms::SmsChannel;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Message build error: {0}")]
    Build(String),

    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider returned HTTP {0}")]
    HttpStatus(u16),
}

// ---------------------------------------------------------------------------
// DeliveryChannel
// ---------------------------------------------------------------------------

#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Short name used in logs, e.g. `"email"`.
    fn name(&self) -> &'static str;

    async fn send(&self, message: &str, notification_type: &str) -> Result<(), ChannelError>;
}

// ---------------------------------------------------------------------------
// ChannelFanout
// ---------------------------------------------------------------------------

/// Delivers each notification to every configured channel independently.
#[derive(Clone)]
pub struct ChannelFanout {
    channels: Arc<[Arc<dyn DeliveryChannel>]>,
}

impl ChannelFanout {
    pub fn new(channels: Vec<Arc<dyn DeliveryChannel>>) -> Self {
        Self {
            channels: channels.into(),
        }
    }

    /// A fanout with no channels; delivery is a no-op.
    pub fn disabled() -> Self {
        Self::new(Vec::new())
    }

    /// Build one channel per enabled entry in `config`.
    pub fn from_config(config: &ChannelConfig) -> Result<Self, ChannelError> {
        let mut channels: Vec<Arc<dyn DeliveryChannel>> = Vec::new();
        if config.email.enabled {
            channels.push(Arc::new(EmailChannel::new(config.email.clone())?));
        }
        if config.sms.enabled {
            channels.push(Arc::new(SmsChannel::new(config.sms.clone())?));
        }
        if config.push.enabled {
            channels.push(Arc::new(PushChannel::new(config.push.clone())?));
        }
        Ok(Self::new(channels))
    }

    pub fn enabled_channels(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Deliver in the background and return immediately.
    pub fn dispatch(&self, notification: Notification) {
        if self.channels.is_empty() {
            return;
        }
        let fanout = self.clone();
        tokio::spawn(async move { fanout.deliver(&notification).await });
    }

    /// Attempt every channel concurrently and wait for all of them.
    ///
    /// Returns the number of channels that delivered successfully.
    pub async fn deliver(&self, notification: &Notification) -> usize {
        let message: Arc<str> = notification.message.as_str().into();
        let notification_type: Arc<str> = notification.notification_type.as_str().into();

        let tasks: Vec<_> = self
            .channels
            .iter()
            .map(|channel| {
                let channel = Arc::clone(channel);
                let message = Arc::clone(&message);
                let notification_type = Arc::clone(&notification_type);
                let name = channel.name();
                let handle = tokio::spawn(async move {
                    channel.send(&message, &notification_type).await
                });
                (name, handle)
            })
            .collect();

        let mut delivered = 0;
        for (channel, handle) in tasks {
            match handle.await {
                Ok(Ok(())) => {
                    delivered += 1;
                    tracing::debug!(channel, id = notification.id, "Notification delivered");
                }
                Ok(Err(e)) => {
                    tracing::warn!(channel, id = notification.id, error = %e, "Channel delivery failed");
                }
                Err(e) => {
                    tracing::error!(channel, id = notification.id, error = %e, "Channel delivery task panicked");
                }
            }
        }
        delivered
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use minishop_core::Severity;
    use parking_lot::Mutex;

    use super::*;

    enum Behaviour {
        Succeed,
        Fail,
        Panic,
    }

    struct FakeChannel {
        name: &'static str,
        behaviour: Behaviour,
        calls: AtomicUsize,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl FakeChannel {
        fn new(name: &'static str, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                name,
                behaviour,
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl DeliveryChannel for FakeChannel {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn send(&self, message: &str, notification_type: &str) -> Result<(), ChannelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen
                .lock()
                .push((message.to_string(), notification_type.to_string()));
            match self.behaviour {
                Behaviour::Succeed => Ok(()),
                Behaviour::Fail => Err(ChannelError::HttpStatus(503)),
                Behaviour::Panic => panic!("channel blew up"),
            }
        }
    }

    fn fanout_of(channels: &[&Arc<FakeChannel>]) -> ChannelFanout {
        ChannelFanout::new(
            channels
                .iter()
                .map(|c| Arc::clone(c) as Arc<dyn DeliveryChannel>)
                .collect(),
        )
    }

    fn notification() -> Notification {
        Notification {
            id: 1,
            notification_type: "LOW_STOCK".into(),
            title: "Low Stock".into(),
            message: "Mug is low".into(),
            severity: Severity::Error,
            created_at: Utc::now(),
            read: false,
        }
    }

    #[tokio::test]
    async fn failing_channels_do_not_block_others() {
        let ok = FakeChannel::new("email", Behaviour::Succeed);
        let failing = FakeChannel::new("sms", Behaviour::Fail);
        let panicking = FakeChannel::new("push", Behaviour::Panic);
        let fanout = fanout_of(&[&panicking, &failing, &ok]);

        let delivered = fanout.deliver(&notification()).await;

        assert_eq!(delivered, 1);
        assert_eq!(ok.calls.load(Ordering::SeqCst), 1);
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
        assert_eq!(panicking.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn channels_receive_message_and_type() {
        let channel = FakeChannel::new("email", Behaviour::Succeed);
        let fanout = fanout_of(&[&channel]);

        fanout.deliver(&notification()).await;

        assert_eq!(
            channel.seen.lock().as_slice(),
            &[("Mug is low".to_string(), "LOW_STOCK".to_string())]
        );
    }

    #[tokio::test]
    async fn no_retry_on_failure() {
        let failing = FakeChannel::new("sms", Behaviour::Fail);
        let fanout = fanout_of(&[&failing]);

        assert_eq!(fanout.deliver(&notification()).await, 0);
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_config_enables_nothing() {
        let fanout = ChannelFanout::from_config(&ChannelConfig::default()).unwrap();
        assert!(fanout.enabled_channels().is_empty());
    }

    #[test]
    fn channel_error_display() {
        assert_eq!(ChannelError::HttpStatus(502).to_string(), "Provider returned HTTP 502");
    }
}
