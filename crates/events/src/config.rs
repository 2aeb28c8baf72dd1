//! Environment-driven configuration for the event side of the hub.
//!
//! Every setting has a default suitable for local development. Values are
//! read through an [`EnvSource`] so tests can supply a fixed set of pairs
//! instead of mutating the process environment.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use minishop_core::{EventKind, SubjectMap};

use crate::delivery::email::EmailChannelConfig;
use crate::delivery::push::PushChannelConfig;
use crate::delivery::sms::SmsChannelConfig;
use crate::transport::reconnect::ReconnectPolicy;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} has invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("{key} is required when the {channel} channel is enabled")]
    Missing {
        key: &'static str,
        channel: &'static str,
    },
}

// ---------------------------------------------------------------------------
// EnvSource
// ---------------------------------------------------------------------------

/// Key/value lookup used by every `load` function in this crate.
pub struct EnvSource<'a> {
    lookup: Box<dyn Fn(&str) -> Option<String> + 'a>,
}

impl EnvSource<'static> {
    /// Read from the process environment.
    pub fn process() -> Self {
        Self {
            lookup: Box::new(|key| std::env::var(key).ok()),
        }
    }
}

impl<'a> EnvSource<'a> {
    /// Read from a fixed list of pairs; unknown keys are unset.
    pub fn from_pairs(pairs: &'a [(&'a str, &'a str)]) -> Self {
        Self {
            lookup: Box::new(move |key| {
                pairs
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| v.to_string())
            }),
        }
    }

    /// Trimmed value, treating empty strings as unset.
    pub fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    pub fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    pub fn parse<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid {
                key,
                value: raw.clone(),
                reason: e.to_string(),
            }),
        }
    }

    /// Boolean flag accepting `true/false`, `1/0`, `yes/no`, `on/off`.
    pub fn flag(&self, key: &'static str, default: bool) -> Result<bool, ConfigError> {
        let Some(raw) = self.get(key) else {
            return Ok(default);
        };
        match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                key,
                value: raw,
                reason: "expected a boolean".into(),
            }),
        }
    }

    pub fn millis(&self, key: &'static str, default_ms: u64) -> Result<Duration, ConfigError> {
        self.parse(key, default_ms).map(Duration::from_millis)
    }

    pub fn secs(&self, key: &'static str, default_secs: u64) -> Result<Duration, ConfigError> {
        self.parse(key, default_secs).map(Duration::from_secs)
    }
}

// ---------------------------------------------------------------------------
// TransportConfig
// ---------------------------------------------------------------------------

/// Scheme that selects the in-process transport instead of a broker.
pub const MEMORY_BROKER_URL: &str = "memory://";

const DEFAULT_BROKER_URL: &str = "nats://localhost:4222";
const DEFAULT_CLIENT_NAME: &str = "notifications-service";

/// Broker connection settings.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub url: String,
    pub client_name: String,
    pub connect_timeout: Duration,
    pub ping_interval: Duration,
    pub reconnect: ReconnectPolicy,
    /// Upper bound for request/reply round trips.
    pub request_timeout: Duration,
    /// Whether failing to reach the broker at startup aborts the service.
    pub required_at_startup: bool,
    /// Connection attempts made at startup before giving up.
    pub startup_attempts: usize,
}

impl TransportConfig {
    /// | Env Var                       | Default                 |
    /// |-------------------------------|-------------------------|
    /// | `BROKER_URL`                  | `nats://localhost:4222` |
    /// | `BROKER_CLIENT_NAME`          | `notifications-service` |
    /// | `BROKER_CONNECT_TIMEOUT_MS`   | `2000`                  |
    /// | `BROKER_PING_INTERVAL_MS`     | `120000`                |
    /// | `BROKER_MAX_RECONNECTS`       | `60`                    |
    /// | `BROKER_RECONNECT_WAIT_MS`    | `2000`                  |
    /// | `BROKER_REQUEST_TIMEOUT_MS`   | `2000`                  |
    /// | `BROKER_REQUIRED_AT_STARTUP`  | `true`                  |
    /// | `BROKER_STARTUP_ATTEMPTS`     | `3`                     |
    pub fn load(env: &EnvSource<'_>) -> Result<Self, ConfigError> {
        let max_reconnects: usize = env.parse("BROKER_MAX_RECONNECTS", 60)?;
        let reconnect_wait = env.millis("BROKER_RECONNECT_WAIT_MS", 2000)?;

        Ok(Self {
            url: env.string("BROKER_URL", DEFAULT_BROKER_URL),
            client_name: env.string("BROKER_CLIENT_NAME", DEFAULT_CLIENT_NAME),
            connect_timeout: env.millis("BROKER_CONNECT_TIMEOUT_MS", 2000)?,
            ping_interval: env.millis("BROKER_PING_INTERVAL_MS", 120_000)?,
            reconnect: ReconnectPolicy::fixed(max_reconnects, reconnect_wait),
            request_timeout: env.millis("BROKER_REQUEST_TIMEOUT_MS", 2000)?,
            required_at_startup: env.flag("BROKER_REQUIRED_AT_STARTUP", true)?,
            startup_attempts: env.parse("BROKER_STARTUP_ATTEMPTS", 3)?,
        })
    }

    /// Configuration for the in-process transport with default timings.
    pub fn in_memory() -> Self {
        Self {
            url: MEMORY_BROKER_URL.to_string(),
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            connect_timeout: Duration::from_millis(2000),
            ping_interval: Duration::from_millis(120_000),
            reconnect: ReconnectPolicy::default(),
            request_timeout: Duration::from_millis(2000),
            required_at_startup: true,
            startup_attempts: 1,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.url.starts_with(MEMORY_BROKER_URL)
    }
}

// ---------------------------------------------------------------------------
// Subjects
// ---------------------------------------------------------------------------

/// Environment keys that override the default subject of each kind.
const SUBJECT_OVERRIDES: [(&str, EventKind); 8] = [
    ("SUBJECT_NOTIFICATIONS_SEND", EventKind::NotificationRequested),
    ("SUBJECT_ORDERS_CREATED", EventKind::OrderCreated),
    ("SUBJECT_ORDERS_UPDATED", EventKind::OrderUpdated),
    ("SUBJECT_ORDERS_CANCELLED", EventKind::OrderCancelled),
    ("SUBJECT_ORDERS_STATUS_CHANGED", EventKind::OrderStatusChanged),
    ("SUBJECT_PRODUCTS_STOCK_LOW", EventKind::LowStock),
    ("SUBJECT_PAYMENTS_CONFIRMED", EventKind::PaymentConfirmed),
    ("SUBJECT_PAYMENTS_FAILED", EventKind::PaymentFailed),
];

/// Default subject registry with any `SUBJECT_*` overrides applied.
pub fn load_subject_map(env: &EnvSource<'_>) -> SubjectMap {
    SUBJECT_OVERRIDES
        .into_iter()
        .fold(SubjectMap::default(), |map, (key, kind)| match env.get(key) {
            Some(subject) => map.with_subject(kind, subject),
            None => map,
        })
}

// ---------------------------------------------------------------------------
// StoreConfig
// ---------------------------------------------------------------------------

/// Sizing and retention of the notification store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub capacity: usize,
    pub retention: chrono::Duration,
    pub cleanup_interval: Duration,
}

impl StoreConfig {
    /// | Env Var                              | Default |
    /// |--------------------------------------|---------|
    /// | `NOTIFICATION_CAPACITY`              | `1000`  |
    /// | `NOTIFICATION_RETENTION_DAYS`        | `7`     |
    /// | `NOTIFICATION_CLEANUP_INTERVAL_SECS` | `3600`  |
    pub fn load(env: &EnvSource<'_>) -> Result<Self, ConfigError> {
        let capacity: usize = env.parse("NOTIFICATION_CAPACITY", 1000)?;
        if capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "NOTIFICATION_CAPACITY",
                value: "0".into(),
                reason: "capacity must be at least 1".into(),
            });
        }
        let retention_days: i64 = env.parse("NOTIFICATION_RETENTION_DAYS", 7)?;
        let retention = chrono::Duration::try_days(retention_days)
            .filter(|_| retention_days >= 1)
            .ok_or_else(|| ConfigError::Invalid {
                key: "NOTIFICATION_RETENTION_DAYS",
                value: retention_days.to_string(),
                reason: "retention must be a positive number of days".into(),
            })?;

        let cleanup_interval = env.secs("NOTIFICATION_CLEANUP_INTERVAL_SECS", 3600)?;
        if cleanup_interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "NOTIFICATION_CLEANUP_INTERVAL_SECS",
                value: "0".into(),
                reason: "cleanup interval must be at least one second".into(),
            });
        }

        Ok(Self {
            capacity,
            retention,
            cleanup_interval,
        })
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            retention: chrono::Duration::days(7),
            cleanup_interval: Duration::from_secs(3600),
        }
    }
}

// ---------------------------------------------------------------------------
// ChannelConfig
// ---------------------------------------------------------------------------

/// Per-channel enablement and parameters for notification fanout.
#[derive(Debug, Clone, Default)]
pub struct ChannelConfig {
    pub email: EmailChannelConfig,
    pub sms: SmsChannelConfig,
    pub push: PushChannelConfig,
}

impl ChannelConfig {
    pub fn load(env: &EnvSource<'_>) -> Result<Self, ConfigError> {
        Ok(Self {
            email: EmailChannelConfig::load(env)?,
            sms: SmsChannelConfig::load(env)?,
            push: PushChannelConfig::load(env)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
