//! Push delivery through the FCM legacy HTTP API.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::{ChannelError, DeliveryChannel};
use crate::config::{ConfigError, EnvSource};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_PUSH_ENDPOINT: &str = "https://fcm.googleapis.com/fcm/send";

const DEFAULT_TOPIC: &str = "notifications";

#[derive(Debug, Clone)]
pub struct PushChannelConfig {
    pub enabled: bool,
    pub server_key: String,
    pub endpoint: String,
    /// Topic every notification is published to.
    pub topic: String,
}

impl PushChannelConfig {
    /// | Variable          | Default                               |
    /// |-------------------|---------------------------------------|
    /// | `PUSH_ENABLED`    | `false`                               |
    /// | `PUSH_SERVER_KEY` | required if enabled                   |
    /// | `PUSH_ENDPOINT`   | `https://fcm.googleapis.com/fcm/send` |
    /// | `PUSH_TOPIC`      | `notifications`                       |
    pub fn load(env: &EnvSource<'_>) -> Result<Self, ConfigError> {
        let enabled = env.flag("PUSH_ENABLED", false)?;
        let server_key = match env.get("PUSH_SERVER_KEY") {
            Some(key) => key,
            None if enabled => {
                return Err(ConfigError::Missing {
                    key: "PUSH_SERVER_KEY",
                    channel: "push",
                })
            }
            None => String::new(),
        };

        Ok(Self {
            enabled,
            server_key,
            endpoint: env.string("PUSH_ENDPOINT", DEFAULT_PUSH_ENDPOINT),
            topic: env.string("PUSH_TOPIC", DEFAULT_TOPIC),
        })
    }
}

impl Default for PushChannelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            server_key: String::new(),
            endpoint: DEFAULT_PUSH_ENDPOINT.to_string(),
            topic: DEFAULT_TOPIC.to_string(),
        }
    }
}

pub struct PushChannel {
    client: reqwest::Client,
    config: PushChannelConfig,
}

impl PushChannel {
    pub fn new(config: PushChannelConfig) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    fn payload(&self, message: &str, notification_type: &str) -> serde_json::Value {
        json!({
            "to": format!("/topics/{}", self.config.topic),
            "notification": {
                "title": notification_type,
                "body": message,
            },
            "data": { "type": notification_type },
        })
    }
}

#[async_trait]
impl DeliveryChannel for PushChannel {
    fn name(&self) -> &'static str {
        "push"
    }

    async fn send(&self, message: &str, notification_type: &str) -> Result<(), ChannelError> {
        let response = self
            .client
            .post(&self.config.endpoint)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("key={}", self.config.server_key),
            )
            .json(&self.payload(message, notification_type))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ChannelError::HttpStatus(response.status().as_u16()));
        }

        tracing::info!(topic = %self.config.topic, notification_type, "Push notification sent");
        Ok(())
    }
}
