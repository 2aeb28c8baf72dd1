//! SMS delivery through an HTTP provider API.
//!
//! The provider endpoint receives a JSON body and authenticates with a
//! bearer API key. A single attempt is made per notification.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::{ChannelError, DeliveryChannel};
use crate::config::{ConfigError, EnvSource};

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_PROVIDER: &str = "twilio";

#[derive(Debug, Clone)]
pub struct SmsChannelConfig {
    pub enabled: bool,
    pub provider: String,
    pub api_key: String,
    pub endpoint: String,
    /// Phone number that receives every notification.
    pub recipient: String,
}

impl SmsChannelConfig {
    /// | Variable        | Default             |
    /// |-----------------|---------------------|
    /// | `SMS_ENABLED`   | `false`             |
    /// | `SMS_PROVIDER`  | `twilio`            |
    /// | `SMS_API_KEY`   | required if enabled |
    /// | `SMS_ENDPOINT`  | required if enabled |
    /// | `SMS_RECIPIENT` | required if enabled |
    pub fn load(env: &EnvSource<'_>) -> Result<Self, ConfigError> {
        let enabled = env.flag("SMS_ENABLED", false)?;
        let required = |key: &'static str| match env.get(key) {
            Some(value) => Ok(value),
            None if enabled => Err(ConfigError::Missing { key, channel: "sms" }),
            None => Ok(String::new()),
        };

        Ok(Self {
            enabled,
            provider: env.string("SMS_PROVIDER", DEFAULT_PROVIDER),
            api_key: required("SMS_API_KEY")?,
            endpoint: required("SMS_ENDPOINT")?,
            recipient: required("SMS_RECIPIENT")?,
        })
    }
}

impl Default for SmsChannelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: DEFAULT_PROVIDER.to_string(),
            api_key: String::new(),
            endpoint: String::new(),
            recipient: String::new(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SmsRequest<'a> {
    provider: &'a str,
    to: &'a str,
    message: &'a str,
    #[serde(rename = "type")]
    notification_type: &'a str,
}

pub struct SmsChannel {
    client: reqwest::Client,
    config: SmsChannelConfig,
}

impl SmsChannel {
    pub fn new(config: SmsChannelConfig) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl DeliveryChannel for SmsChannel {
    fn name(&self) -> &'static str {
        "sms"
    }

    async fn send(&self, message: &str, notification_type: &str) -> Result<(), ChannelError> {
        let body = SmsRequest {
            provider: &self.config.provider,
            to: &self.config.recipient,
            message,
            notification_type,
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ChannelError::HttpStatus(response.status().as_u16()));
        }

        tracing::info!(provider = %self.config.provider, notification_type, "Notification SMS sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
