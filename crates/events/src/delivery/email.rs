//! Email delivery via SMTP.
//!
//! [`EmailChannel`] wraps the `lettre` async SMTP transport and sends one
//! plain-text email per notification to a fixed recipient.

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{ChannelError, DeliveryChannel};
use crate::config::{ConfigError, EnvSource};

// ---------------------------------------------------------------------------
// EmailChannelConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

const DEFAULT_SMTP_HOST: &str = "localhost";

const DEFAULT_FROM_ADDRESS: &str = "noreply@minishop.com";

#[derive(Debug, Clone)]
pub struct EmailChannelConfig {
    pub enabled: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub to_address: String,
}

impl EmailChannelConfig {
    /// | Variable        | Default                |
    /// |-----------------|------------------------|
    /// | `EMAIL_ENABLED` | `false`                |
    /// | `SMTP_HOST`     | `localhost`            |
    /// | `SMTP_PORT`     | `587`                  |
    /// | `SMTP_USER`     | none                   |
    /// | `SMTP_PASSWORD` | none                   |
    /// | `EMAIL_FROM`    | `noreply@minishop.com` |
    /// | `EMAIL_TO`      | same as `EMAIL_FROM`   |
    pub fn load(env: &EnvSource<'_>) -> Result<Self, ConfigError> {
        let from_address = env.string("EMAIL_FROM", DEFAULT_FROM_ADDRESS);
        Ok(Self {
            enabled: env.flag("EMAIL_ENABLED", false)?,
            smtp_host: env.string("SMTP_HOST", DEFAULT_SMTP_HOST),
            smtp_port: env.parse("SMTP_PORT", DEFAULT_SMTP_PORT)?,
            smtp_user: env.get("SMTP_USER"),
            smtp_password: env.get("SMTP_PASSWORD"),
            to_address: env.string("EMAIL_TO", &from_address),
            from_address,
        })
    }
}

impl Default for EmailChannelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: DEFAULT_SMTP_HOST.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_user: None,
            smtp_password: None,
            from_address: DEFAULT_FROM_ADDRESS.to_string(),
            to_address: DEFAULT_FROM_ADDRESS.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// EmailChannel
// ---------------------------------------------------------------------------

pub struct EmailChannel {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailChannel {
    /// Parse the addresses and build the SMTP transport. No connection is
    /// made until the first send.
    pub fn new(config: EmailChannelConfig) -> Result<Self, ChannelError> {
        let from: Mailbox = config.from_address.parse()?;
        let to: Mailbox = config.to_address.parse()?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);
        if let (Some(user), Some(pass)) = (config.smtp_user, config.smtp_password) {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            mailer: builder.build(),
            from,
            to,
        })
    }

    fn build_message(&self, message: &str, notification_type: &str) -> Result<Message, ChannelError> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(format!("[MiniShop] {notification_type}"))
            .header(ContentType::TEXT_PLAIN)
            .body(message.to_string())
            .map_err(|e| ChannelError::Build(e.to_string()))
    }
}

#[async_trait]
impl DeliveryChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, message: &str, notification_type: &str) -> Result<(), ChannelError> {
        let email = self.build_message(message, notification_type)?;
        self.mailer.send(email).await?;

        tracing::info!(to = %self.to, notification_type, "Notification email sent");
        Ok(())
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
    fn recipient_defaults_to_sender() {
        let pairs = [("EMAIL_ENABLED", "true"), ("EMAIL_FROM", "ops@shop.test")];
        let config = EmailChannelConfig::load(&EnvSource::from_pairs(&pairs)).unwrap();

        assert!(config.enabled);
        assert_eq!(config.to_address, "ops@shop.test");
        assert_eq!(config.smtp_port, 587);
    }

    #[test]
    fn disabled_by_default() {
        let config = EmailChannelConfig::load(&EnvSource::from_pairs(&[])).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.smtp_host, "localhost");
    }

    #[test]
    fn bad_address_is_rejected_at_construction() {
        let config = EmailChannelConfig {
            to_address: "not-an-email".into(),
            ..Default::default()
        };
        assert_matches!(EmailChannel::new(config).err(), Some(ChannelError::Address(_)));
    }

    #[test]
    fn message_carries_type_in_subject() {
        let channel = EmailChannel::new(EmailChannelConfig::default()).unwrap();
        let email = channel.build_message("Order 1 created", "ORDER_CREATED").unwrap();

        let raw = String::from_utf8(email.formatted()).unwrap();
        assert!(raw.contains("Subject: [MiniShop] ORDER_CREATED"));
        assert!(raw.contains("Order 1 created"));
    }
}
