//! JSON publisher over a [`Transport`].

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::transport::{Transport, TransportError};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to encode event: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode reply: {0}")]
    Decode(#[source] serde_json::Error),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

// ---------------------------------------------------------------------------
// Publisher
// ---------------------------------------------------------------------------

/// Serializes events to JSON and hands them to the transport.
///
/// Cheap to clone; shared by request handlers and background tasks.
#[derive(Clone)]
pub struct Publisher {
    transport: Arc<dyn Transport>,
    request_timeout: Duration,
}

impl Publisher {
    pub fn new(transport: Arc<dyn Transport>, request_timeout: Duration) -> Self {
        Self {
            transport,
            request_timeout,
        }
    }

    pub async fn publish<T: Serialize + ?Sized>(
        &self,
        subject: &str,
        event: &T,
    ) -> Result<(), PublishError> {
        let payload = encode(event)?;
        self.transport.publish(subject, payload).await?;
        tracing::debug!(subject, "Event published");
        Ok(())
    }

    /// Publish `event` and wait for a JSON reply, bounded by the configured
    /// request timeout.
    pub async fn request<T, R>(&self, subject: &str, event: &T) -> Result<R, PublishError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.request_with_timeout(subject, event, self.request_timeout)
            .await
    }

    pub async fn request_with_timeout<T, R>(
        &self,
        subject: &str,
        event: &T,
        timeout: Duration,
    ) -> Result<R, PublishError>
    where
        T: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let payload = encode(event)?;
        let reply = self.transport.request(subject, payload, timeout).await?;
        serde_json::from_slice(&reply).map_err(PublishError::Decode)
    }
}

fn encode<T: Serialize + ?Sized>(event: &T) -> Result<Bytes, PublishError> {
    serde_json::to_vec(event)
        .map(Bytes::from)
        .map_err(PublishError::Encode)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
