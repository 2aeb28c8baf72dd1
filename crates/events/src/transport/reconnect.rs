//! Bounded reconnection policy for broker connections.
//!
//! The broker client waits [`ReconnectPolicy::wait`] between its own
//! reconnect attempts; [`connect_with_retry`] applies the same policy to
//! the very first connection made at startup.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::TransportError;

/// Bounded number of attempts with a fixed wait between them.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Attempts allowed before the connection is given up.
    pub max_attempts: usize,
    pub wait: Duration,
}

impl ReconnectPolicy {
    pub fn fixed(max_attempts: usize, wait: Duration) -> Self {
        Self { max_attempts, wait }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(60, Duration::from_secs(2))
    }
}

/// Run `connect` until it succeeds, the policy's attempts are used up, or
/// `cancel` fires.
///
/// Returns the last connection error once attempts are exhausted.
pub async fn connect_with_retry<T, F, Fut>(
    policy: &ReconnectPolicy,
    cancel: &CancellationToken,
    mut connect: F,
) -> Result<T, TransportError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0usize;

    loop {
        attempt += 1;

        let result = tokio::select! {
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            result = connect() => result,
        };

        match result {
            Ok(conn) => {
                if attempt > 1 {
                    tracing::info!(attempt, "Broker connection established after retry");
                }
                return Ok(conn);
            }
            Err(e) if attempt >= max_attempts => {
                tracing::error!(attempt, error = %e, "Broker connection attempts exhausted");
                return Err(e);
            }
            Err(e) => {
                let delay = policy.wait;
                tracing::warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Broker connection attempt failed, retrying",
                );

                tokio::select! {
                    _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use assert_matches::assert_matches;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn waits_the_fixed_interval_between_attempts() {
        let calls = AtomicUsize::new(0);
        let policy = ReconnectPolicy::fixed(3, Duration::from_secs(2));
        let cancel = CancellationToken::new();
        let started = tokio::time::Instant::now();

        let calls_ref = &calls;
        let result: Result<(), _> = connect_with_retry(&policy, &cancel, move || async move {
            calls_ref.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Connect("refused".into()))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(started.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let calls = AtomicUsize::new(0);
        let policy = ReconnectPolicy::fixed(5, Duration::from_millis(100));
        let cancel = CancellationToken::new();

        let calls_ref = &calls;
        let result = connect_with_retry(&policy, &cancel, move || async move {
            if calls_ref.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(TransportError::Connect("refused".into()))
            } else {
                Ok("connected")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "connected");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicUsize::new(0);
        let policy = ReconnectPolicy::fixed(3, Duration::from_millis(100));
        let cancel = CancellationToken::new();

        let calls_ref = &calls;
        let result: Result<(), _> = connect_with_retry(&policy, &cancel, move || async move {
            calls_ref.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Connect("refused".into()))
        })
        .await;

        assert_matches!(result, Err(TransportError::Connect(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_stops_retrying() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let policy = ReconnectPolicy::default();
        let result: Result<(), _> = connect_with_retry(&policy, &cancel, || async {
            Err(TransportError::Connect("refused".into()))
        })
        .await;

        assert_matches!(result, Err(TransportError::Cancelled));
    }
}
