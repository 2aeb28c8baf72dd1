//! One cancellable worker per subscribed subject.
//!
//! Each worker waits for the transport to be connected, subscribes, then
//! polls for messages with a bounded timeout and hands every message to the
//! [`EventHandler`]. A failing or panicking handler is logged and the loop
//! carries on; a subscription whose stream ends is re-established. Workers
//! stop when the manager's cancellation token fires.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use minishop_core::{EventKind, SubjectMap};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::dispatcher::{DomainEvent, EventHandler};
use crate::transport::{ConnectionState, InboundMessage, Transport, TransportError};

/// How long a worker waits for the next message before checking for
/// cancellation again.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause between readiness checks while the transport is not connected.
pub const DEFAULT_READINESS_INTERVAL: Duration = Duration::from_millis(100);

struct Worker {
    subject: String,
    handle: JoinHandle<()>,
}

/// Everything a worker task needs, cloned out of the manager.
#[derive(Clone)]
struct WorkerContext {
    transport: Arc<dyn Transport>,
    cancel: CancellationToken,
    poll_timeout: Duration,
    readiness_interval: Duration,
}

pub struct SubscriptionManager {
    ctx: WorkerContext,
    workers: Mutex<Vec<Worker>>,
}

impl SubscriptionManager {
    pub fn new(transport: Arc<dyn Transport>, cancel: CancellationToken) -> Self {
        Self::with_timing(transport, cancel, DEFAULT_POLL_TIMEOUT, DEFAULT_READINESS_INTERVAL)
    }

    pub fn with_timing(
        transport: Arc<dyn Transport>,
        cancel: CancellationToken,
        poll_timeout: Duration,
        readiness_interval: Duration,
    ) -> Self {
        Self {
            ctx: WorkerContext {
                transport,
                cancel,
                poll_timeout,
                readiness_interval,
            },
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Spawn a worker that feeds every message on `subject` to `handler`
    /// as an event of `kind`.
    pub fn start_listening(
        &self,
        subject: impl Into<String>,
        kind: EventKind,
        handler: Arc<dyn EventHandler>,
    ) {
        let subject = subject.into();
        let ctx = self.ctx.clone();
        let handle = tokio::spawn(run_worker(ctx, subject.clone(), kind, handler));
        self.workers.lock().push(Worker { subject, handle });
    }

    /// One worker per route in `subjects`.
    pub fn start_all(&self, subjects: &SubjectMap, handler: Arc<dyn EventHandler>) {
        for route in subjects.routes() {
            self.start_listening(route.subject.clone(), route.kind.clone(), Arc::clone(&handler));
        }
        tracing::info!(workers = self.worker_count(), "Subscription workers started");
    }

    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    /// Cancel every worker and wait up to `timeout` for each to finish.
    pub async fn shutdown(&self, timeout: Duration) {
        tracing::info!("Shutting down subscription workers");
        self.ctx.cancel.cancel();

        let workers = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            if tokio::time::timeout(timeout, worker.handle).await.is_err() {
                tracing::warn!(subject = %worker.subject, "Worker did not stop in time");
            }
        }

        tracing::info!("Subscription workers stopped");
    }
}

// ---------------------------------------------------------------------------
// Worker loop
// ---------------------------------------------------------------------------

enum Outcome {
    Cancelled,
    /// The subscription ended; subscribe again.
    Resubscribe,
}

async fn run_worker(
    ctx: WorkerContext,
    subject: String,
    kind: EventKind,
    handler: Arc<dyn EventHandler>,
) {
    loop {
        if !wait_until_connected(&ctx).await {
            break;
        }

        let subscription = match ctx.transport.subscribe(&subject).await {
            Ok(subscription) => subscription,
            Err(TransportError::Closed) => break,
            Err(e) => {
                tracing::warn!(subject = %subject, error = %e, "Subscribe failed, retrying");
                if !pause(&ctx).await {
                    break;
                }
                continue;
            }
        };

        tracing::info!(subject = %subject, kind = %kind, "Listening");

        match poll_messages(&ctx, subscription, &kind, handler.as_ref()).await {
            Outcome::Cancelled => break,
            Outcome::Resubscribe => {
                tracing::warn!(subject = %subject, "Subscription closed, resubscribing");
            }
        }
    }

    tracing::debug!(subject = %subject, "Worker stopped");
}

async fn poll_messages(
    ctx: &WorkerContext,
    mut subscription: crate::transport::Subscription,
    kind: &EventKind,
    handler: &dyn EventHandler,
) -> Outcome {
    loop {
        let next = tokio::select! {
            _ = ctx.cancel.cancelled() => return Outcome::Cancelled,
            next = subscription.next_message(ctx.poll_timeout) => next,
        };

        match next {
            Ok(Some(message)) => handle_message(message, kind, handler),
            Ok(None) => {}
            Err(TransportError::SubscriptionClosed(_)) => return Outcome::Resubscribe,
            Err(e) => {
                tracing::warn!(subject = %subscription.subject(), error = %e, "Poll failed");
            }
        }
    }
}

fn handle_message(message: InboundMessage, kind: &EventKind, handler: &dyn EventHandler) {
    let subject = message.subject.clone();
    let event = DomainEvent {
        kind: kind.clone(),
        payload: message.payload,
        subject: message.subject,
    };

    match std::panic::catch_unwind(AssertUnwindSafe(|| handler.handle(event))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(subject = %subject, error = %e, "Dropping message that failed to handle");
        }
        Err(_) => {
            tracing::error!(subject = %subject, "Event handler panicked, message dropped");
        }
    }
}

/// Sleep until the transport reports connected. Returns `false` when the
/// worker should stop instead.
async fn wait_until_connected(ctx: &WorkerContext) -> bool {
    loop {
        match ctx.transport.monitor().state() {
            ConnectionState::Connected => return true,
            ConnectionState::Closed => return false,
            ConnectionState::Pending | ConnectionState::Disconnected => {
                if !pause(ctx).await {
                    return false;
                }
            }
        }
    }
}

/// Sleep for the readiness interval. Returns `false` if cancelled.
async fn pause(ctx: &WorkerContext) -> bool {
    tokio::select! {
        _ = ctx.cancel.cancelled() => false,
        _ = tokio::time::sleep(ctx.readiness_interval) => true,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
