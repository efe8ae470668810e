//! Outbound notification queue.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::notifier::{GuardEvent, Notifier, NotifierError};
use crate::observability::metrics;
use crate::resilience::timeouts::with_deadline;

/// Sending half of the queue. Cheap to clone; `publish` never waits.
#[derive(Clone)]
pub struct NotificationQueue {
    tx: mpsc::UnboundedSender<GuardEvent>,
}

/// The task delivering queued events.
pub struct NotificationWorker {
    handle: JoinHandle<()>,
}

impl NotificationQueue {
    /// Start a worker delivering events through `notifier`.
    pub fn spawn(notifier: Arc<dyn Notifier>, send_timeout: Duration) -> (Self, NotificationWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(deliver(rx, notifier, send_timeout));
        (Self { tx }, NotificationWorker { handle })
    }

    /// Queue an event. Delivery happens later; failures are only logged.
    pub fn publish(&self, event: GuardEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("Notification worker stopped, dropping event");
        }
    }
}

impl NotificationWorker {
    /// Wait for queued events to go out once every queue handle is dropped.
    pub async fn drain(self, timeout: Duration) {
        let abort = self.handle.abort_handle();
        if with_deadline(timeout, self.handle).await.is_err() {
            tracing::warn!(timeout_secs = timeout.as_secs(), "Notification drain timed out");
            abort.abort();
        }
    }
}

async fn deliver(mut rx: mpsc::UnboundedReceiver<GuardEvent>, notifier: Arc<dyn Notifier>, send_timeout: Duration) {
    while let Some(event) = rx.recv().await {
        let result = match with_deadline(send_timeout, notifier.send(&event)).await {
            Ok(result) => result,
            Err(_) => Err(NotifierError::Timeout(send_timeout)),
        };

        match result {
            Ok(()) => {
                metrics::record_notification(true);
                tracing::debug!(title = event.title(), "Notification delivered");
            }
            Err(e) => {
                metrics::record_notification(false);
                tracing::error!(title = event.title(), error = %e, "Notification failed");
            }
        }
    }
    tracing::debug!("Notification worker exiting");
}
