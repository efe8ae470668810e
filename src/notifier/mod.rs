//! Operator notification subsystem.
//!
//! # Data Flow
//! ```text
//! Monitor actor
//!     → NotificationQueue::publish (never blocks)
//!     → queue.rs worker task
//!     → Notifier::send (webhook.rs / LogNotifier) with a deadline
//!     → failures logged and counted, never reported back
//! ```
//!
//! # Design Decisions
//! - Routing decisions never wait on an alert
//! - A failed alert is not retried; the next event carries the current state
//! - Events are self-contained so the webhook needs no access to the monitor

pub mod queue;
pub mod webhook;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::failover::types::{RoutingState, TransitionIntent};

pub use queue::{NotificationQueue, NotificationWorker};
pub use webhook::WebhookNotifier;

/// Errors delivering a notification.
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Notification timed out after {0:?}")]
    Timeout(Duration),
}

/// A completed routing switch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransitionEvent {
    pub intent_id: Uuid,
    pub from: RoutingState,
    pub to: RoutingState,
    pub reason: String,
}

impl From<&TransitionIntent> for TransitionEvent {
    fn from(intent: &TransitionIntent) -> Self {
        Self {
            intent_id: intent.id,
            from: intent.from,
            to: intent.to,
            reason: intent.reason.clone(),
        }
    }
}

/// A switch the DNS adapter could not apply.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdapterFailureEvent {
    pub intent_id: Uuid,
    pub from: RoutingState,
    pub to: RoutingState,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    PrimaryUnreachable { attempts: u32, elapsed_secs: u64 },
    PrimaryRecovered { attempts: u32, elapsed_secs: u64 },
    SwitchSuppressed { to: RoutingState, remaining_secs: u64 },
    Transition(TransitionEvent),
    AdapterFailure(AdapterFailureEvent),
    InvalidState { message: String },
}

/// One notification, with enough context to render on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuardEvent {
    pub kind: EventKind,
    pub routing_state: RoutingState,
    pub active_address: String,
    pub uptime_percentage: f64,
    pub timestamp: DateTime<Utc>,
}

impl GuardEvent {
    pub fn title(&self) -> &'static str {
        match &self.kind {
            EventKind::PrimaryUnreachable { .. } => "Primary unreachable",
            EventKind::PrimaryRecovered { .. } => "Primary recovered",
            EventKind::SwitchSuppressed { .. } => "Switch suppressed",
            EventKind::Transition(t) if t.to == RoutingState::OnBackup => "Failover activated",
            EventKind::Transition(_) => "Recovery completed",
            EventKind::AdapterFailure(_) => "DNS update failed",
            EventKind::InvalidState { .. } => "Monitor restarted",
        }
    }

    pub fn description(&self) -> String {
        match &self.kind {
            EventKind::PrimaryUnreachable { attempts, elapsed_secs } => format!(
                "Primary failed {} consecutive checks over {}s",
                attempts, elapsed_secs
            ),
            EventKind::PrimaryRecovered { attempts, elapsed_secs } => format!(
                "Primary reachable again after {} failed checks over {}s",
                attempts, elapsed_secs
            ),
            EventKind::SwitchSuppressed { to, remaining_secs } => format!(
                "Switch to {} held back, cooldown ends in {}s",
                to, remaining_secs
            ),
            EventKind::Transition(t) => format!("Switched {} -> {}: {}", t.from, t.to, t.reason),
            EventKind::AdapterFailure(f) => format!(
                "Could not switch {} -> {}: {}. Staying on {}",
                f.from, f.to, f.error, f.from
            ),
            EventKind::InvalidState { message } => format!(
                "Monitoring restarted from the live DNS record: {}",
                message
            ),
        }
    }

    /// Whether the event needs operator attention.
    pub fn is_alert(&self) -> bool {
        matches!(
            self.kind,
            EventKind::AdapterFailure(_) | EventKind::InvalidState { .. } | EventKind::PrimaryUnreachable { .. }
        )
    }
}

/// Delivers notifications to operators.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, event: &GuardEvent) -> Result<(), NotifierError>;
}

/// Notifier that only writes to the log. Used when no webhook is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, event: &GuardEvent) -> Result<(), NotifierError> {
        if event.is_alert() {
            tracing::warn!(title = event.title(), routing_state = %event.routing_state, "{}", event.description());
        } else {
            tracing::info!(title = event.title(), routing_state = %event.routing_state, "{}", event.description());
        }
        Ok(())
    }
}
