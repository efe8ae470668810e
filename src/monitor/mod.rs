//! Monitor loop.
//!
//! # Data Flow
//! ```text
//! cycle.rs (one tokio task per probing cycle)
//!     → run_probe → ReconnectController::observe
//!     → Signal::Verdict over mpsc
//! actor.rs (single owner of the FailoverMachine)
//!     → FailoverMachine::on_verdict
//!     → DnsSwitch::apply → on_switch_outcome
//!     → NotificationQueue::publish
//!     → status.rs snapshot over watch
//! ```
//!
//! # Design Decisions
//! - Single writer: only the actor touches the state machine
//! - At most one probing cycle at a time (watch XOR failback)
//! - Verdicts from a stopped cycle are recognised by id and dropped
//! - A switch in flight is completed before shutdown is observed

pub mod actor;
pub mod cycle;
pub mod status;

use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

use crate::config::schema::GuardConfig;
use crate::error::{GuardError, GuardResult};
use crate::failover::machine::FailoverSettings;
use crate::failover::types::{RoutingState, Target};
use crate::reconnect::{EpisodeStatus, Verdict};
use crate::resilience::backoff::RetryPolicy;

pub use actor::{resolve_initial_state, Monitor};
pub use status::StatusSnapshot;

/// Runtime settings of the monitor, derived from `GuardConfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Probe spacing while the primary is healthy.
    pub check_interval: Duration,
    /// Spacing and budget while the primary is failing.
    pub retry_policy: RetryPolicy,
    /// Spacing and budget of the failback cycle.
    pub failback_policy: RetryPolicy,
    pub failover: FailoverSettings,
    pub probe_timeout: Duration,
    pub adapter_timeout: Duration,
}

impl MonitorSettings {
    pub fn from_config(config: &GuardConfig) -> Self {
        let monitor = &config.monitor;
        let failback_interval = Duration::from_secs(monitor.failback_retry_interval_secs);
        Self {
            check_interval: Duration::from_secs(monitor.check_interval_secs),
            retry_policy: RetryPolicy {
                max_retries: monitor.max_retries,
                interval: Duration::from_millis(monitor.retry_interval_ms),
                escalation: monitor.retry_escalation,
                max_interval: Duration::from_millis(monitor.max_retry_interval_ms),
                jitter: monitor.retry_jitter,
            },
            failback_policy: RetryPolicy::fixed(monitor.max_retries, failback_interval),
            failover: FailoverSettings {
                cooldown: Duration::from_secs(monitor.cooldown_secs),
                switch_timeout: Duration::from_secs(monitor.switch_timeout_secs),
                auto_failback: monitor.auto_failback,
            },
            probe_timeout: Duration::from_secs(config.probe.timeout_secs),
            adapter_timeout: Duration::from_secs(config.dns.adapter_timeout_secs),
        }
    }
}

/// Reply to a manual switch request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ManualSwitchReply {
    /// Whether a switch was started.
    pub accepted: bool,
    /// Whether the DNS record now points at the requested target.
    pub applied: bool,
    pub routing_state: RoutingState,
    pub message: String,
}

/// Messages into the monitor actor.
#[derive(Debug)]
pub enum Signal {
    /// A probing cycle classified a probe.
    Verdict {
        cycle_id: u64,
        target: Target,
        verdict: Verdict,
        episode: Option<EpisodeStatus>,
    },
    /// A probing cycle hit an invariant violation and stopped.
    Fault { cycle_id: u64, message: String },
    /// Operator-requested switch.
    ManualSwitch {
        to: RoutingState,
        reply: oneshot::Sender<ManualSwitchReply>,
    },
    /// New settings from a config reload.
    Reload(Box<MonitorSettings>),
}

/// Handle for talking to a running monitor. Read-only apart from
/// requests, which the actor may refuse.
#[derive(Clone)]
pub struct MonitorHandle {
    tx: mpsc::Sender<Signal>,
    status: watch::Receiver<StatusSnapshot>,
}

impl MonitorHandle {
    pub(crate) fn new(tx: mpsc::Sender<Signal>, status: watch::Receiver<StatusSnapshot>) -> Self {
        Self { tx, status }
    }

    /// Latest published status.
    pub fn status(&self) -> StatusSnapshot {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.status.clone()
    }

    /// Ask the actor to switch the record to `to` and wait for the outcome.
    pub async fn request_switch(&self, to: RoutingState) -> GuardResult<ManualSwitchReply> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Signal::ManualSwitch { to, reply })
            .await
            .map_err(|_| GuardError::MonitorStopped)?;
        rx.await.map_err(|_| GuardError::MonitorStopped)
    }

    pub async fn reload(&self, settings: MonitorSettings) -> GuardResult<()> {
        self.tx
            .send(Signal::Reload(Box::new(settings)))
            .await
            .map_err(|_| GuardError::MonitorStopped)
    }
}
