//! One probing cycle: probe a target on the controller's schedule and
//! forward every verdict to the monitor actor.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::failover::Target;
use crate::monitor::Signal;
use crate::probe::{run_probe, Probe};
use crate::reconnect::{ControllerMode, ReconnectController};
use crate::resilience::backoff::RetryPolicy;

/// What a cycle probes and how often.
#[derive(Debug, Clone)]
pub struct CyclePlan {
    pub id: u64,
    pub mode: ControllerMode,
    pub target: Target,
    pub policy: RetryPolicy,
    /// Spacing between probes while no episode is open.
    pub interval: Duration,
    pub probe_timeout: Duration,
}

/// A running cycle. Dropping the handle ends the task at its next await;
/// call `stop` to also wait for it.
pub struct CycleHandle {
    id: u64,
    mode: ControllerMode,
    target: Target,
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl CycleHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn mode(&self) -> ControllerMode {
        self.mode
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// Stop the cycle and wait for its task to finish. A probe in flight
    /// is abandoned.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            if e.is_panic() {
                tracing::error!(cycle_id = self.id, "Probe cycle panicked");
            }
        }
    }
}

pub fn spawn_cycle(plan: CyclePlan, probe: Arc<dyn Probe>, tx: mpsc::Sender<Signal>) -> CycleHandle {
    let (stop, stop_rx) = watch::channel(false);
    let id = plan.id;
    let mode = plan.mode;
    let target = plan.target;
    let task = tokio::spawn(run_cycle(plan, probe, tx, stop_rx));
    CycleHandle {
        id,
        mode,
        target,
        stop,
        task,
    }
}

async fn run_cycle(
    plan: CyclePlan,
    probe: Arc<dyn Probe>,
    tx: mpsc::Sender<Signal>,
    mut stop: watch::Receiver<bool>,
) {
    let mut controller = match plan.mode {
        ControllerMode::Watch => ReconnectController::new(plan.target, plan.policy.clone()),
        ControllerMode::Failback => {
            ReconnectController::for_failback(plan.target, plan.policy.clone(), Instant::now())
        }
    };

    // Watch cycles probe immediately; failback cycles wait out the first interval.
    let mut next_due = controller.next_attempt_at().unwrap_or_else(Instant::now);

    tracing::info!(cycle_id = plan.id, mode = ?plan.mode, server = %plan.target, "Probe cycle started");

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(next_due.into()) => {}
            _ = stop.changed() => break,
        }

        let result = tokio::select! {
            result = run_probe(probe.as_ref(), plan.target, plan.probe_timeout) => result,
            _ = stop.changed() => break,
        };

        let verdict = match controller.observe(&result) {
            Ok(verdict) => verdict,
            Err(e) => {
                let fault = Signal::Fault {
                    cycle_id: plan.id,
                    message: e.to_string(),
                };
                let _ = deliver(&tx, fault, &mut stop).await;
                break;
            }
        };

        let signal = Signal::Verdict {
            cycle_id: plan.id,
            target: plan.target,
            verdict,
            episode: controller.status(Instant::now()),
        };
        if !deliver(&tx, signal, &mut stop).await {
            break;
        }

        next_due = controller
            .next_attempt_at()
            .unwrap_or_else(|| Instant::now() + plan.interval);
    }

    tracing::debug!(cycle_id = plan.id, server = %plan.target, "Probe cycle stopped");
}

/// Send to the actor unless the cycle is stopped first. The actor waits
/// for a stopping cycle, so a send blocked on a full inbox must give way.
/// Returns false when the cycle should end.
async fn deliver(tx: &mpsc::Sender<Signal>, signal: Signal, stop: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        result = tx.send(signal) => result.is_ok(),
        _ = stop.changed() => false,
    }
}
