//! The monitor actor. Sole owner of the `FailoverMachine`.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Interval;

use crate::config::schema::ServersConfig;
use crate::dns::{AdapterError, DnsSwitch};
use crate::error::{GuardError, GuardResult};
use crate::failover::{
    Decision, Direction, FailoverMachine, RoutingState, SwitchOutcome, Target, TransitionIntent,
};
use crate::monitor::cycle::{spawn_cycle, CycleHandle, CyclePlan};
use crate::monitor::status::{CycleStatus, StatusSnapshot};
use crate::monitor::{ManualSwitchReply, MonitorHandle, MonitorSettings, Signal};
use crate::notifier::{AdapterFailureEvent, EventKind, GuardEvent, NotificationQueue, TransitionEvent};
use crate::observability::{metrics, UptimeTracker};
use crate::probe::Probe;
use crate::reconnect::{ControllerMode, EpisodeStatus, Verdict, VerdictKind};
use crate::resilience::with_deadline;

const INBOX_CAPACITY: usize = 64;

/// Determine where the record points right now. Falls back to the primary
/// when the record cannot be read or matches neither address.
pub async fn resolve_initial_state(dns: &dyn DnsSwitch, timeout: Duration) -> RoutingState {
    match with_deadline(timeout, dns.current_target()).await {
        Ok(Ok(Some(target))) => RoutingState::from_target(target),
        Ok(Ok(None)) => {
            tracing::warn!("DNS record matches neither server, assuming primary");
            RoutingState::OnPrimary
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Could not read DNS record, assuming primary");
            RoutingState::OnPrimary
        }
        Err(e) => {
            tracing::warn!(error = %e, "DNS lookup timed out, assuming primary");
            RoutingState::OnPrimary
        }
    }
}

pub struct Monitor {
    machine: FailoverMachine,
    settings: MonitorSettings,
    servers: ServersConfig,
    probe: Arc<dyn Probe>,
    dns: Arc<dyn DnsSwitch>,
    notifications: NotificationQueue,
    uptime: UptimeTracker,
    inbox: mpsc::Receiver<Signal>,
    inbox_tx: mpsc::Sender<Signal>,
    status_tx: watch::Sender<StatusSnapshot>,
    cycle: Option<CycleHandle>,
    next_cycle_id: u64,
    episode: Option<EpisodeStatus>,
    last_verdict: Option<VerdictKind>,
    /// Directions already alerted as suppressed in the current cooldown window.
    suppression_alerted: HashSet<Direction>,
}

impl Monitor {
    pub fn new(
        initial: RoutingState,
        settings: MonitorSettings,
        servers: ServersConfig,
        probe: Arc<dyn Probe>,
        dns: Arc<dyn DnsSwitch>,
        notifications: NotificationQueue,
    ) -> (Self, MonitorHandle) {
        let (inbox_tx, inbox) = mpsc::channel(INBOX_CAPACITY);
        let active_address = address_for(&servers, initial).to_string();
        let (status_tx, status_rx) = watch::channel(StatusSnapshot::initial(
            initial,
            active_address,
            settings.failover.auto_failback,
        ));

        let monitor = Self {
            machine: FailoverMachine::new(initial, settings.failover.clone()),
            settings,
            servers,
            probe,
            dns,
            notifications,
            uptime: UptimeTracker::new(Instant::now()),
            inbox,
            inbox_tx: inbox_tx.clone(),
            status_tx,
            cycle: None,
            next_cycle_id: 0,
            episode: None,
            last_verdict: None,
            suppression_alerted: HashSet::new(),
        };
        (monitor, MonitorHandle::new(inbox_tx, status_rx))
    }

    /// Run until `shutdown` fires. A switch already in flight completes
    /// before shutdown is observed.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) -> GuardResult<()> {
        tracing::info!(routing_state = %self.machine.routing_state(), "Monitor started");
        metrics::record_routing_state(self.machine.routing_state());
        self.start_cycle();
        self.publish_status();

        let mut housekeeping = tokio::time::interval(self.settings.check_interval);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Monitor shutting down");
                    break;
                }
                Some(signal) = self.inbox.recv() => {
                    if let Err(e) = self.handle(signal).await {
                        self.recover(e).await?;
                    }
                    retime(&mut housekeeping, self.settings.check_interval);
                }
                _ = housekeeping.tick() => {
                    if let Err(e) = self.machine.check_stuck(Instant::now()) {
                        self.recover(e).await?;
                    }
                    self.publish_status();
                }
            }
        }

        self.stop_cycle().await;
        self.publish_status();
        Ok(())
    }

    async fn handle(&mut self, signal: Signal) -> GuardResult<()> {
        match signal {
            Signal::Verdict {
                cycle_id,
                target,
                verdict,
                episode,
            } => {
                if self.cycle.as_ref().map(|c| c.id()) != Some(cycle_id) {
                    tracing::debug!(cycle_id, "Dropping verdict from a stopped cycle");
                    return Ok(());
                }
                self.on_verdict(target, verdict, episode).await
            }
            Signal::Fault { cycle_id, message } => {
                if self.cycle.as_ref().map(|c| c.id()) != Some(cycle_id) {
                    return Ok(());
                }
                Err(GuardError::invalid_state(message))
            }
            Signal::ManualSwitch { to, reply } => match self.on_manual_switch(to).await {
                Ok(result) => {
                    let _ = reply.send(result);
                    Ok(())
                }
                Err(e) => {
                    let _ = reply.send(ManualSwitchReply {
                        accepted: false,
                        applied: false,
                        routing_state: self.machine.routing_state(),
                        message: e.to_string(),
                    });
                    Err(e)
                }
            },
            Signal::Reload(settings) => {
                self.apply_settings(*settings).await;
                Ok(())
            }
        }
    }

    async fn on_verdict(
        &mut self,
        target: Target,
        verdict: Verdict,
        episode: Option<EpisodeStatus>,
    ) -> GuardResult<()> {
        let now = Instant::now();
        let state = self.machine.routing_state();
        self.episode = episode;
        self.last_verdict = Some(verdict.kind());
        metrics::record_verdict(target, verdict.kind());

        if target == Target::Primary && state == RoutingState::OnPrimary {
            match verdict {
                Verdict::Exhausted { attempts, elapsed } => {
                    // One alert per outage, not per exhausted episode.
                    if !self.uptime.stats(now).currently_down {
                        self.uptime.record_downtime_start(now);
                        self.notify(EventKind::PrimaryUnreachable {
                            attempts,
                            elapsed_secs: elapsed.as_secs(),
                        });
                    }
                }
                Verdict::Recovered { attempts, elapsed } if self.uptime.stats(now).currently_down => {
                    // Down long enough to be declared unreachable, but no failover happened.
                    self.uptime.record_downtime_end(now);
                    self.notify(EventKind::PrimaryRecovered {
                        attempts,
                        elapsed_secs: elapsed.as_secs(),
                    });
                }
                Verdict::Healthy | Verdict::Recovered { .. } => self.uptime.record_downtime_end(now),
                Verdict::StillTrying { .. } => {}
            }
        }

        match self.machine.on_verdict(target, &verdict, now)? {
            Decision::Noop => self.publish_status(),
            Decision::Suppressed { direction, remaining } => {
                if self.suppression_alerted.insert(direction) {
                    self.notify(EventKind::SwitchSuppressed {
                        to: direction_target(direction),
                        remaining_secs: remaining.as_secs(),
                    });
                } else {
                    tracing::debug!(to = %direction_target(direction), "Switch still suppressed");
                }
                self.publish_status();
            }
            Decision::Switch(intent) => {
                self.execute(intent).await?;
            }
        }
        Ok(())
    }

    async fn on_manual_switch(&mut self, to: RoutingState) -> GuardResult<ManualSwitchReply> {
        let now = Instant::now();
        let decision = self.machine.request_switch(to, "manual request", now)?;
        let Decision::Switch(intent) = decision else {
            let message = if self.machine.phase().is_switching() {
                "a switch is already in progress".to_string()
            } else {
                format!("already {}", self.machine.routing_state())
            };
            return Ok(ManualSwitchReply {
                accepted: false,
                applied: false,
                routing_state: self.machine.routing_state(),
                message,
            });
        };

        tracing::info!(intent_id = %intent.id, to = %to, "Manual switch requested");
        let applied = self.execute(intent).await?;
        let routing_state = self.machine.routing_state();
        Ok(ManualSwitchReply {
            accepted: true,
            applied,
            routing_state,
            message: if applied {
                format!("switched to {}", routing_state)
            } else {
                format!("DNS update failed, staying {}", routing_state)
            },
        })
    }

    /// Apply a switch. Returns whether the record now points at the intent's target.
    async fn execute(&mut self, intent: TransitionIntent) -> GuardResult<bool> {
        self.stop_cycle().await;
        self.publish_status();

        let timeout = self.settings.adapter_timeout;
        let outcome = match with_deadline(timeout, self.dns.apply(&intent)).await {
            Ok(result) => result,
            Err(_) => Err(AdapterError::Timeout(timeout)),
        };

        let now = Instant::now();
        let outcome = self.machine.on_switch_outcome(intent.id, outcome, now)?;
        if !matches!(outcome, SwitchOutcome::Duplicate) {
            // A completed switch opens a fresh cooldown window.
            self.suppression_alerted.clear();
        }
        let applied = match outcome {
            SwitchOutcome::Applied(intent) => {
                if let Some(direction) = intent.direction() {
                    metrics::record_switch(direction, true);
                }
                match intent.to {
                    RoutingState::OnBackup => self.uptime.record_failover(),
                    RoutingState::OnPrimary => self.uptime.record_downtime_end(now),
                }
                self.notify(EventKind::Transition(TransitionEvent::from(&intent)));
                true
            }
            SwitchOutcome::RolledBack { intent, error } => {
                if let Some(direction) = intent.direction() {
                    metrics::record_switch(direction, false);
                }
                self.notify(EventKind::AdapterFailure(AdapterFailureEvent {
                    intent_id: intent.id,
                    from: intent.from,
                    to: intent.to,
                    error: error.to_string(),
                }));
                false
            }
            SwitchOutcome::Duplicate => false,
        };

        metrics::record_routing_state(self.machine.routing_state());
        self.start_cycle();
        self.publish_status();
        Ok(applied)
    }

    /// Restart monitoring from the live DNS record after an invariant
    /// violation. Only non-recoverable errors are returned.
    async fn recover(&mut self, error: GuardError) -> GuardResult<()> {
        if !error.is_invalid_state() {
            return Err(error);
        }
        tracing::error!(error = %error, "Monitor invariant violated, resynchronising from DNS");

        self.stop_cycle().await;
        let state = resolve_initial_state(self.dns.as_ref(), self.settings.adapter_timeout).await;
        self.machine.reset(state);
        metrics::record_routing_state(state);
        self.notify(EventKind::InvalidState {
            message: error.to_string(),
        });
        self.start_cycle();
        self.publish_status();
        Ok(())
    }

    async fn apply_settings(&mut self, settings: MonitorSettings) {
        if settings == self.settings {
            tracing::debug!("Monitor settings unchanged");
            return;
        }
        tracing::info!(
            max_retries = settings.retry_policy.max_retries,
            cooldown_secs = settings.failover.cooldown.as_secs(),
            auto_failback = settings.failover.auto_failback,
            "Applying new monitor settings"
        );
        self.machine.update_settings(settings.failover.clone());
        self.settings = settings;

        // A switch in flight restarts its cycle once it completes.
        if !self.machine.phase().is_switching() {
            self.stop_cycle().await;
            self.start_cycle();
        }
        self.publish_status();
    }

    /// Start the cycle matching the current phase: watch the primary while
    /// on it, probe for failback while on the backup.
    fn start_cycle(&mut self) {
        if self.cycle.is_some() || self.machine.phase().is_switching() {
            return;
        }

        let plan = match self.machine.routing_state() {
            RoutingState::OnPrimary => CyclePlan {
                id: self.next_cycle_id,
                mode: ControllerMode::Watch,
                target: Target::Primary,
                policy: self.settings.retry_policy.clone(),
                interval: self.settings.check_interval,
                probe_timeout: self.settings.probe_timeout,
            },
            RoutingState::OnBackup if self.settings.failover.auto_failback => CyclePlan {
                id: self.next_cycle_id,
                mode: ControllerMode::Failback,
                target: Target::Primary,
                policy: self.settings.failback_policy.clone(),
                interval: self.settings.failback_policy.interval,
                probe_timeout: self.settings.probe_timeout,
            },
            RoutingState::OnBackup => {
                tracing::info!("Automatic failback disabled, staying on backup until a manual failback");
                return;
            }
        };

        self.next_cycle_id += 1;
        self.episode = None;
        self.cycle = Some(spawn_cycle(plan, self.probe.clone(), self.inbox_tx.clone()));
    }

    async fn stop_cycle(&mut self) {
        if let Some(cycle) = self.cycle.take() {
            cycle.stop().await;
        }
        self.episode = None;
    }

    fn notify(&self, kind: EventKind) {
        let state = self.machine.routing_state();
        self.notifications.publish(GuardEvent {
            kind,
            routing_state: state,
            active_address: address_for(&self.servers, state).to_string(),
            uptime_percentage: self.uptime.uptime_percentage(Instant::now()),
            timestamp: Utc::now(),
        });
    }

    fn publish_status(&self) {
        let now = Instant::now();
        let state = self.machine.routing_state();
        let snapshot = StatusSnapshot {
            phase: self.machine.phase(),
            routing_state: state,
            active_address: address_for(&self.servers, state).to_string(),
            auto_failback: self.settings.failover.auto_failback,
            cycle: self.cycle.as_ref().map(|c| CycleStatus {
                mode: c.mode(),
                target: c.target(),
            }),
            episode: self.episode.clone(),
            last_verdict: self.last_verdict,
            last_transition: self.machine.last_transition().cloned(),
            cooldown_to_backup_secs: self
                .machine
                .cooldown_remaining(Direction::ToBackup, now)
                .map(|d| d.as_secs()),
            cooldown_to_primary_secs: self
                .machine
                .cooldown_remaining(Direction::ToPrimary, now)
                .map(|d| d.as_secs()),
            uptime: self.uptime.stats(now),
            updated_at: Utc::now(),
        };
        self.status_tx.send_replace(snapshot);
    }
}

/// Rebuild the housekeeping interval when the configured period changed.
fn retime(housekeeping: &mut Interval, period: Duration) -> bool {
    if housekeeping.period() == period {
        return false;
    }
    tracing::debug!(period_ms = period.as_millis() as u64, "Housekeeping interval changed");
    *housekeeping = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    true
}

fn address_for(servers: &ServersConfig, state: RoutingState) -> &str {
    match state {
        RoutingState::OnPrimary => &servers.primary_address,
        RoutingState::OnBackup => &servers.backup_address,
    }
}

fn direction_target(direction: Direction) -> RoutingState {
    match direction {
        Direction::ToBackup => RoutingState::OnBackup,
        Direction::ToPrimary => RoutingState::OnPrimary,
    }
}
