//! Read-only view of the monitor, published after every change.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::failover::{Phase, RoutingState, Target, TransitionRecord};
use crate::observability::UptimeStats;
use crate::reconnect::{ControllerMode, EpisodeStatus, VerdictKind};

/// The probing cycle currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleStatus {
    pub mode: ControllerMode,
    pub target: Target,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub phase: Phase,
    pub routing_state: RoutingState,
    pub active_address: String,
    pub auto_failback: bool,
    /// `None` while a switch is in flight, or on backup with failback off.
    pub cycle: Option<CycleStatus>,
    pub episode: Option<EpisodeStatus>,
    pub last_verdict: Option<VerdictKind>,
    pub last_transition: Option<TransitionRecord>,
    pub cooldown_to_backup_secs: Option<u64>,
    pub cooldown_to_primary_secs: Option<u64>,
    pub uptime: UptimeStats,
    pub updated_at: DateTime<Utc>,
}

impl StatusSnapshot {
    /// Snapshot of a monitor that has not probed anything yet.
    pub fn initial(state: RoutingState, active_address: String, auto_failback: bool) -> Self {
        Self {
            phase: Phase::stable(state),
            routing_state: state,
            active_address,
            auto_failback,
            cycle: None,
            episode: None,
            last_verdict: None,
            last_transition: None,
            cooldown_to_backup_secs: None,
            cooldown_to_primary_secs: None,
            uptime: UptimeStats {
                uptime_percentage: 100.0,
                total_downtime_secs: 0,
                failover_count: 0,
                total_incidents: 0,
                currently_down: false,
                tracked_secs: 0,
            },
            updated_at: Utc::now(),
        }
    }

    pub fn is_switching(&self) -> bool {
        self.phase.is_switching()
    }
}
