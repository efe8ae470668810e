//! Routing types shared by the decision engine and its collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// One of the two servers traffic can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Primary,
    Backup,
}

impl Target {
    pub fn as_str(&self) -> &'static str {
        match self {
            Target::Primary => "primary",
            Target::Backup => "backup",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the DNS record currently points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingState {
    OnPrimary,
    OnBackup,
}

impl RoutingState {
    /// The server receiving traffic in this state.
    pub fn target(&self) -> Target {
        match self {
            RoutingState::OnPrimary => Target::Primary,
            RoutingState::OnBackup => Target::Backup,
        }
    }

    pub fn from_target(target: Target) -> Self {
        match target {
            Target::Primary => RoutingState::OnPrimary,
            Target::Backup => RoutingState::OnBackup,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingState::OnPrimary => "on_primary",
            RoutingState::OnBackup => "on_backup",
        }
    }
}

impl fmt::Display for RoutingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a routing switch. Cooldowns are tracked per direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    ToBackup,
    ToPrimary,
}

impl Direction {
    pub fn between(from: RoutingState, to: RoutingState) -> Option<Self> {
        match (from, to) {
            (RoutingState::OnPrimary, RoutingState::OnBackup) => Some(Direction::ToBackup),
            (RoutingState::OnBackup, RoutingState::OnPrimary) => Some(Direction::ToPrimary),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::ToBackup => "to_backup",
            Direction::ToPrimary => "to_primary",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase of the failover state machine.
///
/// The `SwitchingTo*` phases are transient: they last only while a DNS
/// update is being applied and confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    OnPrimary,
    SwitchingToBackup,
    OnBackup,
    SwitchingToPrimary,
}

impl Phase {
    /// The routing state the record is known to be in. A switch in flight
    /// has not been applied yet, so it still reports the pre-switch state.
    pub fn routing_state(&self) -> RoutingState {
        match self {
            Phase::OnPrimary | Phase::SwitchingToBackup => RoutingState::OnPrimary,
            Phase::OnBackup | Phase::SwitchingToPrimary => RoutingState::OnBackup,
        }
    }

    pub fn is_switching(&self) -> bool {
        matches!(self, Phase::SwitchingToBackup | Phase::SwitchingToPrimary)
    }

    pub fn stable(state: RoutingState) -> Self {
        match state {
            RoutingState::OnPrimary => Phase::OnPrimary,
            RoutingState::OnBackup => Phase::OnBackup,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::OnPrimary => "on_primary",
            Phase::SwitchingToBackup => "switching_to_backup",
            Phase::OnBackup => "on_backup",
            Phase::SwitchingToPrimary => "switching_to_primary",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decision to move the DNS record from one server to the other.
///
/// Each intent is applied once. A retried switch is a new intent with a new id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionIntent {
    pub id: Uuid,
    pub from: RoutingState,
    pub to: RoutingState,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

impl TransitionIntent {
    pub fn new(from: RoutingState, to: RoutingState, reason: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            from,
            to,
            reason: reason.into(),
            created_at: Utc::now(),
        }
    }

    /// Direction of this intent. `None` only for a degenerate same-state intent.
    pub fn direction(&self) -> Option<Direction> {
        Direction::between(self.from, self.to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switching_phase_reports_pre_switch_state() {
        assert_eq!(Phase::SwitchingToBackup.routing_state(), RoutingState::OnPrimary);
        assert_eq!(Phase::SwitchingToPrimary.routing_state(), RoutingState::OnBackup);
        assert!(Phase::SwitchingToBackup.is_switching());
        assert!(!Phase::OnBackup.is_switching());
    }

    #[test]
    fn test_intents_get_fresh_ids() {
        let a = TransitionIntent::new(RoutingState::OnPrimary, RoutingState::OnBackup, "test");
        let b = TransitionIntent::new(RoutingState::OnPrimary, RoutingState::OnBackup, "test");
        assert_ne!(a.id, b.id);
        assert_eq!(a.direction(), Some(Direction::ToBackup));
    }
}
