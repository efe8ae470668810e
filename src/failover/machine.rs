//! Failover state machine.
//!
//! # States
//! - OnPrimary: record points at the primary, primary is being watched
//! - SwitchingToBackup: intent issued, DNS update in flight
//! - OnBackup: record points at the backup, primary watched for failback
//! - SwitchingToPrimary: failback intent issued, DNS update in flight
//!
//! # State Transitions
//! ```text
//! OnPrimary          + Exhausted(primary)  → SwitchingToBackup (intent Primary→Backup)
//! SwitchingToBackup  + adapter success     → OnBackup
//! SwitchingToBackup  + adapter failure     → OnPrimary (alert)
//! OnBackup           + Recovered(primary)  → SwitchingToPrimary (auto_failback only)
//! OnBackup           + Exhausted(primary)  → OnBackup (no-op)
//! SwitchingToPrimary + adapter success     → OnPrimary
//! SwitchingToPrimary + adapter failure     → OnBackup (alert)
//! ```
//!
//! # Design Decisions
//! - Every completed switch, applied or rolled back, starts a cooldown for
//!   its direction; the opposite direction stays open
//! - StillTrying and Healthy never change state
//! - An adapter outcome must name the pending intent
//! - The machine never performs I/O; the monitor actor applies intents

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::dns::AdapterError;
use crate::error::{GuardError, GuardResult};
use crate::failover::cooldown::Cooldowns;
use crate::failover::types::{Direction, Phase, RoutingState, Target, TransitionIntent};
use crate::reconnect::Verdict;

/// Tunables of the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverSettings {
    /// Minimum time between two switches in the same direction.
    pub cooldown: Duration,
    /// Longest a `SwitchingTo*` phase may last.
    pub switch_timeout: Duration,
    /// Return to the primary automatically once it recovers.
    pub auto_failback: bool,
}

impl Default for FailoverSettings {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(300),
            switch_timeout: Duration::from_secs(60),
            auto_failback: true,
        }
    }
}

/// What the machine wants done after a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Nothing to do.
    Noop,
    /// A switch was warranted but its direction is cooling down.
    Suppressed { direction: Direction, remaining: Duration },
    /// Apply this intent, then report back with `on_switch_outcome`.
    Switch(TransitionIntent),
}

/// Result of reporting an adapter outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// The record now points at `intent.to`.
    Applied(TransitionIntent),
    /// The update failed; the machine is back at `intent.from`.
    RolledBack {
        intent: TransitionIntent,
        error: AdapterError,
    },
    /// The outcome was already recorded for this intent.
    Duplicate,
}

/// Last completed switch, for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionRecord {
    pub intent_id: Uuid,
    pub from: RoutingState,
    pub to: RoutingState,
    pub reason: String,
    pub applied: bool,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct PendingSwitch {
    intent: TransitionIntent,
    started_at: Instant,
}

pub struct FailoverMachine {
    phase: Phase,
    pending: Option<PendingSwitch>,
    cooldowns: Cooldowns,
    settings: FailoverSettings,
    last_transition: Option<TransitionRecord>,
}

impl FailoverMachine {
    pub fn new(initial: RoutingState, settings: FailoverSettings) -> Self {
        Self {
            phase: Phase::stable(initial),
            pending: None,
            cooldowns: Cooldowns::default(),
            settings,
            last_transition: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn routing_state(&self) -> RoutingState {
        self.phase.routing_state()
    }

    pub fn settings(&self) -> &FailoverSettings {
        &self.settings
    }

    pub fn pending_intent(&self) -> Option<&TransitionIntent> {
        self.pending.as_ref().map(|p| &p.intent)
    }

    pub fn last_transition(&self) -> Option<&TransitionRecord> {
        self.last_transition.as_ref()
    }

    pub fn cooldown_remaining(&self, direction: Direction, now: Instant) -> Option<Duration> {
        self.cooldowns.remaining(direction, now)
    }

    /// Consume a reconnect verdict about `source`.
    pub fn on_verdict(&mut self, source: Target, verdict: &Verdict, now: Instant) -> GuardResult<Decision> {
        self.check_stuck(now)?;

        if source != Target::Primary {
            return Ok(Decision::Noop);
        }

        match (self.phase, verdict) {
            (Phase::OnPrimary, Verdict::Exhausted { attempts, elapsed }) => {
                let reason = format!(
                    "primary unreachable after {} attempts over {}s",
                    attempts,
                    elapsed.as_secs()
                );
                Ok(self.begin_switch(RoutingState::OnBackup, reason, now, false))
            }
            (Phase::OnBackup, Verdict::Recovered { .. }) if self.settings.auto_failback => {
                Ok(self.begin_switch(RoutingState::OnPrimary, "primary recovered".to_string(), now, false))
            }
            _ => Ok(Decision::Noop),
        }
    }

    /// Operator-requested switch. Bypasses the cooldown but not the phase
    /// rules: nothing happens while a switch is in flight or when the record
    /// already points at `to`.
    pub fn request_switch(&mut self, to: RoutingState, reason: impl Into<String>, now: Instant) -> GuardResult<Decision> {
        self.check_stuck(now)?;
        if self.phase.is_switching() || self.routing_state() == to {
            return Ok(Decision::Noop);
        }
        Ok(self.begin_switch(to, reason.into(), now, true))
    }

    fn begin_switch(&mut self, to: RoutingState, reason: String, now: Instant, bypass_cooldown: bool) -> Decision {
        let from = self.routing_state();
        let Some(direction) = Direction::between(from, to) else {
            return Decision::Noop;
        };

        if !bypass_cooldown {
            if let Some(remaining) = self.cooldowns.remaining(direction, now) {
                tracing::warn!(
                    direction = %direction,
                    remaining_secs = remaining.as_secs(),
                    "Switch suppressed by cooldown"
                );
                return Decision::Suppressed { direction, remaining };
            }
        }

        let intent = TransitionIntent::new(from, to, reason);
        self.phase = match to {
            RoutingState::OnBackup => Phase::SwitchingToBackup,
            RoutingState::OnPrimary => Phase::SwitchingToPrimary,
        };
        self.pending = Some(PendingSwitch {
            intent: intent.clone(),
            started_at: now,
        });

        tracing::info!(
            intent_id = %intent.id,
            from = %from,
            to = %to,
            reason = %intent.reason,
            "Switch started"
        );
        Decision::Switch(intent)
    }

    /// Report the DNS adapter's outcome for the pending intent.
    pub fn on_switch_outcome(
        &mut self,
        intent_id: Uuid,
        outcome: Result<(), AdapterError>,
        now: Instant,
    ) -> GuardResult<SwitchOutcome> {
        let matches_pending = self
            .pending
            .as_ref()
            .is_some_and(|p| p.intent.id == intent_id);

        if !matches_pending {
            let already_recorded = self.pending.is_none()
                && self
                    .last_transition
                    .as_ref()
                    .is_some_and(|t| t.intent_id == intent_id);
            if already_recorded {
                tracing::debug!(intent_id = %intent_id, "Ignoring duplicate switch outcome");
                return Ok(SwitchOutcome::Duplicate);
            }
            return Err(GuardError::invalid_state(format!(
                "outcome for intent {} does not match the pending switch",
                intent_id
            )));
        }

        // A switch that outlived `switch_timeout` is not committed, even if
        // the adapter eventually succeeded.
        self.check_stuck(now)?;

        let Some(PendingSwitch { intent, .. }) = self.pending.take() else {
            return Err(GuardError::invalid_state("pending switch vanished"));
        };

        if let Some(direction) = intent.direction() {
            self.cooldowns.start(direction, now, self.settings.cooldown);
        }

        let applied = outcome.is_ok();
        self.phase = Phase::stable(if applied { intent.to } else { intent.from });
        self.last_transition = Some(TransitionRecord {
            intent_id: intent.id,
            from: intent.from,
            to: intent.to,
            reason: intent.reason.clone(),
            applied,
            completed_at: Utc::now(),
        });

        match outcome {
            Ok(()) => {
                tracing::info!(intent_id = %intent.id, routing_state = %self.phase, "Switch applied");
                Ok(SwitchOutcome::Applied(intent))
            }
            Err(error) => {
                tracing::error!(
                    intent_id = %intent.id,
                    error = %error,
                    routing_state = %self.phase,
                    "Switch failed, rolled back"
                );
                Ok(SwitchOutcome::RolledBack { intent, error })
            }
        }
    }

    /// Fail if a switch has been in flight longer than `switch_timeout`.
    pub fn check_stuck(&self, now: Instant) -> GuardResult<()> {
        if let Some(pending) = &self.pending {
            let in_flight = now.saturating_duration_since(pending.started_at);
            if in_flight > self.settings.switch_timeout {
                return Err(GuardError::invalid_state(format!(
                    "{} stuck for {}s (intent {})",
                    self.phase,
                    in_flight.as_secs(),
                    pending.intent.id
                )));
            }
        }
        Ok(())
    }

    /// Restart from a known routing state, dropping any pending switch.
    /// Cooldowns survive so a restart cannot be used to flap.
    pub fn reset(&mut self, state: RoutingState) {
        if let Some(pending) = self.pending.take() {
            tracing::warn!(intent_id = %pending.intent.id, "Abandoning pending switch on reset");
        }
        self.phase = Phase::stable(state);
    }

    pub fn update_settings(&mut self, settings: FailoverSettings) {
        self.settings = settings;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> FailoverSettings {
        FailoverSettings {
            cooldown: Duration::from_secs(300),
            switch_timeout: Duration::from_secs(30),
            auto_failback: true,
        }
    }

    fn exhausted() -> Verdict {
        Verdict::Exhausted {
            attempts: 3,
            elapsed: Duration::from_secs(15),
        }
    }

    fn recovered() -> Verdict {
        Verdict::Recovered {
            attempts: 2,
            elapsed: Duration::from_secs(60),
        }
    }

    fn expect_switch(decision: Decision) -> TransitionIntent {
        match decision {
            Decision::Switch(intent) => intent,
            other => panic!("expected a switch, got {:?}", other),
        }
    }

    #[test]
    fn test_exhausted_primary_starts_failover() {
        let now = Instant::now();
        let mut machine = FailoverMachine::new(RoutingState::OnPrimary, settings());

        let intent = expect_switch(machine.on_verdict(Target::Primary, &exhausted(), now).unwrap());
        assert_eq!(intent.from, RoutingState::OnPrimary);
        assert_eq!(intent.to, RoutingState::OnBackup);
        assert_eq!(machine.phase(), Phase::SwitchingToBackup);
        assert_eq!(machine.routing_state(), RoutingState::OnPrimary);

        let outcome = machine.on_switch_outcome(intent.id, Ok(()), now).unwrap();
        assert!(matches!(outcome, SwitchOutcome::Applied(_)));
        assert_eq!(machine.phase(), Phase::OnBackup);
    }

    #[test]
    fn test_non_terminal_verdicts_never_switch() {
        let now = Instant::now();
        let mut machine = FailoverMachine::new(RoutingState::OnPrimary, settings());
        let verdicts = [
            Verdict::Healthy,
            Verdict::StillTrying {
                attempt: 1,
                next_attempt_at: now,
            },
            recovered(),
        ];
        for verdict in verdicts {
            assert_eq!(machine.on_verdict(Target::Primary, &verdict, now).unwrap(), Decision::Noop);
            assert_eq!(machine.phase(), Phase::OnPrimary);
        }
    }

    #[test]
    fn test_adapter_failure_rolls_back_to_primary() {
        let now = Instant::now();
        let mut machine = FailoverMachine::new(RoutingState::OnPrimary, settings());
        let intent = expect_switch(machine.on_verdict(Target::Primary, &exhausted(), now).unwrap());

        let outcome = machine
            .on_switch_outcome(intent.id, Err(AdapterError::Api("zone locked".into())), now)
            .unwrap();

        assert!(matches!(outcome, SwitchOutcome::RolledBack { .. }));
        assert_eq!(machine.phase(), Phase::OnPrimary);
        assert!(machine.pending_intent().is_none());
        assert!(!machine.last_transition().unwrap().applied);
    }

    #[test]
    fn test_failed_failback_rolls_back_to_backup() {
        let now = Instant::now();
        let mut machine = FailoverMachine::new(RoutingState::OnBackup, settings());
        let intent = expect_switch(machine.on_verdict(Target::Primary, &recovered(), now).unwrap());
        assert_eq!(machine.phase(), Phase::SwitchingToPrimary);

        machine
            .on_switch_outcome(intent.id, Err(AdapterError::Timeout(Duration::from_secs(10))), now)
            .unwrap();
        assert_eq!(machine.phase(), Phase::OnBackup);
    }

    #[test]
    fn test_exhausted_on_backup_is_noop() {
        let mut machine = FailoverMachine::new(RoutingState::OnBackup, settings());
        let decision = machine.on_verdict(Target::Primary, &exhausted(), Instant::now()).unwrap();
        assert_eq!(decision, Decision::Noop);
        assert_eq!(machine.phase(), Phase::OnBackup);
    }

    #[test]
    fn test_failback_disabled_stays_on_backup() {
        let mut machine = FailoverMachine::new(
            RoutingState::OnBackup,
            FailoverSettings {
                auto_failback: false,
                ..settings()
            },
        );
        for _ in 0..5 {
            let decision = machine.on_verdict(Target::Primary, &recovered(), Instant::now()).unwrap();
            assert_eq!(decision, Decision::Noop);
        }
        assert_eq!(machine.routing_state(), RoutingState::OnBackup);
    }

    #[test]
    fn test_same_direction_cooldown_suppresses() {
        let start = Instant::now();
        let mut machine = FailoverMachine::new(RoutingState::OnPrimary, settings());

        let to_backup = expect_switch(machine.on_verdict(Target::Primary, &exhausted(), start).unwrap());
        machine.on_switch_outcome(to_backup.id, Ok(()), start).unwrap();

        // Opposite direction is allowed right away.
        let to_primary = expect_switch(machine.on_verdict(Target::Primary, &recovered(), start).unwrap());
        machine.on_switch_outcome(to_primary.id, Ok(()), start).unwrap();

        let later = start + Duration::from_secs(100);
        let decision = machine.on_verdict(Target::Primary, &exhausted(), later).unwrap();
        assert_eq!(
            decision,
            Decision::Suppressed {
                direction: Direction::ToBackup,
                remaining: Duration::from_secs(200),
            }
        );
        assert_eq!(machine.phase(), Phase::OnPrimary);

        let after_cooldown = start + Duration::from_secs(300);
        expect_switch(machine.on_verdict(Target::Primary, &exhausted(), after_cooldown).unwrap());
    }

    #[test]
    fn test_failed_switch_also_starts_cooldown() {
        let start = Instant::now();
        let mut machine = FailoverMachine::new(RoutingState::OnPrimary, settings());
        let intent = expect_switch(machine.on_verdict(Target::Primary, &exhausted(), start).unwrap());
        machine
            .on_switch_outcome(intent.id, Err(AdapterError::Api("rate limited".into())), start)
            .unwrap();

        let decision = machine
            .on_verdict(Target::Primary, &exhausted(), start + Duration::from_secs(1))
            .unwrap();
        assert!(matches!(decision, Decision::Suppressed { .. }));
    }

    #[test]
    fn test_verdicts_while_switching_are_ignored() {
        let now = Instant::now();
        let mut machine = FailoverMachine::new(RoutingState::OnPrimary, settings());
        expect_switch(machine.on_verdict(Target::Primary, &exhausted(), now).unwrap());

        assert_eq!(machine.on_verdict(Target::Primary, &exhausted(), now).unwrap(), Decision::Noop);
        assert_eq!(machine.on_verdict(Target::Primary, &recovered(), now).unwrap(), Decision::Noop);
        assert_eq!(machine.phase(), Phase::SwitchingToBackup);
    }

    #[test]
    fn test_unknown_intent_outcome_is_invalid() {
        let mut machine = FailoverMachine::new(RoutingState::OnPrimary, settings());
        let err = machine
            .on_switch_outcome(Uuid::new_v4(), Ok(()), Instant::now())
            .unwrap_err();
        assert!(err.is_invalid_state());
    }

    #[test]
    fn test_duplicate_outcome_changes_nothing() {
        let now = Instant::now();
        let mut machine = FailoverMachine::new(RoutingState::OnPrimary, settings());
        let intent = expect_switch(machine.on_verdict(Target::Primary, &exhausted(), now).unwrap());

        machine.on_switch_outcome(intent.id, Ok(()), now).unwrap();
        let again = machine.on_switch_outcome(intent.id, Ok(()), now).unwrap();

        assert_eq!(again, SwitchOutcome::Duplicate);
        assert_eq!(machine.routing_state(), RoutingState::OnBackup);
    }

    #[test]
    fn test_stuck_switch_is_invalid() {
        let start = Instant::now();
        let mut machine = FailoverMachine::new(RoutingState::OnPrimary, settings());
        expect_switch(machine.on_verdict(Target::Primary, &exhausted(), start).unwrap());

        assert!(machine.check_stuck(start + Duration::from_secs(30)).is_ok());
        let err = machine.check_stuck(start + Duration::from_secs(31)).unwrap_err();
        assert!(err.is_invalid_state());

        machine.reset(RoutingState::OnPrimary);
        assert_eq!(machine.phase(), Phase::OnPrimary);
        assert!(machine.check_stuck(start + Duration::from_secs(31)).is_ok());
    }

    #[test]
    fn test_late_outcome_is_invalid() {
        let start = Instant::now();
        let mut machine = FailoverMachine::new(RoutingState::OnPrimary, settings());
        let intent = expect_switch(machine.on_verdict(Target::Primary, &exhausted(), start).unwrap());

        let err = machine
            .on_switch_outcome(intent.id, Ok(()), start + Duration::from_secs(31))
            .unwrap_err();
        assert!(err.is_invalid_state());
        assert_eq!(machine.phase(), Phase::SwitchingToBackup);
        assert!(machine.last_transition().is_none());
    }

    #[test]
    fn test_manual_switch_bypasses_cooldown() {
        let start = Instant::now();
        let mut machine = FailoverMachine::new(RoutingState::OnPrimary, settings());
        let intent = expect_switch(machine.on_verdict(Target::Primary, &exhausted(), start).unwrap());
        machine
            .on_switch_outcome(intent.id, Err(AdapterError::Api("boom".into())), start)
            .unwrap();

        let manual = expect_switch(
            machine
                .request_switch(RoutingState::OnBackup, "operator request", start)
                .unwrap(),
        );
        assert_eq!(manual.reason, "operator request");
        assert_ne!(manual.id, intent.id);
    }

    #[test]
    fn test_manual_switch_to_current_state_is_noop() {
        let mut machine = FailoverMachine::new(RoutingState::OnBackup, settings());
        let decision = machine
            .request_switch(RoutingState::OnBackup, "operator request", Instant::now())
            .unwrap();
        assert_eq!(decision, Decision::Noop);
    }

    #[test]
    fn test_backup_verdicts_are_ignored() {
        let mut machine = FailoverMachine::new(RoutingState::OnPrimary, settings());
        let decision = machine.on_verdict(Target::Backup, &exhausted(), Instant::now()).unwrap();
        assert_eq!(decision, Decision::Noop);
    }
}
