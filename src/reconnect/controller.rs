//! Bounded-retry reconnect controller.
//!
//! # State Transitions
//! ```text
//! idle    + success → Healthy
//! idle    + failure → open episode → StillTrying | Exhausted
//! episode + failure → StillTrying (count < max_retries)
//! episode + failure → Exhausted   (count == max_retries), episode closes
//! episode + success → Recovered, episode closes
//! ```
//!
//! In failback mode the controller starts with an episode open and opens a
//! fresh one whenever an episode resolves, so probing never gives up.

use serde::Serialize;
use std::time::{Duration, Instant};

use crate::error::{GuardError, GuardResult};
use crate::failover::types::Target;
use crate::probe::ProbeResult;
use crate::reconnect::episode::{AttemptOutcome, EpisodeStatus, FailureEpisode};
use crate::resilience::backoff::RetryPolicy;

/// Classification of an episode's progress after one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Reachable and no episode was open.
    Healthy,
    /// Unreachable, retry budget not yet spent.
    StillTrying { attempt: u32, next_attempt_at: Instant },
    /// Retry budget spent; the target is considered down.
    Exhausted { attempts: u32, elapsed: Duration },
    /// Reachable again after an episode.
    Recovered { attempts: u32, elapsed: Duration },
}

impl Verdict {
    pub fn kind(&self) -> VerdictKind {
        match self {
            Verdict::Healthy => VerdictKind::Healthy,
            Verdict::StillTrying { .. } => VerdictKind::StillTrying,
            Verdict::Exhausted { .. } => VerdictKind::Exhausted,
            Verdict::Recovered { .. } => VerdictKind::Recovered,
        }
    }
}

/// Verdict without its payload, for logs, metrics and status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictKind {
    Healthy,
    StillTrying,
    Exhausted,
    Recovered,
}

impl VerdictKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictKind::Healthy => "healthy",
            VerdictKind::StillTrying => "still_trying",
            VerdictKind::Exhausted => "exhausted",
            VerdictKind::Recovered => "recovered",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerMode {
    /// Watching the serving target; episodes open on the first failure.
    Watch,
    /// Waiting for a down target to come back; an episode is always open.
    Failback,
}

pub struct ReconnectController {
    target: Target,
    policy: RetryPolicy,
    mode: ControllerMode,
    episode: Option<FailureEpisode>,
}

impl ReconnectController {
    pub fn new(target: Target, policy: RetryPolicy) -> Self {
        Self {
            target,
            policy,
            mode: ControllerMode::Watch,
            episode: None,
        }
    }

    /// A controller for a failback cycle, with its first episode open at `now`.
    pub fn for_failback(target: Target, policy: RetryPolicy, now: Instant) -> Self {
        let mut episode = FailureEpisode::open(target, now);
        episode.schedule(now + policy.interval);
        Self {
            target,
            policy,
            mode: ControllerMode::Failback,
            episode: Some(episode),
        }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn mode(&self) -> ControllerMode {
        self.mode
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn episode(&self) -> Option<&FailureEpisode> {
        self.episode.as_ref()
    }

    /// When the open episode wants its next attempt, if one is open.
    pub fn next_attempt_at(&self) -> Option<Instant> {
        self.episode.as_ref().and_then(|e| e.next_attempt_at())
    }

    pub fn status(&self, now: Instant) -> Option<EpisodeStatus> {
        self.episode
            .as_ref()
            .map(|e| e.status(now, self.max_retries()))
    }

    /// Open an episode explicitly.
    ///
    /// Fails with `InvalidState` if one is already open: two concurrent
    /// episodes for the same target are never allowed.
    pub fn begin_episode(&mut self, now: Instant) -> GuardResult<()> {
        if self.episode.is_some() {
            return Err(GuardError::invalid_state(format!(
                "episode already open for {}",
                self.target
            )));
        }
        self.episode = Some(FailureEpisode::open(self.target, now));
        Ok(())
    }

    /// Feed one probe result and classify the episode's progress.
    pub fn observe(&mut self, result: &ProbeResult) -> GuardResult<Verdict> {
        if result.target != self.target {
            return Err(GuardError::invalid_state(format!(
                "controller for {} received a probe result for {}",
                self.target, result.target
            )));
        }

        let now = result.timestamp;
        if result.reachable {
            return Ok(self.on_success(now));
        }
        Ok(self.on_failure(now))
    }

    fn on_success(&mut self, now: Instant) -> Verdict {
        let Some(mut episode) = self.episode.take() else {
            return Verdict::Healthy;
        };

        episode.record(AttemptOutcome::Success, now);
        let verdict = Verdict::Recovered {
            attempts: episode.failures(),
            elapsed: episode.elapsed(now),
        };
        tracing::info!(
            server = %self.target,
            failures = episode.failures(),
            elapsed_ms = episode.elapsed(now).as_millis() as u64,
            "Target recovered"
        );
        self.reopen_if_failback(now);
        verdict
    }

    fn on_failure(&mut self, now: Instant) -> Verdict {
        let target = self.target;
        let max_retries = self.max_retries();
        let episode = self
            .episode
            .get_or_insert_with(|| FailureEpisode::open(target, now));
        episode.record(AttemptOutcome::Failure, now);
        let failures = episode.failures();

        if failures >= max_retries {
            let elapsed = episode.elapsed(now);
            self.episode = None;
            tracing::warn!(
                server = %self.target,
                attempts = failures,
                elapsed_ms = elapsed.as_millis() as u64,
                "Reconnect attempts exhausted"
            );
            self.reopen_if_failback(now);
            return Verdict::Exhausted {
                attempts: failures,
                elapsed,
            };
        }

        let next_attempt_at = now + self.policy.delay_for(failures);
        episode.schedule(next_attempt_at);
        tracing::debug!(
            server = %self.target,
            attempt = failures,
            max_retries,
            "Reconnect attempt failed, retrying"
        );
        Verdict::StillTrying {
            attempt: failures,
            next_attempt_at,
        }
    }

    fn reopen_if_failback(&mut self, now: Instant) {
        if self.mode == ControllerMode::Failback {
            let mut episode = FailureEpisode::open(self.target, now);
            episode.schedule(now + self.policy.interval);
            self.episode = Some(episode);
        }
    }

    /// Swap in a new policy. The open episode keeps its attempts.
    pub fn update_policy(&mut self, policy: RetryPolicy) {
        self.policy = policy;
    }

    fn max_retries(&self) -> u32 {
        self.policy.max_retries.max(1)
    }
}
