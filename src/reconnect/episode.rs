//! Failure episodes: consecutive reconnect attempts against one target.

use serde::Serialize;
use std::time::{Duration, Instant};

use crate::failover::types::Target;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure,
}

/// One reconnect attempt within an episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectAttempt {
    /// 1-based position within the episode.
    pub sequence_number: u32,
    pub outcome: AttemptOutcome,
    pub elapsed_since_first_failure: Duration,
}

/// The span of consecutive attempts since the first failure.
#[derive(Debug, Clone)]
pub struct FailureEpisode {
    target: Target,
    first_failure_at: Instant,
    attempts: Vec<ReconnectAttempt>,
    next_attempt_at: Option<Instant>,
}

impl FailureEpisode {
    pub fn open(target: Target, first_failure_at: Instant) -> Self {
        Self {
            target,
            first_failure_at,
            attempts: Vec::new(),
            next_attempt_at: None,
        }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    pub fn first_failure_at(&self) -> Instant {
        self.first_failure_at
    }

    pub fn attempts(&self) -> &[ReconnectAttempt] {
        &self.attempts
    }

    /// Number of failed attempts so far.
    pub fn failures(&self) -> u32 {
        self.attempts
            .iter()
            .filter(|a| a.outcome == AttemptOutcome::Failure)
            .count() as u32
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.first_failure_at)
    }

    pub fn next_attempt_at(&self) -> Option<Instant> {
        self.next_attempt_at
    }

    pub(crate) fn schedule(&mut self, at: Instant) {
        self.next_attempt_at = Some(at);
    }

    pub(crate) fn record(&mut self, outcome: AttemptOutcome, at: Instant) -> &ReconnectAttempt {
        let attempt = ReconnectAttempt {
            sequence_number: self.attempts.len() as u32 + 1,
            outcome,
            elapsed_since_first_failure: self.elapsed(at),
        };
        self.attempts.push(attempt);
        self.next_attempt_at = None;
        &self.attempts[self.attempts.len() - 1]
    }

    pub fn status(&self, now: Instant, max_retries: u32) -> EpisodeStatus {
        EpisodeStatus {
            target: self.target,
            failures: self.failures(),
            max_retries,
            elapsed_ms: self.elapsed(now).as_millis() as u64,
            next_attempt_in_ms: self
                .next_attempt_at
                .map(|at| at.saturating_duration_since(now).as_millis() as u64),
        }
    }
}

/// Serializable view of an open episode for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpisodeStatus {
    pub target: Target,
    pub failures: u32,
    pub max_retries: u32,
    pub elapsed_ms: u64,
    pub next_attempt_in_ms: Option<u64>,
}
