//! Retry spacing policies with optional jitter.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the spacing between reconnect attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Escalation {
    /// Every attempt waits `interval`.
    #[default]
    Fixed,
    /// Attempt `n` waits `n * interval`.
    Linear,
    /// Attempt `n` waits `2^(n-1) * interval`.
    Exponential,
}

/// Spacing and budget for one failure episode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Consecutive failures that exhaust an episode.
    pub max_retries: u32,
    /// Base spacing between attempts.
    pub interval: Duration,
    pub escalation: Escalation,
    /// Upper bound on any single delay.
    pub max_interval: Duration,
    /// Add up to 10% random jitter to each delay.
    pub jitter: bool,
}

impl RetryPolicy {
    pub fn fixed(max_retries: u32, interval: Duration) -> Self {
        Self {
            max_retries,
            interval,
            escalation: Escalation::Fixed,
            max_interval: interval,
            jitter: false,
        }
    }

    /// Delay to wait after the `attempt`-th failure (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = calculate_backoff(attempt, self.interval, self.max_interval, self.escalation);
        if self.jitter {
            apply_jitter(delay)
        } else {
            delay
        }
    }
}

/// Calculate the delay after `attempt` failures, capped at `max`.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration, escalation: Escalation) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let base_ms = base.as_millis() as u64;
    let delay_ms = match escalation {
        Escalation::Fixed => base_ms,
        Escalation::Linear => base_ms.saturating_mul(attempt as u64),
        Escalation::Exponential => {
            let factor = 2u64.saturating_pow(attempt - 1);
            base_ms.saturating_mul(factor)
        }
    };

    // A max below the base would make escalation meaningless; the base wins.
    let cap_ms = (max.as_millis() as u64).max(base_ms);
    Duration::from_millis(delay_ms.min(cap_ms))
}

/// Add 0 to 10% of the delay as random jitter.
pub fn apply_jitter(delay: Duration) -> Duration {
    let delay_ms = delay.as_millis() as u64;
    let jitter_range = delay_ms / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };
    Duration::from_millis(delay_ms + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: Duration = Duration::from_millis(100);
    const MAX: Duration = Duration::from_millis(1000);

    #[test]
    fn test_fixed_spacing() {
        assert_eq!(calculate_backoff(1, BASE, MAX, Escalation::Fixed), BASE);
        assert_eq!(calculate_backoff(7, BASE, MAX, Escalation::Fixed), BASE);
    }

    #[test]
    fn test_linear_spacing_is_capped() {
        assert_eq!(calculate_backoff(3, BASE, MAX, Escalation::Linear), Duration::from_millis(300));
        assert_eq!(calculate_backoff(50, BASE, MAX, Escalation::Linear), MAX);
    }

    #[test]
    fn test_exponential_spacing() {
        assert_eq!(calculate_backoff(1, BASE, MAX, Escalation::Exponential), BASE);
        assert_eq!(calculate_backoff(4, BASE, MAX, Escalation::Exponential), Duration::from_millis(800));
        assert_eq!(calculate_backoff(64, BASE, MAX, Escalation::Exponential), MAX);
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        let policy = RetryPolicy {
            jitter: true,
            ..RetryPolicy::fixed(3, Duration::from_millis(1000))
        };
        for _ in 0..20 {
            let delay = policy.delay_for(1);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay < Duration::from_millis(1100));
        }
    }
}
