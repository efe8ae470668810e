//! Uptime accounting for the primary.
//!
//! Downtime starts when the primary is declared down and ends when traffic
//! is back on it.

use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UptimeStats {
    pub uptime_percentage: f64,
    pub total_downtime_secs: u64,
    pub failover_count: u32,
    pub total_incidents: u32,
    pub currently_down: bool,
    pub tracked_secs: u64,
}

#[derive(Debug, Clone)]
pub struct UptimeTracker {
    started_at: Instant,
    closed_downtime: Duration,
    current_downtime_start: Option<Instant>,
    incidents: u32,
    failover_count: u32,
}

impl UptimeTracker {
    pub fn new(now: Instant) -> Self {
        Self {
            started_at: now,
            closed_downtime: Duration::ZERO,
            current_downtime_start: None,
            incidents: 0,
            failover_count: 0,
        }
    }

    /// Start a downtime period. No-op if one is already running.
    pub fn record_downtime_start(&mut self, now: Instant) {
        if self.current_downtime_start.is_none() {
            self.current_downtime_start = Some(now);
        }
    }

    /// Close the running downtime period, if any.
    pub fn record_downtime_end(&mut self, now: Instant) {
        if let Some(start) = self.current_downtime_start.take() {
            self.closed_downtime += now.saturating_duration_since(start);
            self.incidents += 1;
        }
    }

    pub fn record_failover(&mut self) {
        self.failover_count += 1;
    }

    pub fn total_downtime(&self, now: Instant) -> Duration {
        let running = self
            .current_downtime_start
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default();
        self.closed_downtime + running
    }

    pub fn uptime_percentage(&self, now: Instant) -> f64 {
        let total = now.saturating_duration_since(self.started_at);
        if total.is_zero() {
            return 100.0;
        }
        let down = self.total_downtime(now).min(total);
        (total - down).as_secs_f64() / total.as_secs_f64() * 100.0
    }

    pub fn stats(&self, now: Instant) -> UptimeStats {
        UptimeStats {
            uptime_percentage: self.uptime_percentage(now),
            total_downtime_secs: self.total_downtime(now).as_secs(),
            failover_count: self.failover_count,
            total_incidents: self.incidents,
            currently_down: self.current_downtime_start.is_some(),
            tracked_secs: now.saturating_duration_since(self.started_at).as_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_tracker_is_fully_up() {
        let now = Instant::now();
        let tracker = UptimeTracker::new(now);
        assert_eq!(tracker.uptime_percentage(now), 100.0);
        assert_eq!(tracker.uptime_percentage(now + Duration::from_secs(60)), 100.0);
    }

    #[test]
    fn test_downtime_periods_accumulate() {
        let start = Instant::now();
        let mut tracker = UptimeTracker::new(start);

        tracker.record_downtime_start(start + Duration::from_secs(10));
        tracker.record_downtime_start(start + Duration::from_secs(15));
        tracker.record_downtime_end(start + Duration::from_secs(30));
        tracker.record_failover();

        let stats = tracker.stats(start + Duration::from_secs(100));
        assert_eq!(stats.total_downtime_secs, 20);
        assert_eq!(stats.total_incidents, 1);
        assert_eq!(stats.failover_count, 1);
        assert!(!stats.currently_down);
        assert!((stats.uptime_percentage - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_running_downtime_counts() {
        let start = Instant::now();
        let mut tracker = UptimeTracker::new(start);
        tracker.record_downtime_start(start + Duration::from_secs(50));

        let stats = tracker.stats(start + Duration::from_secs(100));
        assert!(stats.currently_down);
        assert_eq!(stats.total_downtime_secs, 50);
        assert_eq!(stats.total_incidents, 0);
    }
}
