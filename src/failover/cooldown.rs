//! Per-direction cooldown windows.
//!
//! After a switch completes (applied or rolled back), a new switch in the
//! same direction is suppressed until the window elapses. The opposite
//! direction is never blocked by it.

use std::time::{Duration, Instant};

use crate::failover::types::Direction;

/// A single cooldown window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownWindow {
    pub started_at: Instant,
    pub duration: Duration,
}

impl CooldownWindow {
    pub fn new(started_at: Instant, duration: Duration) -> Self {
        Self { started_at, duration }
    }

    /// Time left before the window elapses. Zero once it has.
    pub fn remaining(&self, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(self.started_at);
        self.duration.saturating_sub(elapsed)
    }

    pub fn is_active(&self, now: Instant) -> bool {
        !self.remaining(now).is_zero()
    }
}

/// Cooldown state for both directions. Starting a window replaces the
/// previous one for that direction.
#[derive(Debug, Clone, Default)]
pub struct Cooldowns {
    to_backup: Option<CooldownWindow>,
    to_primary: Option<CooldownWindow>,
}

impl Cooldowns {
    pub fn start(&mut self, direction: Direction, now: Instant, duration: Duration) {
        let window = Some(CooldownWindow::new(now, duration));
        match direction {
            Direction::ToBackup => self.to_backup = window,
            Direction::ToPrimary => self.to_primary = window,
        }
    }

    /// Remaining cooldown for `direction`, if a window is still active.
    pub fn remaining(&self, direction: Direction, now: Instant) -> Option<Duration> {
        let window = match direction {
            Direction::ToBackup => self.to_backup,
            Direction::ToPrimary => self.to_primary,
        }?;
        let remaining = window.remaining(now);
        (!remaining.is_zero()).then_some(remaining)
    }

    pub fn clear(&mut self) {
        self.to_backup = None;
        self.to_primary = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_elapses() {
        let now = Instant::now();
        let window = CooldownWindow::new(now, Duration::from_secs(10));
        assert!(window.is_active(now + Duration::from_secs(9)));
        assert!(!window.is_active(now + Duration::from_secs(10)));
        assert_eq!(window.remaining(now + Duration::from_secs(4)), Duration::from_secs(6));
    }

    #[test]
    fn test_directions_are_independent() {
        let now = Instant::now();
        let mut cooldowns = Cooldowns::default();
        cooldowns.start(Direction::ToBackup, now, Duration::from_secs(60));

        assert!(cooldowns.remaining(Direction::ToBackup, now).is_some());
        assert!(cooldowns.remaining(Direction::ToPrimary, now).is_none());
    }

    #[test]
    fn test_restart_replaces_window() {
        let now = Instant::now();
        let mut cooldowns = Cooldowns::default();
        cooldowns.start(Direction::ToPrimary, now, Duration::from_secs(60));
        let later = now + Duration::from_secs(50);
        cooldowns.start(Direction::ToPrimary, later, Duration::from_secs(60));

        assert_eq!(
            cooldowns.remaining(Direction::ToPrimary, later + Duration::from_secs(30)),
            Some(Duration::from_secs(30))
        );
    }
}
