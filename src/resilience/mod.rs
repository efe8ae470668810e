//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to a collaborator (probe, DNS adapter, notifier):
//!     → timeouts.rs (enforce deadline, elapsed = failure)
//!     → On failure: backoff.rs (spacing of the next attempt)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Spacing policy is configuration, not code
//! - Jitter is optional so tests stay deterministic

pub mod backoff;
pub mod timeouts;

pub use backoff::{Escalation, RetryPolicy};
pub use timeouts::{with_deadline, Elapsed};
