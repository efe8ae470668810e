//! Reconnect subsystem.
//!
//! # Data Flow
//! ```text
//! ProbeResult
//!     → controller.rs (count consecutive failures against the budget)
//!     → episode.rs (attempt history, next scheduled attempt)
//!     → Verdict { Healthy | StillTrying | Exhausted | Recovered }
//! ```
//!
//! # Design Decisions
//! - Time is an input, never read from a clock inside the controller
//! - One episode per controller; overlapping episodes are an invariant violation
//! - The controller schedules attempts but never sleeps

pub mod controller;
pub mod episode;

pub use controller::{ControllerMode, ReconnectController, Verdict, VerdictKind};
pub use episode::{AttemptOutcome, EpisodeStatus, FailureEpisode, ReconnectAttempt};
