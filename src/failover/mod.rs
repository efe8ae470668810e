//! Failover decision engine.
//!
//! # Data Flow
//! ```text
//! Verdict (from a reconnect controller)
//!     → machine.rs (phase rules + cooldown.rs hysteresis)
//!     → Decision::Switch(TransitionIntent)
//!     → DNS adapter applies the intent
//!     → machine.rs on_switch_outcome (commit or roll back)
//! ```
//!
//! # Design Decisions
//! - The machine is owned by exactly one task; it is not Sync-shared
//! - Pure state transitions, no I/O, time passed in by the caller
//! - Rollback on adapter failure instead of retrying inside the machine

pub mod cooldown;
pub mod machine;
pub mod types;

pub use cooldown::{CooldownWindow, Cooldowns};
pub use machine::{Decision, FailoverMachine, FailoverSettings, SwitchOutcome, TransitionRecord};
pub use types::{Direction, Phase, RoutingState, Target, TransitionIntent};
