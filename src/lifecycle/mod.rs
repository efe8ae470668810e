//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Logging/metrics → Adapters → Resolve live DNS state
//!     → Monitor actor → Admin API → Config watcher
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Monitor finishes any switch in flight
//!     → Probe cycles stop → Admin API stops → Notifications drain
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Reload configuration
//! ```
//!
//! # Design Decisions
//! - Fail fast: a bad config or missing DNS credentials is fatal
//! - The monitor starts from the record's real content, not an assumption
//! - Notification drain has a deadline

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::{wait_for_signal, SignalEvent};
pub use startup::run;
