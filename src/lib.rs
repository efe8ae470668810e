//! connectivity-guard library.
//!
//! Probing, reconnect accounting and the failover decision engine are
//! usable on their own; `lifecycle::run` wires them to the Cloudflare
//! adapter, the webhook notifier and the admin API.

// Decision core
pub mod failover;
pub mod reconnect;
pub mod monitor;

// Collaborators
pub mod dns;
pub mod notifier;
pub mod probe;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub mod admin;

pub use config::GuardConfig;
pub use error::{GuardError, GuardResult};
pub use lifecycle::Shutdown;
pub use monitor::{Monitor, MonitorHandle, MonitorSettings};
