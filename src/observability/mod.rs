//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! The monitor actor additionally feeds:
//!     → uptime.rs (downtime periods, failover count)
//!
//! Consumers:
//!     → Log aggregation (stdout, file)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Status snapshot and webhook payloads (uptime)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Intent ids flow through every log line of a switch
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;
pub mod uptime;

pub use uptime::{UptimeStats, UptimeTracker};
