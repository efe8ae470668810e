//! DNS switch subsystem.
//!
//! # Data Flow
//! ```text
//! TransitionIntent (from the failover machine, via the monitor actor)
//!     → DnsSwitch::apply (cloudflare.rs)
//!     → PATCH record content to the target's address
//!     → optional read-back verification
//!     → Ok(()) | AdapterError
//! ```
//!
//! # Design Decisions
//! - Applying the same intent twice is safe: the record just gets the same content
//! - The adapter owns its retries; the state machine never retries
//! - The live record is the source of truth after a restart

pub mod cloudflare;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::failover::types::{Target, TransitionIntent};

pub use cloudflare::CloudflareSwitch;

/// Errors reported by a DNS switch adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// The update did not complete within its deadline.
    #[error("DNS update timed out after {0:?}")]
    Timeout(Duration),

    /// Transport-level failure talking to the provider.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The provider rejected the request.
    #[error("DNS provider error: {0}")]
    Api(String),

    /// The record did not hold the expected content after the update.
    #[error("Verification failed: expected {expected}, found {actual}")]
    Verification { expected: String, actual: String },
}

/// Executes routing changes against the authoritative DNS record.
#[async_trait]
pub trait DnsSwitch: Send + Sync {
    /// Point the record at `intent.to`. Must be idempotent.
    async fn apply(&self, intent: &TransitionIntent) -> Result<(), AdapterError>;

    /// Which target the record points at right now. `None` when the content
    /// matches neither configured address.
    async fn current_target(&self) -> Result<Option<Target>, AdapterError>;
}
