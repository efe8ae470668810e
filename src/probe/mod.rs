//! Connectivity probing.
//!
//! # Data Flow
//! ```text
//! Probe cycle tick
//!     → run_probe (deadline from config)
//!     → Probe::check(target) (websocket.rs / tcp.rs / http.rs)
//!     → ProbeResult { reachable, latency }
//!     → reconnect controller
//! ```
//!
//! # Design Decisions
//! - A timed-out probe is a failure; there is no "unknown" result
//! - Probes are stateless between calls; each check opens a fresh connection
//! - Probe errors never leave this module as errors, only as `reachable = false`

pub mod http;
pub mod tcp;
pub mod websocket;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::config::schema::{ProbeConfig, ProbeKind};
use crate::failover::types::Target;
use crate::observability::metrics;
use crate::resilience::timeouts::with_deadline;

pub use http::HttpProbe;
pub use tcp::TcpProbe;
pub use websocket::WebSocketProbe;

/// Why a probe reported the target unreachable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// The probe did not answer within its deadline.
    #[error("Probe timed out after {0:?}")]
    Timeout(Duration),

    /// The connection could not be established.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The server answered but reported itself unhealthy.
    #[error("Server unhealthy: {0}")]
    Unhealthy(String),
}

/// Checks whether a target is reachable.
#[async_trait]
pub trait Probe: Send + Sync {
    /// Check `target` once. Implementations should not retry internally.
    async fn check(&self, target: Target) -> Result<(), ProbeError>;
}

/// Outcome of a single probe. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub target: Target,
    pub reachable: bool,
    pub timestamp: Instant,
    pub latency: Duration,
    pub error: Option<ProbeError>,
}

impl ProbeResult {
    pub fn reachable(target: Target, timestamp: Instant) -> Self {
        Self {
            target,
            reachable: true,
            timestamp,
            latency: Duration::ZERO,
            error: None,
        }
    }

    pub fn unreachable(target: Target, timestamp: Instant, error: ProbeError) -> Self {
        Self {
            target,
            reachable: false,
            timestamp,
            latency: Duration::ZERO,
            error: Some(error),
        }
    }
}

/// Probe `target` with a deadline and record the outcome.
pub async fn run_probe(probe: &dyn Probe, target: Target, timeout: Duration) -> ProbeResult {
    let started = Instant::now();
    let outcome = match with_deadline(timeout, probe.check(target)).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout(timeout)),
    };
    let latency = started.elapsed();

    metrics::record_probe(target, outcome.is_ok(), latency);

    match outcome {
        Ok(()) => {
            tracing::debug!(server = %target, latency_ms = latency.as_millis() as u64, "Probe succeeded");
            ProbeResult {
                target,
                reachable: true,
                timestamp: Instant::now(),
                latency,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!(server = %target, error = %e, "Probe failed");
            ProbeResult {
                target,
                reachable: false,
                timestamp: Instant::now(),
                latency,
                error: Some(e),
            }
        }
    }
}

/// Build the probe selected by configuration.
pub fn build_probe(config: &ProbeConfig) -> Arc<dyn Probe> {
    match config.kind {
        ProbeKind::Websocket => Arc::new(WebSocketProbe::new(
            config.primary_endpoint.clone(),
            config.backup_endpoint.clone(),
            config.expect_status_message,
        )),
        ProbeKind::Tcp => Arc::new(TcpProbe::new(
            config.primary_endpoint.clone(),
            config.backup_endpoint.clone(),
        )),
        ProbeKind::Http => Arc::new(HttpProbe::new(
            config.primary_endpoint.clone(),
            config.backup_endpoint.clone(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowProbe;

    #[async_trait]
    impl Probe for SlowProbe {
        async fn check(&self, _target: Target) -> Result<(), ProbeError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    struct RefusingProbe;

    #[async_trait]
    impl Probe for RefusingProbe {
        async fn check(&self, _target: Target) -> Result<(), ProbeError> {
            Err(ProbeError::Connect("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_timeout_is_a_failure() {
        let result = run_probe(&SlowProbe, Target::Primary, Duration::from_millis(20)).await;
        assert!(!result.reachable);
        assert_eq!(result.error, Some(ProbeError::Timeout(Duration::from_millis(20))));
    }

    #[tokio::test]
    async fn test_connect_error_is_recorded() {
        let result = run_probe(&RefusingProbe, Target::Backup, Duration::from_secs(1)).await;
        assert!(!result.reachable);
        assert_eq!(result.target, Target::Backup);
        assert!(matches!(result.error, Some(ProbeError::Connect(_))));
    }
}
