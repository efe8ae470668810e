//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guard_probes_total` (counter): probes by target and result
//! - `guard_probe_duration_seconds` (histogram): probe latency by target
//! - `guard_verdicts_total` (counter): reconnect verdicts by target and kind
//! - `guard_switches_total` (counter): switches by direction and outcome
//! - `guard_routing_state` (gauge): 0 = primary, 1 = backup
//! - `guard_notifications_total` (counter): alerts by result
//!
//! # Design Decisions
//! - Recording is a no-op until `init_metrics` installs the exporter
//! - Label values are static strings; no per-intent cardinality

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::failover::types::{Direction, RoutingState, Target};
use crate::reconnect::VerdictKind;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_probe(target: Target, reachable: bool, latency: Duration) {
    let result = if reachable { "reachable" } else { "unreachable" };
    ::metrics::counter!("guard_probes_total", "target" => target.as_str(), "result" => result).increment(1);
    ::metrics::histogram!("guard_probe_duration_seconds", "target" => target.as_str())
        .record(latency.as_secs_f64());
}

pub fn record_verdict(target: Target, kind: VerdictKind) {
    ::metrics::counter!("guard_verdicts_total", "target" => target.as_str(), "verdict" => kind.as_str())
        .increment(1);
}

pub fn record_switch(direction: Direction, applied: bool) {
    let outcome = if applied { "applied" } else { "rolled_back" };
    ::metrics::counter!("guard_switches_total", "direction" => direction.as_str(), "outcome" => outcome)
        .increment(1);
}

pub fn record_routing_state(state: RoutingState) {
    let value = match state {
        RoutingState::OnPrimary => 0.0,
        RoutingState::OnBackup => 1.0,
    };
    ::metrics::gauge!("guard_routing_state").set(value);
}

pub fn record_notification(delivered: bool) {
    let result = if delivered { "delivered" } else { "failed" };
    ::metrics::counter!("guard_notifications_total", "result" => result).increment(1);
}
