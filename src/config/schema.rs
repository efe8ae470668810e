//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the guard.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::resilience::backoff::Escalation;

/// Root configuration for the connectivity guard.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GuardConfig {
    /// The two addresses the DNS record switches between.
    pub servers: ServersConfig,

    /// How reachability is checked.
    pub probe: ProbeConfig,

    /// Tick cadence, retry budget and failover policy.
    pub monitor: MonitorConfig,

    /// DNS provider settings.
    pub dns: DnsConfig,

    /// Operator alerts.
    pub notifications: NotificationConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Record content for each target.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServersConfig {
    /// Address written to the record while on the primary (e.g. "203.0.113.10").
    pub primary_address: String,

    /// Address written to the record while on the backup.
    pub backup_address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProbeKind {
    #[default]
    Websocket,
    Tcp,
    Http,
}

/// Connectivity probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    pub kind: ProbeKind,

    /// Endpoint checked for the primary (URL for websocket/http, host:port for tcp).
    pub primary_endpoint: String,

    /// Endpoint checked for the backup.
    pub backup_endpoint: String,

    /// Probe timeout in seconds. A timed-out probe counts as a failure.
    pub timeout_secs: u64,

    /// WebSocket only: wait for the server's status message.
    pub expect_status_message: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            kind: ProbeKind::Websocket,
            primary_endpoint: String::new(),
            backup_endpoint: String::new(),
            timeout_secs: 5,
            expect_status_message: false,
        }
    }
}

/// Monitor loop and failover policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Interval between probes while healthy, in seconds.
    pub check_interval_secs: u64,

    /// Consecutive failures before the primary is declared down.
    pub max_retries: u32,

    /// Base spacing between reconnect attempts in milliseconds.
    pub retry_interval_ms: u64,

    /// How the spacing grows (fixed, linear, exponential).
    pub retry_escalation: Escalation,

    /// Upper bound on the spacing in milliseconds.
    pub max_retry_interval_ms: u64,

    /// Add up to 10% jitter to the spacing.
    pub retry_jitter: bool,

    /// Switch back to the primary once it recovers.
    pub auto_failback: bool,

    /// Interval between primary probes while on the backup, in seconds.
    pub failback_retry_interval_secs: u64,

    /// Minimum time between two switches in the same direction, in seconds.
    pub cooldown_secs: u64,

    /// Longest a switch may stay in flight, in seconds.
    pub switch_timeout_secs: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 10,
            max_retries: 3,
            retry_interval_ms: 5_000,
            retry_escalation: Escalation::Exponential,
            max_retry_interval_ms: 60_000,
            retry_jitter: true,
            auto_failback: true,
            failback_retry_interval_secs: 30,
            cooldown_secs: 300, // 5 minutes between same-direction switches
            switch_timeout_secs: 120,
        }
    }
}

/// DNS provider configuration (Cloudflare API).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DnsConfig {
    /// API base URL.
    pub api_base: String,

    /// API token. May be left empty and supplied through `GUARD_DNS_API_TOKEN`.
    pub api_token: String,

    pub zone_id: String,

    pub record_id: String,

    /// Record type written on update.
    pub record_type: String,

    /// Whether the provider should proxy the record.
    pub proxied: bool,

    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: u64,

    /// Attempts per intent before reporting failure.
    pub update_attempts: u32,

    /// Delay between update attempts in milliseconds.
    pub update_retry_delay_ms: u64,

    /// Read the record back after updating it.
    pub verify_after_update: bool,

    /// Deadline for a whole apply call, retries included, in seconds.
    pub adapter_timeout_secs: u64,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.cloudflare.com/client/v4".to_string(),
            api_token: String::new(),
            zone_id: String::new(),
            record_id: String::new(),
            record_type: "A".to_string(),
            proxied: false,
            request_timeout_secs: 10,
            update_attempts: 3,
            update_retry_delay_ms: 2_000,
            verify_after_update: true,
            adapter_timeout_secs: 60,
        }
    }
}

/// Operator notification configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Webhook receiving alerts. Alerts only go to the log when unset.
    pub webhook_url: Option<String>,

    /// Webhook request timeout in seconds.
    pub timeout_secs: u64,

    /// How long shutdown waits for queued alerts, in seconds.
    pub drain_timeout_secs: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: 10,
            drain_timeout_secs: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Also append logs to this file.
    pub log_file: Option<String>,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            log_file: None,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
