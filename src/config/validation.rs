//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, at least one retry)
//! - Check that endpoints and URLs parse for the selected probe kind
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GuardConfig → Result<(), Vec<ValidationError>>
//! - The DNS token is not checked here; it may come from the environment

use std::fmt;
use std::net::SocketAddr;
use url::Url;

use crate::config::schema::{GuardConfig, ProbeKind};

/// One semantic problem with a configuration, keyed by its field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &GuardConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let servers = &config.servers;
    if servers.primary_address.trim().is_empty() {
        errors.push(ValidationError::new("servers.primary_address", "must not be empty"));
    }
    if servers.backup_address.trim().is_empty() {
        errors.push(ValidationError::new("servers.backup_address", "must not be empty"));
    }
    if !servers.primary_address.is_empty() && servers.primary_address == servers.backup_address {
        errors.push(ValidationError::new(
            "servers.backup_address",
            "must differ from the primary address",
        ));
    }

    let probe = &config.probe;
    for (field, endpoint) in [
        ("probe.primary_endpoint", &probe.primary_endpoint),
        ("probe.backup_endpoint", &probe.backup_endpoint),
    ] {
        if let Some(message) = check_endpoint(probe.kind, endpoint) {
            errors.push(ValidationError::new(field, message));
        }
    }
    if probe.timeout_secs == 0 {
        errors.push(ValidationError::new("probe.timeout_secs", "must be greater than 0"));
    }

    let monitor = &config.monitor;
    if monitor.max_retries == 0 {
        errors.push(ValidationError::new("monitor.max_retries", "must be at least 1"));
    }
    for (field, value) in [
        ("monitor.check_interval_secs", monitor.check_interval_secs),
        ("monitor.retry_interval_ms", monitor.retry_interval_ms),
        ("monitor.failback_retry_interval_secs", monitor.failback_retry_interval_secs),
        ("monitor.switch_timeout_secs", monitor.switch_timeout_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than 0"));
        }
    }
    if monitor.max_retry_interval_ms < monitor.retry_interval_ms {
        errors.push(ValidationError::new(
            "monitor.max_retry_interval_ms",
            "must not be below monitor.retry_interval_ms",
        ));
    }

    let dns = &config.dns;
    if let Err(e) = Url::parse(&dns.api_base) {
        errors.push(ValidationError::new("dns.api_base", format!("invalid URL: {}", e)));
    }
    if dns.zone_id.trim().is_empty() {
        errors.push(ValidationError::new("dns.zone_id", "must not be empty"));
    }
    if dns.record_id.trim().is_empty() {
        errors.push(ValidationError::new("dns.record_id", "must not be empty"));
    }
    if dns.update_attempts == 0 {
        errors.push(ValidationError::new("dns.update_attempts", "must be at least 1"));
    }
    if dns.request_timeout_secs == 0 {
        errors.push(ValidationError::new("dns.request_timeout_secs", "must be greater than 0"));
    }
    if dns.adapter_timeout_secs == 0 {
        errors.push(ValidationError::new("dns.adapter_timeout_secs", "must be greater than 0"));
    } else if dns.adapter_timeout_secs >= monitor.switch_timeout_secs {
        errors.push(ValidationError::new(
            "dns.adapter_timeout_secs",
            "must be below monitor.switch_timeout_secs",
        ));
    }

    if let Some(webhook) = &config.notifications.webhook_url {
        if let Err(e) = Url::parse(webhook) {
            errors.push(ValidationError::new(
                "notifications.webhook_url",
                format!("invalid URL: {}", e),
            ));
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "must be a socket address",
        ));
    }

    let admin = &config.admin;
    if admin.enabled {
        if admin.api_key.trim().is_empty() {
            errors.push(ValidationError::new("admin.api_key", "must not be empty when the admin API is enabled"));
        }
        if admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new("admin.bind_address", "must be a socket address"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_endpoint(kind: ProbeKind, endpoint: &str) -> Option<String> {
    if endpoint.trim().is_empty() {
        return Some("must not be empty".to_string());
    }
    match kind {
        ProbeKind::Websocket => match Url::parse(endpoint) {
            Ok(url) if matches!(url.scheme(), "ws" | "wss") => None,
            Ok(url) => Some(format!("expected a ws:// or wss:// URL, got {}://", url.scheme())),
            Err(e) => Some(format!("invalid URL: {}", e)),
        },
        ProbeKind::Http => match Url::parse(endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => None,
            Ok(url) => Some(format!("expected an http:// or https:// URL, got {}://", url.scheme())),
            Err(e) => Some(format!("invalid URL: {}", e)),
        },
        ProbeKind::Tcp => match endpoint.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => None,
            _ => Some("expected host:port".to_string()),
        },
    }
}
