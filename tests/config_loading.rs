//! Loading configuration files from disk.

use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

use connectivity_guard::config::schema::{LogFormat, ProbeKind};
use connectivity_guard::config::{load_config, ConfigError};
use connectivity_guard::monitor::MonitorSettings;
use connectivity_guard::resilience::Escalation;

const FULL_CONFIG: &str = r#"
[servers]
primary_address = "203.0.113.10"
backup_address = "203.0.113.20"

[probe]
kind = "websocket"
primary_endpoint = "wss://primary.example.com/ws"
backup_endpoint = "wss://backup.example.com/ws"
timeout_secs = 3
expect_status_message = true

[monitor]
check_interval_secs = 15
max_retries = 4
retry_interval_ms = 2000
retry_escalation = "linear"
auto_failback = false
cooldown_secs = 600

[dns]
zone_id = "zone123"
record_id = "rec456"
proxied = true

[notifications]
webhook_url = "https://discord.com/api/webhooks/1/abc"

[observability]
log_level = "debug"
log_format = "json"

[admin]
enabled = true
api_key = "s3cret"
bind_address = "127.0.0.1:9181"
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_config(FULL_CONFIG);
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.servers.backup_address, "203.0.113.20");
    assert_eq!(config.probe.kind, ProbeKind::Websocket);
    assert!(config.probe.expect_status_message);
    assert_eq!(config.monitor.max_retries, 4);
    assert!(config.dns.proxied);
    assert_eq!(config.dns.record_type, "A");
    assert_eq!(config.observability.log_format, LogFormat::Json);
    assert!(config.admin.enabled);

    let settings = MonitorSettings::from_config(&config);
    assert_eq!(settings.check_interval, Duration::from_secs(15));
    assert_eq!(settings.retry_policy.escalation, Escalation::Linear);
    assert_eq!(settings.failover.cooldown, Duration::from_secs(600));
    assert!(!settings.failover.auto_failback);
    assert_eq!(settings.probe_timeout, Duration::from_secs(3));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_malformed_toml_is_parse_error() {
    let file = write_config("[servers\nprimary_address = ");
    let err = load_config(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_invalid_values_are_all_reported() {
    let broken = FULL_CONFIG
        .replace("max_retries = 4", "max_retries = 0")
        .replace("wss://backup.example.com/ws", "http://backup.example.com")
        .replace("api_key = \"s3cret\"", "api_key = \"\"");
    let file = write_config(&broken);

    let ConfigError::Validation(errors) = load_config(file.path()).unwrap_err() else {
        panic!("expected validation errors");
    };
    let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
    assert_eq!(
        fields,
        vec!["probe.backup_endpoint", "monitor.max_retries", "admin.api_key"]
    );
}

#[test]
fn test_example_config_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("config/guard.example.toml");
    load_config(&path).unwrap();
}
