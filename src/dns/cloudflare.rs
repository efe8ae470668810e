//! Cloudflare DNS switch adapter.
//!
//! # Responsibilities
//! - PATCH one DNS record to the address of the intent's target
//! - Retry failed updates a bounded number of times
//! - Optionally read the record back to confirm the change
//! - Report the record's current target at startup

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::schema::{DnsConfig, ServersConfig};
use crate::dns::{AdapterError, DnsSwitch};
use crate::failover::types::{Target, TransitionIntent};
use crate::resilience::backoff::{calculate_backoff, Escalation};

/// Environment variable overriding `dns.api_token`.
pub const API_TOKEN_ENV: &str = "GUARD_DNS_API_TOKEN";

#[derive(Debug, Serialize)]
struct RecordUpdate<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    content: &'a str,
    proxied: bool,
}

#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<RecordResult>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RecordResult {
    content: String,
}

#[derive(Clone)]
pub struct CloudflareSwitch {
    client: reqwest::Client,
    record_url: String,
    api_token: String,
    primary_address: String,
    backup_address: String,
    record_type: String,
    proxied: bool,
    update_attempts: u32,
    retry_delay: Duration,
    verify: bool,
}

impl CloudflareSwitch {
    pub fn new(dns: &DnsConfig, servers: &ServersConfig) -> Result<Self, AdapterError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(dns.request_timeout_secs))
            .build()
            .map_err(|e| AdapterError::Http(e.to_string()))?;

        let api_token = std::env::var(API_TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| dns.api_token.clone());
        if api_token.is_empty() {
            return Err(AdapterError::Api(format!(
                "no API token configured (set dns.api_token or {})",
                API_TOKEN_ENV
            )));
        }

        let record_url = format!(
            "{}/zones/{}/dns_records/{}",
            dns.api_base.trim_end_matches('/'),
            dns.zone_id,
            dns.record_id
        );

        tracing::info!(
            record_url = %record_url,
            primary = %servers.primary_address,
            backup = %servers.backup_address,
            "Cloudflare adapter initialized"
        );

        Ok(Self {
            client,
            record_url,
            api_token,
            primary_address: servers.primary_address.clone(),
            backup_address: servers.backup_address.clone(),
            record_type: dns.record_type.clone(),
            proxied: dns.proxied,
            update_attempts: dns.update_attempts.max(1),
            retry_delay: Duration::from_millis(dns.update_retry_delay_ms),
            verify: dns.verify_after_update,
        })
    }

    fn address_for(&self, target: Target) -> &str {
        match target {
            Target::Primary => &self.primary_address,
            Target::Backup => &self.backup_address,
        }
    }

    async fn update_record(&self, content: &str) -> Result<(), AdapterError> {
        let body = RecordUpdate {
            record_type: &self.record_type,
            content,
            proxied: self.proxied,
        };
        let response = self
            .client
            .patch(&self.record_url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::Http(e.to_string()))?;

        let envelope = read_envelope(response).await?;
        if !envelope.success {
            return Err(AdapterError::Api(describe_errors(&envelope.errors)));
        }
        Ok(())
    }

    async fn fetch_content(&self) -> Result<String, AdapterError> {
        let response = self
            .client
            .get(&self.record_url)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| AdapterError::Http(e.to_string()))?;

        let envelope = read_envelope(response).await?;
        match envelope.result {
            Some(record) if envelope.success => Ok(record.content),
            _ => Err(AdapterError::Api(describe_errors(&envelope.errors))),
        }
    }

    async fn apply_once(&self, content: &str) -> Result<(), AdapterError> {
        self.update_record(content).await?;
        if self.verify {
            let actual = self.fetch_content().await?;
            if actual != content {
                return Err(AdapterError::Verification {
                    expected: content.to_string(),
                    actual,
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DnsSwitch for CloudflareSwitch {
    async fn apply(&self, intent: &TransitionIntent) -> Result<(), AdapterError> {
        let content = self.address_for(intent.to.target());
        let mut last_error = None;

        for attempt in 1..=self.update_attempts {
            match self.apply_once(content).await {
                Ok(()) => {
                    tracing::info!(
                        intent_id = %intent.id,
                        content = %content,
                        attempt,
                        "DNS record updated"
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        intent_id = %intent.id,
                        attempt,
                        max_attempts = self.update_attempts,
                        error = %e,
                        "DNS update attempt failed"
                    );
                    last_error = Some(e);
                    if attempt < self.update_attempts {
                        let delay = calculate_backoff(attempt, self.retry_delay, self.retry_delay, Escalation::Fixed);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AdapterError::Api("no update attempted".into())))
    }

    async fn current_target(&self) -> Result<Option<Target>, AdapterError> {
        let content = self.fetch_content().await?;
        if content == self.primary_address {
            Ok(Some(Target::Primary))
        } else if content == self.backup_address {
            Ok(Some(Target::Backup))
        } else {
            tracing::warn!(content = %content, "DNS record matches neither configured address");
            Ok(None)
        }
    }
}

impl std::fmt::Debug for CloudflareSwitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the token.
        f.debug_struct("CloudflareSwitch")
            .field("record_url", &self.record_url)
            .field("primary_address", &self.primary_address)
            .field("backup_address", &self.backup_address)
            .field("update_attempts", &self.update_attempts)
            .finish()
    }
}

async fn read_envelope(response: reqwest::Response) -> Result<ApiEnvelope, AdapterError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| AdapterError::Http(e.to_string()))?;

    match serde_json::from_str::<ApiEnvelope>(&text) {
        Ok(envelope) => Ok(envelope),
        Err(_) if !status.is_success() => Err(AdapterError::Api(format!("HTTP {}: {}", status, text))),
        Err(e) => Err(AdapterError::Api(format!("unparseable response: {}", e))),
    }
}

fn describe_errors(errors: &[ApiMessage]) -> String {
    if errors.is_empty() {
        return "request unsuccessful".to_string();
    }
    errors
        .iter()
        .map(|e| format!("{} ({})", e.message, e.code))
        .collect::<Vec<_>>()
        .join(", ")
}
