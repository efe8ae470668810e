//! HTTP health endpoint probe.
//!
//! # Design Decisions
//! - Any 2xx is healthy
//! - Non-success status is reported as unhealthy, not as a connect error
//! - The overall deadline is enforced by the caller

use async_trait::async_trait;

use crate::failover::types::Target;
use crate::probe::{Probe, ProbeError};

pub struct HttpProbe {
    client: reqwest::Client,
    primary_url: String,
    backup_url: String,
}

impl HttpProbe {
    pub fn new(primary_url: String, backup_url: String) -> Self {
        // Idle pooled connections would hide a dead server behind a live socket.
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .user_agent("connectivity-guard-probe")
            .build()
            .unwrap_or_default();
        Self {
            client,
            primary_url,
            backup_url,
        }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self, target: Target) -> Result<(), ProbeError> {
        let url = match target {
            Target::Primary => &self.primary_url,
            Target::Backup => &self.backup_url,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProbeError::Connect(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ProbeError::Unhealthy(format!("HTTP {}", status)))
        }
    }
}
