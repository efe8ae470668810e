//! Webhook notifier posting Discord-style embeds.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::failover::types::RoutingState;
use crate::notifier::{GuardEvent, Notifier, NotifierError};

const COLOR_RED: u32 = 0xFF0000;
const COLOR_GREEN: u32 = 0x00FF00;

#[derive(Debug, Serialize)]
struct WebhookPayload {
    content: String,
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    description: String,
    color: u32,
    fields: Vec<EmbedField>,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: String,
    value: String,
    inline: bool,
}

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout: Duration) -> Result<Self, NotifierError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifierError::Http(e.to_string()))?;
        Ok(Self { client, url })
    }
}

fn build_payload(event: &GuardEvent) -> WebhookPayload {
    let on_backup = event.routing_state == RoutingState::OnBackup;
    let color = if on_backup || event.is_alert() { COLOR_RED } else { COLOR_GREEN };
    let status = if on_backup { "Failover Active" } else { "Normal Operation" };

    WebhookPayload {
        content: String::new(),
        embeds: vec![Embed {
            title: event.title().to_string(),
            description: event.description(),
            color,
            fields: vec![
                EmbedField {
                    name: "Current Status".into(),
                    value: status.into(),
                    inline: true,
                },
                EmbedField {
                    name: "Uptime".into(),
                    value: format!("{:.2}%", event.uptime_percentage),
                    inline: true,
                },
                EmbedField {
                    name: "Current IP".into(),
                    value: event.active_address.clone(),
                    inline: true,
                },
            ],
            timestamp: event.timestamp.to_rfc3339(),
        }],
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, event: &GuardEvent) -> Result<(), NotifierError> {
        let response = self
            .client
            .post(&self.url)
            .json(&build_payload(event))
            .send()
            .await
            .map_err(|e| NotifierError::Http(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(NotifierError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
