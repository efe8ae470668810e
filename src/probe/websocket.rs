//! WebSocket connectivity probe.
//!
//! Opens a connection, sends a heartbeat frame and, when configured, waits
//! for the server's status message before closing.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::failover::types::Target;
use crate::probe::{Probe, ProbeError};

const HEARTBEAT: &str = r#"{"type":"heartbeat"}"#;

/// Message pushed by the monitored server.
#[derive(Debug, Deserialize)]
struct ServerMessage {
    #[serde(rename = "type")]
    kind: String,
    status: Option<String>,
    error_type: Option<String>,
    message: Option<String>,
}

pub struct WebSocketProbe {
    primary_url: String,
    backup_url: String,
    expect_status: bool,
}

impl WebSocketProbe {
    pub fn new(primary_url: String, backup_url: String, expect_status: bool) -> Self {
        Self {
            primary_url,
            backup_url,
            expect_status,
        }
    }

    fn url_for(&self, target: Target) -> &str {
        match target {
            Target::Primary => &self.primary_url,
            Target::Backup => &self.backup_url,
        }
    }
}

#[async_trait]
impl Probe for WebSocketProbe {
    async fn check(&self, target: Target) -> Result<(), ProbeError> {
        let url = self.url_for(target);
        let (mut ws, _) = connect_async(url)
            .await
            .map_err(|e| ProbeError::Connect(e.to_string()))?;

        ws.send(Message::Text(HEARTBEAT.into()))
            .await
            .map_err(|e| ProbeError::Connect(format!("heartbeat send failed: {}", e)))?;

        let verdict = if self.expect_status {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => parse_status_message(&text),
                Some(Ok(Message::Close(_))) | None => {
                    Err(ProbeError::Connect("connection closed before status".into()))
                }
                Some(Ok(_)) => Ok(()),
                Some(Err(e)) => Err(ProbeError::Connect(e.to_string())),
            }
        } else {
            Ok(())
        };

        // Close errors say nothing about reachability.
        let _ = ws.close(None).await;
        verdict
    }
}

/// Interpret a server status message.
///
/// `status` messages with anything other than `healthy` and `error` messages
/// count as unhealthy. Unknown message types are ignored.
fn parse_status_message(text: &str) -> Result<(), ProbeError> {
    let message: ServerMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unparseable server message");
            return Ok(());
        }
    };

    match message.kind.as_str() {
        "status" => match message.status.as_deref() {
            Some("healthy") => Ok(()),
            other => Err(ProbeError::Unhealthy(format!(
                "status {}",
                other.unwrap_or("missing")
            ))),
        },
        "error" => Err(ProbeError::Unhealthy(format!(
            "{}: {}",
            message.error_type.as_deref().unwrap_or("error"),
            message.message.as_deref().unwrap_or("")
        ))),
        other => {
            tracing::debug!(kind = %other, "Unknown server message type");
            Ok(())
        }
    }
}
