use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::error::GuardError;
use crate::failover::RoutingState;
use crate::monitor::{ManualSwitchReply, StatusSnapshot};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    #[serde(flatten)]
    pub monitor: StatusSnapshot,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        monitor: state.monitor.status(),
    })
}

pub async fn post_failover(State(state): State<AdminState>) -> (StatusCode, Json<ManualSwitchReply>) {
    manual_switch(&state, RoutingState::OnBackup).await
}

pub async fn post_failback(State(state): State<AdminState>) -> (StatusCode, Json<ManualSwitchReply>) {
    manual_switch(&state, RoutingState::OnPrimary).await
}

async fn manual_switch(state: &AdminState, to: RoutingState) -> (StatusCode, Json<ManualSwitchReply>) {
    match state.monitor.request_switch(to).await {
        Ok(reply) => {
            let status = if reply.applied {
                StatusCode::OK
            } else if reply.accepted {
                // The DNS provider refused or timed out.
                StatusCode::BAD_GATEWAY
            } else {
                StatusCode::CONFLICT
            };
            (status, Json(reply))
        }
        Err(e) => {
            let routing_state = state.monitor.status().routing_state;
            let status = match e {
                GuardError::MonitorStopped => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (
                status,
                Json(ManualSwitchReply {
                    accepted: false,
                    applied: false,
                    routing_state,
                    message: e.to_string(),
                }),
            )
        }
    }
}
