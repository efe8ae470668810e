//! Cloudflare adapter against a local mock of the records API.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use connectivity_guard::config::schema::{DnsConfig, ServersConfig};
use connectivity_guard::dns::{AdapterError, CloudflareSwitch, DnsSwitch};
use connectivity_guard::failover::{RoutingState, Target, TransitionIntent};

#[derive(Default)]
struct MockRecord {
    content: String,
    patches: Vec<Value>,
    reject_next: u32,
    ignore_updates: bool,
}

type Shared = Arc<Mutex<MockRecord>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == "Bearer test-token")
}

async fn get_record(
    State(state): State<Shared>,
    Path((_zone, _record)): Path<(String, String)>,
    headers: HeaderMap,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"success": false, "errors": [{"code": 9109, "message": "Invalid access token"}]})),
        );
    }
    let record = state.lock().unwrap();
    (
        StatusCode::OK,
        Json(json!({"success": true, "errors": [], "result": {"content": record.content}})),
    )
}

async fn patch_record(
    State(state): State<Shared>,
    Path((_zone, _record)): Path<(String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !authorized(&headers) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"success": false, "errors": [{"code": 9109, "message": "Invalid access token"}]})),
        );
    }
    let mut record = state.lock().unwrap();
    record.patches.push(body.clone());
    if record.reject_next > 0 {
        record.reject_next -= 1;
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"success": false, "errors": [{"code": 1004, "message": "DNS Validation Error"}]})),
        );
    }
    if !record.ignore_updates {
        record.content = body["content"].as_str().unwrap_or_default().to_string();
    }
    (
        StatusCode::OK,
        Json(json!({"success": true, "errors": [], "result": {"content": record.content}})),
    )
}

async fn start_mock(initial: &str) -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(MockRecord {
        content: initial.to_string(),
        ..Default::default()
    }));
    let app = Router::new()
        .route(
            "/client/v4/zones/{zone}/dns_records/{record}",
            get(get_record).patch(patch_record),
        )
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/client/v4", addr), state)
}

fn switch_for(api_base: String) -> CloudflareSwitch {
    let dns = DnsConfig {
        api_base,
        api_token: "test-token".to_string(),
        zone_id: "zone123".to_string(),
        record_id: "rec456".to_string(),
        update_attempts: 3,
        update_retry_delay_ms: 10,
        request_timeout_secs: 2,
        ..Default::default()
    };
    let servers = ServersConfig {
        primary_address: "203.0.113.10".to_string(),
        backup_address: "203.0.113.20".to_string(),
    };
    CloudflareSwitch::new(&dns, &servers).unwrap()
}

#[tokio::test]
async fn test_apply_points_record_at_target() {
    let (base, state) = start_mock("203.0.113.10").await;
    let switch = switch_for(base);

    assert_eq!(switch.current_target().await.unwrap(), Some(Target::Primary));

    let intent = TransitionIntent::new(RoutingState::OnPrimary, RoutingState::OnBackup, "test");
    switch.apply(&intent).await.unwrap();

    assert_eq!(switch.current_target().await.unwrap(), Some(Target::Backup));
    let record = state.lock().unwrap();
    assert_eq!(record.patches.len(), 1);
    assert_eq!(record.patches[0], json!({"type": "A", "content": "203.0.113.20", "proxied": false}));
}

#[tokio::test]
async fn test_apply_retries_rejected_update() {
    let (base, state) = start_mock("203.0.113.10").await;
    state.lock().unwrap().reject_next = 2;
    let switch = switch_for(base);

    let intent = TransitionIntent::new(RoutingState::OnPrimary, RoutingState::OnBackup, "test");
    switch.apply(&intent).await.unwrap();
    assert_eq!(state.lock().unwrap().patches.len(), 3);
}

#[tokio::test]
async fn test_apply_gives_up_after_attempts() {
    let (base, state) = start_mock("203.0.113.10").await;
    state.lock().unwrap().reject_next = 10;
    let switch = switch_for(base);

    let intent = TransitionIntent::new(RoutingState::OnPrimary, RoutingState::OnBackup, "test");
    let err = switch.apply(&intent).await.unwrap_err();
    assert!(matches!(err, AdapterError::Api(ref msg) if msg.contains("DNS Validation Error")));
    assert_eq!(state.lock().unwrap().patches.len(), 3);
}

#[tokio::test]
async fn test_apply_detects_unchanged_record() {
    let (base, state) = start_mock("203.0.113.10").await;
    state.lock().unwrap().ignore_updates = true;
    let switch = switch_for(base);

    let intent = TransitionIntent::new(RoutingState::OnPrimary, RoutingState::OnBackup, "test");
    let err = switch.apply(&intent).await.unwrap_err();
    assert_eq!(
        err,
        AdapterError::Verification {
            expected: "203.0.113.20".to_string(),
            actual: "203.0.113.10".to_string(),
        }
    );
}

#[tokio::test]
async fn test_same_intent_twice_is_safe() {
    let (base, _state) = start_mock("203.0.113.10").await;
    let switch = switch_for(base);

    let intent = TransitionIntent::new(RoutingState::OnPrimary, RoutingState::OnBackup, "test");
    switch.apply(&intent).await.unwrap();
    switch.apply(&intent).await.unwrap();
    assert_eq!(switch.current_target().await.unwrap(), Some(Target::Backup));
}

#[tokio::test]
async fn test_unknown_content_maps_to_none() {
    let (base, _state) = start_mock("198.51.100.7").await;
    let switch = switch_for(base);
    assert_eq!(switch.current_target().await.unwrap(), None);
}
