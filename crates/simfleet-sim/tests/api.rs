//! Simulation API client against an in-process stub server.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use simfleet_core::{InjectEntry, Player};
use simfleet_sim::{InjectKind, PlaybackAction, SimClient, SimError, wait_until_ready};

#[derive(Clone, Default)]
struct Stub {
    health_calls: Arc<AtomicU32>,
    /// Health fails until this many calls have been made.
    healthy_after: u32,
    requests: Arc<Mutex<Vec<(String, Option<String>, Value)>>>,
}

impl Stub {
    fn record(&self, path: &str, headers: &HeaderMap, body: Value) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push((path.to_string(), auth, body));
    }
}

async fn health(State(stub): State<Stub>) -> StatusCode {
    let n = stub.health_calls.fetch_add(1, Ordering::SeqCst) + 1;
    if n > stub.healthy_after {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn status() -> Json<Value> {
    Json(json!({
        "simulation": { "state": "running", "tick": 12, "systemCount": 1 },
        "evaluation": { "state": "idle", "systemCount": 0 }
    }))
}

async fn sim_component(State(stub): State<Stub>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    stub.record("/simulation/component", &headers, body);
    Json(json!({ "status": "success", "messageId": "m-1" }))
}

async fn eval_system(State(stub): State<Stub>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    stub.record("/evaluation/system", &headers, body);
    Json(json!({ "status": "error", "detail": "module not found" }))
}

async fn plugin(State(stub): State<Stub>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    stub.record("/codebase/plugin", &headers, body);
    Json(json!({ "status": "success" }))
}

async fn start(State(stub): State<Stub>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    stub.record("/simulation/start", &headers, body);
    Json(json!({ "status": "success" }))
}

async fn serve(stub: Stub) -> SocketAddr {
    let app = Router::new()
        .route("/api/health", get(health))
        .route("/api/status", get(status))
        .route("/api/simulation/component", post(sim_component))
        .route("/api/evaluation/system", post(eval_system))
        .route("/api/codebase/plugin", post(plugin))
        .route("/api/simulation/start", post(start))
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn readiness_waits_for_health() {
    let stub = Stub {
        healthy_after: 2,
        ..Stub::default()
    };
    let addr = serve(stub.clone()).await;
    let client = SimClient::new(&format!("http://{addr}/api"), None).unwrap();

    let attempts = wait_until_ready(&client, Duration::from_secs(5), Duration::from_millis(20))
        .await
        .unwrap();
    assert_eq!(attempts, 3);
    assert_eq!(stub.health_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn readiness_timeout_carries_last_error() {
    let stub = Stub {
        healthy_after: u32::MAX,
        ..Stub::default()
    };
    let addr = serve(stub).await;
    let client = SimClient::new(&format!("http://{addr}/api"), None).unwrap();

    let err = wait_until_ready(&client, Duration::from_millis(200), Duration::from_millis(20))
        .await
        .unwrap_err();
    match err {
        SimError::ReadinessTimeout { last_error, .. } => assert!(last_error.contains("503")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn inject_sends_auth_and_descriptor() {
    let stub = Stub::default();
    let addr = serve(stub.clone()).await;
    let client = SimClient::new(&format!("http://{addr}/api"), Some("tok")).unwrap();

    let entry = InjectEntry {
        player: Player::Simulation,
        module_path: "plugins/econ/wallet.js".into(),
        export_name: Some("Wallet".into()),
    };
    let response = client.inject(InjectKind::Component, &entry).await.unwrap();
    assert_eq!(response.message_id.as_deref(), Some("m-1"));

    let requests = stub.requests.lock().unwrap();
    let (path, auth, body) = &requests[0];
    assert_eq!(path, "/simulation/component");
    assert_eq!(auth.as_deref(), Some("Bearer tok"));
    assert_eq!(body["component"]["modulePath"], "plugins/econ/wallet.js");
    assert_eq!(body["component"]["exportName"], "Wallet");
    assert!(body["messageId"].as_str().unwrap().starts_with("simfleet-component-inject-"));
}

#[tokio::test]
async fn inject_error_status_is_rejected() {
    let stub = Stub::default();
    let addr = serve(stub).await;
    let client = SimClient::new(&format!("http://{addr}/api"), None).unwrap();

    let entry = InjectEntry {
        player: Player::Evaluation,
        module_path: "plugins/score.js".into(),
        export_name: None,
    };
    let err = client.inject(InjectKind::System, &entry).await.unwrap_err();
    match err {
        SimError::Rejected { kind, module, detail } => {
            assert_eq!(kind, "system");
            assert_eq!(module, "plugins/score.js");
            assert_eq!(detail, "module not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn status_upload_and_playback() {
    let stub = Stub::default();
    let addr = serve(stub.clone()).await;
    let client = SimClient::new(&format!("http://{addr}/api"), None).unwrap();

    let status = client.status().await.unwrap();
    assert_eq!(status.player(Player::Simulation).system_count, Some(1));
    assert_eq!(status.evaluation.state.as_deref(), Some("idle"));

    client
        .upload_plugin("plugins/a.js", "export const a = 1;", true)
        .await
        .unwrap();
    client.playback(PlaybackAction::Start).await.unwrap();

    let requests = stub.requests.lock().unwrap();
    assert_eq!(requests[0].0, "/codebase/plugin");
    assert_eq!(requests[0].2["path"], "plugins/a.js");
    assert_eq!(requests[0].2["overwrite"], true);
    assert_eq!(requests[1].0, "/simulation/start");
    assert!(requests[1].2["messageId"].is_string());
    assert_eq!(requests[1].1, None);
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let stub = Stub::default();
    let addr = serve(stub).await;
    let client = SimClient::new(&format!("http://{addr}/api"), None).unwrap();

    let err = client.playback(PlaybackAction::Stop).await.unwrap_err();
    assert!(matches!(err, SimError::Status { status: 404 | 405, .. }));
}
