//! Live-stream registration against a stub metrics UI.

use std::path::Path;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use simfleet_capture::{CaptureError, LiveStart, PlanContext, prepare_captures, start_live_stream};
use simfleet_core::{CaptureSpec, CaptureUi, TemplateTokens};

#[derive(Clone, Copy)]
enum Reply {
    Ack,
    RejectRegister,
    RejectLiveStart,
}

/// Accept one agent connection and answer per `reply`. Resolves with the
/// `live_start` message, if one arrived.
async fn stub_ui(reply: Reply) -> (String, oneshot::Receiver<Value>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        let mut tx = Some(tx);
        while let Some(Ok(frame)) = ws.next().await {
            let Ok(text) = frame.to_text() else { continue };
            let Ok(message) = serde_json::from_str::<Value>(text) else {
                continue;
            };
            let response = match (message["type"].as_str(), reply) {
                (Some("register"), Reply::RejectRegister) => json!({ "type": "error", "error": "agent slots full" }),
                (Some("register"), _) => json!({ "type": "ack" }),
                (Some("live_start"), Reply::RejectLiveStart) => json!({
                    "type": "error",
                    "error": "source not readable",
                    "request_id": message["request_id"],
                }),
                (Some("live_start"), _) => json!({
                    "type": "ack",
                    "request_id": message["request_id"],
                }),
                _ => continue,
            };
            if message["type"] == "live_start" {
                if let Some(tx) = tx.take() {
                    let _ = tx.send(message.clone());
                }
            }
            if ws.send(Message::Text(response.to_string())).await.is_err() {
                break;
            }
        }
    });
    (format!("ws://{addr}/ws/control"), rx)
}

fn request() -> LiveStart {
    LiveStart {
        source: "/tmp/run/a-1.jsonl".into(),
        capture_id: "a-1-evaluation".into(),
        filename: "a-1.jsonl".into(),
        poll_interval_ms: 2000,
    }
}

#[tokio::test]
async fn live_start_is_acknowledged() {
    let (url, rx) = stub_ui(Reply::Ack).await;
    start_live_stream(&url, &request()).await.unwrap();

    let sent = rx.await.unwrap();
    assert_eq!(sent["source"], "/tmp/run/a-1.jsonl");
    assert_eq!(sent["captureId"], "a-1-evaluation");
    assert_eq!(sent["filename"], "a-1.jsonl");
    assert_eq!(sent["pollIntervalMs"], 2000);
    assert!(sent["request_id"].as_str().unwrap().starts_with("simfleet-ui-live-a-1-evaluation-"));
}

#[tokio::test]
async fn register_error_fails() {
    let (url, _rx) = stub_ui(Reply::RejectRegister).await;
    let err = start_live_stream(&url, &request()).await.unwrap_err();
    match err {
        CaptureError::UiRegister(detail) => assert_eq!(detail, "agent slots full"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn correlated_error_rejects() {
    let (url, _rx) = stub_ui(Reply::RejectLiveStart).await;
    let err = start_live_stream(&url, &request()).await.unwrap_err();
    assert!(matches!(err, CaptureError::UiRejected(ref d) if d == "source not readable"));
}

#[tokio::test]
async fn unreachable_ui_fails_to_connect() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let err = start_live_stream(&format!("ws://{addr}/ws/control"), &request())
        .await
        .unwrap_err();
    assert!(matches!(err, CaptureError::UiConnect { .. }));
}

#[tokio::test]
async fn prepared_capture_registers_output_file() {
    let (url, rx) = stub_ui(Reply::Ack).await;
    let dir = tempfile::tempdir().unwrap();
    let tokens = TemplateTokens::new("a", "a-1", 0, None, "r1");
    let ctx = PlanContext {
        config_dir: dir.path(),
        tokens: &tokens,
        ui_url: Some(&url),
        poll_seconds: 1.5,
    };
    let spec = CaptureSpec {
        stream: "evaluation".into(),
        out: "runs/${instance}.jsonl".into(),
        format: None,
        frames: Some(10),
        duration_ms: None,
        component: None,
        entity: None,
        include_acks: false,
        ui: CaptureUi::Inherit,
    };

    let plans = prepare_captures(&[spec], &ctx).await.unwrap();
    let expected = dir.path().join("runs").join("a-1.jsonl");
    assert_eq!(plans[0].output_path, expected);
    assert!(Path::new(&expected).exists());

    let sent = rx.await.unwrap();
    assert_eq!(sent["source"], expected.to_string_lossy().as_ref());
    assert_eq!(sent["pollIntervalMs"], 1500);
}
