//! Metrics UI endpoint resolution and live-stream registration.
//!
//! The UI accepts control messages over a WebSocket. An agent registers
//! itself, then asks the UI to tail a capture file with `live_start`.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

use simfleet_sim::client::message_id;

use crate::error::{CaptureError, CaptureResult};

/// Header a UI server uses to advertise its agent WebSocket endpoint.
pub const AGENT_WS_HEADER: &str = "x-metrics-ui-agent-ws";
const CONTROL_PATH: &str = "/ws/control";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const REGISTER_TIMEOUT: Duration = Duration::from_secs(2);
const LIVE_START_TIMEOUT: Duration = Duration::from_secs(4);

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One `live_start` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveStart {
    /// Path of the file the UI should tail.
    pub source: String,
    pub capture_id: String,
    pub filename: String,
    pub poll_interval_ms: u64,
}

fn invalid(input: &str, detail: impl ToString) -> CaptureError {
    CaptureError::UiConnect {
        url: input.to_string(),
        detail: detail.to_string(),
    }
}

fn parse(input: &str) -> CaptureResult<Url> {
    Url::parse(input).map_err(|e| invalid(input, e))
}

fn swap_scheme(url: &mut Url, scheme: &str, input: &str) -> CaptureResult<()> {
    url.set_scheme(scheme)
        .map_err(|()| invalid(input, format!("cannot use scheme {scheme}")))
}

/// Turn a UI address into a control WebSocket URL.
///
/// `ws://`/`wss://` URLs pass through. `http(s)://` URLs switch scheme and
/// get the control path when they have none. A bare `host:port` becomes
/// `ws://host:port/ws/control`.
pub fn normalize_ui_url(input: &str) -> CaptureResult<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(invalid(input, "empty UI address"));
    }
    if input.starts_with("ws://") || input.starts_with("wss://") {
        return Ok(input.to_string());
    }
    if let Some(secure) = http_scheme(input) {
        let mut url = parse(input)?;
        swap_scheme(&mut url, if secure { "wss" } else { "ws" }, input)?;
        if url.path().is_empty() || url.path() == "/" {
            url.set_path(CONTROL_PATH);
        }
        return Ok(url.to_string());
    }
    Ok(format!("ws://{}{CONTROL_PATH}", input.trim_end_matches('/')))
}

/// HTTP origin of a UI address, used for the endpoint probe.
pub fn ui_http_origin(input: &str) -> CaptureResult<String> {
    let input = input.trim();
    if input.starts_with("ws://") || input.starts_with("wss://") {
        let mut url = parse(input)?;
        let scheme = if input.starts_with("wss://") { "https" } else { "http" };
        swap_scheme(&mut url, scheme, input)?;
        return Ok(url.origin().ascii_serialization());
    }
    if http_scheme(input).is_some() {
        return Ok(parse(input)?.origin().ascii_serialization());
    }
    Ok(format!("http://{}", input.trim_end_matches('/')))
}

fn http_scheme(input: &str) -> Option<bool> {
    if input.starts_with("https://") {
        Some(true)
    } else if input.starts_with("http://") {
        Some(false)
    } else {
        None
    }
}

/// Resolve the advertised agent endpoint from a probe header value.
fn endpoint_from_header(header: &str, origin: &str) -> CaptureResult<Option<String>> {
    let header = header.trim();
    if header.is_empty() {
        return Ok(None);
    }
    if header.starts_with("ws://") || header.starts_with("wss://") {
        return Ok(Some(header.to_string()));
    }
    let mut url = parse(origin)?;
    let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
    swap_scheme(&mut url, scheme, origin)?;
    url.set_query(None);
    url.set_fragment(None);
    url.set_path(&format!("/{}", header.trim_start_matches('/')));
    Ok(Some(url.to_string()))
}

/// Resolve the control WebSocket URL for a UI address.
///
/// WebSocket URLs are used as given. Otherwise the UI is probed with a
/// HEAD request and its advertised endpoint wins; a failed probe falls back
/// to [`normalize_ui_url`].
pub async fn resolve_ui_url(input: &str) -> CaptureResult<String> {
    let normalized = normalize_ui_url(input)?;
    let trimmed = input.trim();
    if trimmed.starts_with("ws://") || trimmed.starts_with("wss://") {
        return Ok(normalized);
    }
    let origin = ui_http_origin(trimmed)?;
    match probe_endpoint(&origin).await {
        Some(header) => Ok(endpoint_from_header(&header, &origin)?.unwrap_or(normalized)),
        None => Ok(normalized),
    }
}

async fn probe_endpoint(origin: &str) -> Option<String> {
    let client = reqwest::Client::builder().timeout(PROBE_TIMEOUT).build().ok()?;
    match client.head(origin).send().await {
        Ok(resp) => resp
            .headers()
            .get(AGENT_WS_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        Err(e) => {
            debug!(origin, error = %e, "UI endpoint probe failed");
            None
        }
    }
}

/// Register with the UI and ask it to tail `request.source`.
///
/// The connection is closed once the UI acknowledges; the UI keeps tailing
/// on its own.
pub async fn start_live_stream(ws_url: &str, request: &LiveStart) -> CaptureResult<()> {
    let (mut socket, _) = tokio::time::timeout(CONNECT_TIMEOUT, tokio_tungstenite::connect_async(ws_url))
        .await
        .map_err(|_| invalid(ws_url, "connect timed out"))?
        .map_err(|e| invalid(ws_url, e))?;

    let result = live_start(&mut socket, ws_url, request).await;
    let _ = socket.close(None).await;
    result
}

async fn live_start(socket: &mut Socket, ws_url: &str, request: &LiveStart) -> CaptureResult<()> {
    send(socket, ws_url, json!({ "type": "register", "role": "agent" })).await?;
    tokio::time::timeout(REGISTER_TIMEOUT, wait_registered(socket))
        .await
        .map_err(|_| CaptureError::UiRegister("no acknowledgement from UI".to_string()))??;

    let request_id = message_id(&format!("ui-live-{}", request.capture_id));
    send(
        socket,
        ws_url,
        json!({
            "type": "live_start",
            "source": request.source,
            "captureId": request.capture_id,
            "filename": request.filename,
            "pollIntervalMs": request.poll_interval_ms,
            "request_id": request_id,
        }),
    )
    .await?;
    tokio::time::timeout(LIVE_START_TIMEOUT, wait_ack(socket, &request_id))
        .await
        .map_err(|_| CaptureError::UiTimeout)??;

    info!(capture_id = %request.capture_id, source = %request.source, "UI live stream started");
    Ok(())
}

async fn send(socket: &mut Socket, ws_url: &str, message: Value) -> CaptureResult<()> {
    socket
        .send(Message::Text(message.to_string()))
        .await
        .map_err(|e| invalid(ws_url, e))
}

/// Next JSON control message; `None` once the connection ends.
async fn next_message(socket: &mut Socket) -> Option<Value> {
    while let Some(frame) = socket.next().await {
        let Ok(frame) = frame else {
            return None;
        };
        if frame.is_close() {
            return None;
        }
        let Ok(text) = frame.into_text() else {
            continue;
        };
        if let Ok(value) = serde_json::from_str::<Value>(&text) {
            return Some(value);
        }
    }
    None
}

fn error_text(message: &Value) -> String {
    message
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("WebSocket error")
        .to_string()
}

async fn wait_registered(socket: &mut Socket) -> CaptureResult<()> {
    while let Some(message) = next_message(socket).await {
        match message.get("type").and_then(Value::as_str) {
            Some("ack") => return Ok(()),
            Some("error") => return Err(CaptureError::UiRegister(error_text(&message))),
            _ => {}
        }
    }
    Err(CaptureError::UiRegister("connection closed".to_string()))
}

async fn wait_ack(socket: &mut Socket, request_id: &str) -> CaptureResult<()> {
    while let Some(message) = next_message(socket).await {
        let matches = message.get("request_id").and_then(Value::as_str) == Some(request_id);
        match message.get("type").and_then(Value::as_str) {
            Some("error") if matches || message.get("request_id").is_none() => {
                return Err(CaptureError::UiRejected(error_text(&message)));
            }
            Some("ack") if matches => return Ok(()),
            _ => {}
        }
    }
    Err(CaptureError::UiRejected("connection closed before acknowledgement".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_ws_urls() {
        assert_eq!(normalize_ui_url("ws://ui:5050/ws/control").unwrap(), "ws://ui:5050/ws/control");
        assert_eq!(normalize_ui_url("http://ui:5050").unwrap(), "ws://ui:5050/ws/control");
        assert_eq!(normalize_ui_url("https://ui.example.com/").unwrap(), "wss://ui.example.com/ws/control");
        assert_eq!(normalize_ui_url("http://ui:5050/agent").unwrap(), "ws://ui:5050/agent");
        assert_eq!(normalize_ui_url("localhost:5050/").unwrap(), "ws://localhost:5050/ws/control");
        assert!(normalize_ui_url("  ").is_err());
    }

    #[test]
    fn http_origins() {
        assert_eq!(ui_http_origin("wss://ui.example.com/ws/control").unwrap(), "https://ui.example.com");
        assert_eq!(ui_http_origin("http://ui:5050/path?q=1").unwrap(), "http://ui:5050");
        assert_eq!(ui_http_origin("ui:5050").unwrap(), "http://ui:5050");
    }

    #[test]
    fn header_endpoints() {
        assert_eq!(
            endpoint_from_header("/ws/agent", "http://ui:5050").unwrap().as_deref(),
            Some("ws://ui:5050/ws/agent")
        );
        assert_eq!(
            endpoint_from_header("agent", "https://ui.example.com").unwrap().as_deref(),
            Some("wss://ui.example.com/agent")
        );
        assert_eq!(
            endpoint_from_header("wss://other/ws", "http://ui").unwrap().as_deref(),
            Some("wss://other/ws")
        );
        assert_eq!(endpoint_from_header(" ", "http://ui").unwrap(), None);
    }
}
