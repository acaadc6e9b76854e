//! HTTP client for one simulation instance.

use std::time::Duration;

use chrono::Utc;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{Value, json};
use tracing::{debug, info};

use simfleet_core::InjectEntry;

use crate::error::{SimError, SimResult};
use crate::types::*;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const AGENT: &str = concat!("simfleet/", env!("CARGO_PKG_VERSION"));

/// `Bearer <token>`, unless the token already carries the prefix.
pub fn auth_header(token: Option<&str>) -> Option<String> {
    let token = token.map(str::trim).filter(|t| !t.is_empty())?;
    if token.starts_with("Bearer ") {
        Some(token.to_string())
    } else {
        Some(format!("Bearer {token}"))
    }
}

/// Unique id attached to mutating requests.
pub fn message_id(suffix: &str) -> String {
    format!("simfleet-{suffix}-{}", Utc::now().format("%Y%m%dT%H%M%S%3fZ"))
}

/// Client bound to one instance's `apiUrl`.
#[derive(Debug, Clone)]
pub struct SimClient {
    http: Client,
    base: String,
    auth: Option<String>,
}

impl SimClient {
    pub fn new(api_url: &str, auth_token: Option<&str>) -> SimResult<Self> {
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .tcp_nodelay(true)
            .build()
            .map_err(SimError::Client)?;
        Ok(Self::with_http(http, api_url, auth_token))
    }

    /// Build a client that shares an existing connection pool.
    pub fn with_http(http: Client, api_url: &str, auth_token: Option<&str>) -> Self {
        Self {
            http,
            base: api_url.trim_end_matches('/').to_string(),
            auth: auth_header(auth_token),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// Join `path` onto the base URL. Absolute URLs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.is_empty() {
            return self.base.clone();
        }
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{path}", self.base)
        } else {
            format!("{}/{path}", self.base)
        }
    }

    /// URL of the event stream named `stream`.
    ///
    /// `simulation`/`sim` (or nothing) and `evaluation`/`eval` map to the
    /// player streams. Anything else is a path under the API or an
    /// absolute URL.
    pub fn stream_url(&self, stream: &str) -> String {
        let trimmed = stream.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" | "simulation" | "sim" => self.url("/simulation/stream"),
            "evaluation" | "eval" => self.url("/evaluation/stream"),
            _ => self.url(trimmed),
        }
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        let builder = builder.header(USER_AGENT, AGENT);
        match &self.auth {
            Some(auth) => builder.header(AUTHORIZATION, auth),
            None => builder,
        }
    }

    async fn send(&self, url: &str, builder: RequestBuilder) -> SimResult<Response> {
        let resp = self
            .request(builder)
            .send()
            .await
            .map_err(|source| SimError::Request {
                url: url.to_string(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SimError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn json_body(url: &str, resp: Response) -> SimResult<Value> {
        let text = resp.text().await.map_err(|source| SimError::Request {
            url: url.to_string(),
            source,
        })?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| SimError::Decode {
            url: url.to_string(),
            detail: e.to_string(),
        })
    }

    async fn post_json(&self, path: &str, payload: &Value) -> SimResult<Value> {
        let url = self.url(path);
        let resp = self
            .send(&url, self.http.post(&url).timeout(REQUEST_TIMEOUT).json(payload))
            .await?;
        Self::json_body(&url, resp).await
    }

    /// `GET /health`; succeeds on any 2xx.
    pub async fn health(&self, timeout: Duration) -> SimResult<()> {
        let url = self.url("/health");
        self.send(&url, self.http.get(&url).timeout(timeout)).await?;
        Ok(())
    }

    /// `GET /status`.
    pub async fn status(&self) -> SimResult<StatusReport> {
        let url = self.url("/status");
        let resp = self
            .send(&url, self.http.get(&url).timeout(REQUEST_TIMEOUT))
            .await?;
        let body = Self::json_body(&url, resp).await?;
        serde_json::from_value(body).map_err(|e| SimError::Decode {
            url,
            detail: e.to_string(),
        })
    }

    /// Inject a component or system module into its player.
    ///
    /// A `status: "error"` body is turned into [`SimError::Rejected`].
    pub async fn inject(&self, kind: InjectKind, entry: &InjectEntry) -> SimResult<InjectResponse> {
        let mut descriptor = json!({ "modulePath": entry.module_path });
        if let Some(export) = &entry.export_name {
            descriptor["exportName"] = Value::from(export.as_str());
        }
        let mut payload = json!({ "messageId": message_id(&format!("{}-inject", kind.as_str())) });
        payload[kind.as_str()] = descriptor;

        let path = format!("/{}/{}", entry.player, kind.as_str());
        let body = self.post_json(&path, &payload).await?;
        let response: InjectResponse = serde_json::from_value(body).unwrap_or_default();
        info!(
            kind = kind.as_str(),
            player = %entry.player,
            module = %entry.module_path,
            status = response.status.as_deref().unwrap_or("unknown"),
            message_id = response.message_id.as_deref().unwrap_or("unknown"),
            system_id = response.system_id.as_deref(),
            "inject response"
        );
        if response.is_error() {
            return Err(SimError::Rejected {
                kind: kind.as_str(),
                module: entry.module_path.clone(),
                detail: response
                    .detail
                    .clone()
                    .unwrap_or_else(|| format!("{} injection failed", kind.as_str())),
            });
        }
        Ok(response)
    }

    /// Upload one plugin file into the instance's codebase.
    pub async fn upload_plugin(&self, dest: &str, content: &str, overwrite: bool) -> SimResult<Value> {
        let payload = json!({
            "messageId": message_id("plugin-upload"),
            "path": dest,
            "content": content,
            "overwrite": overwrite,
        });
        self.post_json("/codebase/plugin", &payload).await
    }

    /// `POST /simulation/{start|pause|stop}`.
    pub async fn playback(&self, action: PlaybackAction) -> SimResult<()> {
        let payload = json!({ "messageId": message_id(action.as_str()) });
        self.post_json(&format!("/simulation/{}", action.as_str()), &payload)
            .await?;
        Ok(())
    }

    /// Open a server-sent-events stream. The response body is left unread.
    pub async fn open_stream(&self, url: &str) -> SimResult<Response> {
        debug!(%url, "opening event stream");
        self.send(url, self.http.get(url).header(ACCEPT, "text/event-stream"))
            .await
    }
}
