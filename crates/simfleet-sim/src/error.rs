use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} failed ({status}): {body}")]
    Status { url: String, status: u16, body: String },

    #[error("invalid JSON from {url}: {detail}")]
    Decode { url: String, detail: String },

    #[error("{kind} injection failed for {module}: {detail}")]
    Rejected {
        kind: &'static str,
        module: String,
        detail: String,
    },

    #[error("timed out after {waited_ms}ms waiting for server: {last_error}")]
    ReadinessTimeout { waited_ms: u64, last_error: String },
}
