use std::path::PathBuf;

use thiserror::Error;

use simfleet_sim::SimError;

pub type CaptureResult<T> = Result<T, CaptureError>;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture {stream}: {message}")]
    Plan { stream: String, message: String },

    #[error("failed to open stream {url}: {source}")]
    Open {
        url: String,
        #[source]
        source: SimError,
    },

    #[error("stream {url} read failed: {source}")]
    Read {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("UI connection to {url} failed: {detail}")]
    UiConnect { url: String, detail: String },

    #[error("UI registration failed: {0}")]
    UiRegister(String),

    #[error("UI rejected live stream: {0}")]
    UiRejected(String),

    #[error("timed out waiting for UI ack")]
    UiTimeout,
}
