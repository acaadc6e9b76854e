//! Readiness polling.
//!
//! A freshly provisioned instance takes a while before its API answers.
//! [`wait_until_ready`] probes `GET /health` until it passes or the
//! deadline elapses.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::client::SimClient;
use crate::error::{SimError, SimResult};

/// Result of a single health probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    /// The health endpoint returned 2xx.
    Healthy,
    /// The health endpoint answered with a non-2xx status.
    Unhealthy(String),
    /// The probe could not complete (connection error or timeout).
    Failed(String),
}

impl ProbeResult {
    fn detail(&self) -> &str {
        match self {
            ProbeResult::Healthy => "healthy",
            ProbeResult::Unhealthy(detail) | ProbeResult::Failed(detail) => detail,
        }
    }
}

/// Counts probe attempts for one readiness wait.
#[derive(Debug, Default)]
pub struct ReadinessTracker {
    attempts: u32,
    last_error: Option<String>,
}

impl ReadinessTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a probe result. Returns true when the failure should be
    /// logged: the first attempt and every third one after it.
    pub fn record(&mut self, result: &ProbeResult) -> bool {
        self.attempts += 1;
        if *result == ProbeResult::Healthy {
            return false;
        }
        self.last_error = Some(result.detail().to_string());
        self.attempts == 1 || self.attempts % 3 == 0
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> &str {
        self.last_error.as_deref().unwrap_or("no probe completed")
    }
}

/// Probe `GET /health` once, bounded by `timeout`.
pub async fn probe(client: &SimClient, timeout: Duration) -> ProbeResult {
    match client.health(timeout).await {
        Ok(()) => ProbeResult::Healthy,
        Err(SimError::Status { status, body, .. }) => {
            ProbeResult::Unhealthy(format!("status {status}: {body}"))
        }
        Err(e) => ProbeResult::Failed(e.to_string()),
    }
}

/// Poll until the instance reports healthy.
///
/// Each probe is bounded by the time left before `timeout`. Returns the
/// number of attempts taken.
pub async fn wait_until_ready(client: &SimClient, timeout: Duration, interval: Duration) -> SimResult<u32> {
    let started = Instant::now();
    let deadline = started + timeout;
    let mut tracker = ReadinessTracker::new();

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        let result = probe(client, remaining).await;
        let log = tracker.record(&result);
        if result == ProbeResult::Healthy {
            info!(attempts = tracker.attempts(), "server ready");
            return Ok(tracker.attempts());
        }
        if log {
            info!(attempt = tracker.attempts(), error = %result.detail(), "waiting for server");
        } else {
            debug!(attempt = tracker.attempts(), error = %result.detail(), "health probe failed");
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        tokio::time::sleep(interval.min(remaining)).await;
    }

    Err(SimError::ReadinessTimeout {
        waited_ms: started.elapsed().as_millis() as u64,
        last_error: tracker.last_error().to_string(),
    })
}
