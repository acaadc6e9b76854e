//! simfleet-sim — client for a simulation instance's HTTP API.
//!
//! Every provisioned instance exposes the same API under its `apiUrl`:
//! health and status, component/system injection into either player,
//! plugin upload into the codebase, playback control, and server-sent
//! event streams of frames.
//!
//! # Readiness
//!
//! ```text
//! wait_until_ready
//!   ├── probe GET /health (bounded by the remaining deadline)
//!   ├── ReadinessTracker (attempt count, which failures to log)
//!   └── sleep readyIntervalMs, until readyTimeoutMs elapses
//! ```

pub mod client;
pub mod error;
pub mod readiness;
pub mod types;

pub use client::{SimClient, auth_header, message_id};
pub use error::{SimError, SimResult};
pub use readiness::{ProbeResult, ReadinessTracker, wait_until_ready};
pub use types::*;
