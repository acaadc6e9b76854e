//! simfleet-capture — bounded telemetry capture from simulation instances.
//!
//! A capture reads one server-sent-events stream from an instance and
//! records frames (and optionally acknowledgements) to a local JSONL or
//! JSON-array file until a frame count or time bound is reached.
//!
//! # Pipeline
//!
//! ```text
//! CaptureSpec ──plan──▶ CapturePlan ──(optional) live_start to metrics UI
//!                            │
//!                            ▼
//! GET stream ─▶ SseDecoder ─▶ classify/filter ─▶ RecordWriter ─▶ file
//! ```
//!
//! Plans for one instance run concurrently or one at a time, per the
//! deployment's capture mode.

pub mod error;
pub mod message;
pub mod plan;
pub mod runner;
pub mod sse;
pub mod ui;
pub mod writer;

pub use error::{CaptureError, CaptureResult};
pub use message::{FrameFilter, MessageKind, classify};
pub use plan::{CapturePlan, PlanContext, UiTarget, plan_capture, prepare_captures};
pub use runner::{CaptureSummary, capture_stream, run_plans};
pub use sse::SseDecoder;
pub use ui::{LiveStart, normalize_ui_url, resolve_ui_url, start_live_stream};
pub use writer::RecordWriter;
