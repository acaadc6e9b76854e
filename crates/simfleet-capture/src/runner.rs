//! Capture execution.

use std::time::Instant;

use futures_util::StreamExt;
use futures_util::future::join_all;
use serde::Serialize;
use tokio::time::{Sleep, sleep};
use tracing::{debug, info};

use simfleet_core::CaptureMode;
use simfleet_sim::SimClient;

use crate::error::{CaptureError, CaptureResult};
use crate::message::{MessageKind, classify};
use crate::plan::CapturePlan;
use crate::sse::SseDecoder;
use crate::writer::RecordWriter;

/// Outcome of one capture, as recorded in the fleet report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSummary {
    pub stream: String,
    pub output_path: String,
    pub record_count: u64,
    pub frame_count: u64,
    pub ack_count: u64,
    /// Configured time bound.
    pub duration_ms: Option<u64>,
    pub elapsed_ms: u64,
}

#[derive(Default)]
struct Counts {
    frames: u64,
    acks: u64,
}

/// Optional deadline; never fires when the capture has no time bound.
async fn deadline(timer: Option<std::pin::Pin<&mut Sleep>>) {
    match timer {
        Some(timer) => timer.await,
        None => std::future::pending().await,
    }
}

/// Record one stream into `plan.output_path` until its bound is reached.
///
/// The output file is always finished, including when the stream fails.
pub async fn capture_stream(client: &SimClient, plan: &CapturePlan) -> CaptureResult<CaptureSummary> {
    let started = Instant::now();
    let url = client.stream_url(&plan.stream);
    info!(stream = %plan.stream, path = %plan.output_path.display(), "capturing");

    // A UI tails the file while it is written.
    let mut writer = RecordWriter::create(&plan.output_path, plan.format, plan.ui.is_some()).await?;
    let mut counts = Counts::default();
    let outcome = drive(client, plan, &url, &mut writer, &mut counts).await;
    let closed = writer.close().await;
    outcome?;
    closed?;

    let summary = CaptureSummary {
        stream: plan.stream.clone(),
        output_path: plan.output_path.to_string_lossy().into_owned(),
        record_count: counts.frames + counts.acks,
        frame_count: counts.frames,
        ack_count: counts.acks,
        duration_ms: plan.duration.map(|d| d.as_millis() as u64),
        elapsed_ms: started.elapsed().as_millis() as u64,
    };
    info!(
        stream = %summary.stream,
        records = summary.record_count,
        frames = summary.frame_count,
        "capture finished"
    );
    Ok(summary)
}

async fn drive(
    client: &SimClient,
    plan: &CapturePlan,
    url: &str,
    writer: &mut RecordWriter,
    counts: &mut Counts,
) -> CaptureResult<()> {
    let mut timer = plan.duration.map(|d| Box::pin(sleep(d)));

    let response = tokio::select! {
        _ = deadline(timer.as_mut().map(|t| t.as_mut())) => {
            debug!(%url, "time bound reached before stream opened");
            return Ok(());
        }
        opened = client.open_stream(url) => opened.map_err(|source| CaptureError::Open {
            url: url.to_string(),
            source,
        })?,
    };

    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    loop {
        let chunk = tokio::select! {
            _ = deadline(timer.as_mut().map(|t| t.as_mut())) => {
                debug!(%url, "time bound reached");
                return Ok(());
            }
            next = body.next() => next,
        };
        let Some(chunk) = chunk else {
            debug!(%url, "stream ended");
            return Ok(());
        };
        let chunk = chunk.map_err(|source| CaptureError::Read {
            url: url.to_string(),
            source,
        })?;

        for message in decoder.push(&chunk) {
            match classify(&message) {
                MessageKind::Frame => {
                    let Some(record) = plan.filter.apply(&message) else {
                        continue;
                    };
                    writer.write(&record).await?;
                    counts.frames += 1;
                    if plan.max_frames.is_some_and(|max| counts.frames >= max) {
                        return Ok(());
                    }
                }
                // A component filter keeps frames only.
                MessageKind::Ack if plan.include_acks && plan.filter.is_empty() => {
                    writer.write(&message).await?;
                    counts.acks += 1;
                }
                _ => {}
            }
        }
    }
}

/// Run every plan for one instance.
///
/// `Parallel` drives all plans to completion and reports the first failure
/// in plan order; `Sequential` stops at the first failure.
pub async fn run_plans(
    client: &SimClient,
    plans: &[CapturePlan],
    mode: CaptureMode,
) -> CaptureResult<Vec<CaptureSummary>> {
    match mode {
        CaptureMode::Parallel => {
            let results = join_all(plans.iter().map(|plan| capture_stream(client, plan))).await;
            results.into_iter().collect()
        }
        CaptureMode::Sequential => {
            let mut summaries = Vec::with_capacity(plans.len());
            for plan in plans {
                summaries.push(capture_stream(client, plan).await?);
            }
            Ok(summaries)
        }
    }
}
