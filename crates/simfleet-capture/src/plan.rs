//! Capture plan resolution.
//!
//! A [`CaptureSpec`] is written once per deployment; a [`CapturePlan`] is
//! that spec bound to one instance: concrete output path, format, bounds
//! and UI target.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use simfleet_core::template::{render, render_id, render_path};
use simfleet_core::{CaptureFormat, CaptureSpec, CaptureUi, TemplateTokens};

use crate::error::{CaptureError, CaptureResult};
use crate::message::FrameFilter;
use crate::ui::{LiveStart, start_live_stream};

/// Metrics UI destination for one capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiTarget {
    /// Resolved `ws://` or `wss://` control endpoint.
    pub url: String,
    pub capture_id: String,
    pub filename: String,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CapturePlan {
    pub stream: String,
    pub output_path: PathBuf,
    /// Whether an instance suffix was added to keep the path unique.
    pub adjusted_path: bool,
    pub format: CaptureFormat,
    pub max_frames: Option<u64>,
    pub duration: Option<Duration>,
    pub filter: FrameFilter,
    pub include_acks: bool,
    pub ui: Option<UiTarget>,
}

/// Everything outside the spec itself that a plan depends on.
#[derive(Debug, Clone, Copy)]
pub struct PlanContext<'a> {
    /// Base for relative output paths.
    pub config_dir: &'a Path,
    pub tokens: &'a TemplateTokens,
    /// Resolved UI endpoint for the deployment, if any.
    pub ui_url: Option<&'a str>,
    /// Poll interval used when the capture does not set its own.
    pub poll_seconds: f64,
}

/// Bind one capture spec to an instance.
pub fn plan_capture(spec: &CaptureSpec, ctx: &PlanContext<'_>) -> CaptureResult<CapturePlan> {
    let (output_path, adjusted_path) = render_path(&spec.out, ctx.tokens, ctx.config_dir);
    let format = spec
        .format
        .unwrap_or_else(|| CaptureFormat::infer(&output_path));

    let ui = match &spec.ui {
        CaptureUi::Disabled => None,
        CaptureUi::Inherit => ctx
            .ui_url
            .map(|url| ui_target(url, spec, &output_path, None, None, None, ctx)),
        CaptureUi::Required {
            capture_id,
            filename,
            poll_seconds,
        } => {
            let Some(url) = ctx.ui_url else {
                return Err(CaptureError::Plan {
                    stream: spec.stream.clone(),
                    message: "capture UI configured but no ui url available".to_string(),
                });
            };
            Some(ui_target(
                url,
                spec,
                &output_path,
                capture_id.as_deref(),
                filename.as_deref(),
                *poll_seconds,
                ctx,
            ))
        }
    };

    Ok(CapturePlan {
        stream: spec.stream.clone(),
        output_path,
        adjusted_path,
        format,
        max_frames: spec.frames,
        duration: spec.duration_ms.map(Duration::from_millis),
        filter: FrameFilter {
            component: spec.component.clone(),
            entity: spec.entity.clone(),
        },
        include_acks: spec.include_acks,
        ui,
    })
}

fn ui_target(
    url: &str,
    spec: &CaptureSpec,
    output_path: &Path,
    capture_id: Option<&str>,
    filename: Option<&str>,
    poll_seconds: Option<f64>,
    ctx: &PlanContext<'_>,
) -> UiTarget {
    let default_id = format!("${{instance}}-{}", spec.stream);
    let capture_id = render_id(capture_id.unwrap_or(&default_id), ctx.tokens);
    let filename = match filename {
        Some(template) => render(template, ctx.tokens),
        None => output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    let seconds = poll_seconds.unwrap_or(ctx.poll_seconds);
    UiTarget {
        url: url.to_string(),
        capture_id,
        filename,
        poll_interval_ms: (seconds * 1000.0).round() as u64,
    }
}

/// Resolve every capture for an instance, create the output files and
/// register UI live streams.
///
/// Fails on the first capture that cannot be planned or registered.
pub async fn prepare_captures(specs: &[CaptureSpec], ctx: &PlanContext<'_>) -> CaptureResult<Vec<CapturePlan>> {
    let mut plans = Vec::with_capacity(specs.len());
    for spec in specs {
        let plan = plan_capture(spec, ctx)?;
        if plan.adjusted_path {
            info!(path = %plan.output_path.display(), "adjusted capture output");
        }
        ensure_file(&plan.output_path).await?;

        if let Some(ui) = &plan.ui {
            info!(capture_id = %ui.capture_id, path = %plan.output_path.display(), "connecting UI");
            let request = LiveStart {
                source: plan.output_path.to_string_lossy().into_owned(),
                capture_id: ui.capture_id.clone(),
                filename: ui.filename.clone(),
                poll_interval_ms: ui.poll_interval_ms,
            };
            start_live_stream(&ui.url, &request).await?;
        }
        plans.push(plan);
    }
    Ok(plans)
}

/// Create the file and its parents without truncating existing content.
async fn ensure_file(path: &Path) -> CaptureResult<()> {
    let write_err = |source| CaptureError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(write_err)?;
    Ok(())
}
