//! Deployment executor.
//!
//! Deployments run one after another in configuration order. Each one is
//! provisioned in a single collaborator call, then its instances are driven
//! through the lifecycle pipeline sequentially:
//!
//! ```text
//! Provisioned → Labeled → Ready → PostProvisioned → PluginsUploaded →
//! ComponentsInjected → SystemsInjected → PlaybackStarted → Captured →
//! Snapshotted → PlaybackStopped → Stopped
//! ```
//!
//! A failing step ends the pipeline for that instance. The failure is
//! caught at the instance boundary, diagnostics are collected, the instance
//! is optionally stopped, and the run either continues or aborts depending
//! on `continueOnError`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{Instrument, error, info, info_span, warn};

use simfleet_capture::{PlanContext, prepare_captures, resolve_ui_url, run_plans};
use simfleet_core::{ConfigError, DeploymentSpec, Player, PluginError, TemplateTokens, render_metadata};
use simfleet_provision::{InstanceControl, ProvisionRequest, ProvisionedInstance, Provisioner};
use simfleet_sim::{InjectKind, PlaybackAction, SimClient, wait_until_ready};
use simfleet_state::{InstanceRecord, StateStore, timestamp_now};

use crate::error::{FleetError, FleetResult};
use crate::report::{DeploymentReport, FleetReport, InstanceReport, Stage, Status, StopOutcome};
use crate::run::FleetRun;

/// Drives a [`FleetRun`] through its collaborators.
pub struct FleetExecutor {
    provisioner: Box<dyn Provisioner>,
    control: Box<dyn InstanceControl>,
}

/// Per-deployment values shared by every instance.
struct DeploymentContext<'a> {
    run: &'a FleetRun,
    spec: &'a DeploymentSpec,
    store: &'a StateStore,
    config_dir: &'a Path,
    ui_url: Option<&'a str>,
}

impl FleetExecutor {
    pub fn new(provisioner: impl Provisioner + 'static, control: impl InstanceControl + 'static) -> Self {
        Self {
            provisioner: Box::new(provisioner),
            control: Box::new(control),
        }
    }

    /// Execute every deployment and return the aggregated report.
    ///
    /// Never fails: every error ends up in the report.
    pub async fn run(&self, run: &FleetRun) -> FleetReport {
        let mut report = FleetReport::new(
            run.config_path().map(|p| p.display().to_string()),
            &run.run_id,
            run.continue_on_error,
        );
        info!(
            run_id = %run.run_id,
            deployments = run.deployments.len(),
            continue_on_error = run.continue_on_error,
            "fleet run starting"
        );

        for spec in &run.deployments {
            let span = info_span!("deployment", name = %spec.name);
            let (deployment, aborted) = self.run_deployment(run, spec).instrument(span).await;
            report.deployments.push(deployment);
            if aborted {
                warn!(deployment = %spec.name, "aborting fleet run after failure");
                break;
            }
        }

        report.finish();
        info!(run_id = %run.run_id, status = report.status.as_str(), "fleet run finished");
        report
    }

    /// Returns the deployment report and whether the run must stop.
    async fn run_deployment(&self, run: &FleetRun, spec: &DeploymentSpec) -> (DeploymentReport, bool) {
        let mut report = DeploymentReport::new(&spec.name);
        let abort_on_error = !run.continue_on_error;

        let ui_url = match deployment_ui_url(run, spec).await {
            Ok(url) => url,
            Err(err) => {
                error!(kind = err.kind(), error = %err, "deployment rejected");
                report.errors.push(err.to_string());
                report.finish(abort_on_error);
                return (report, abort_on_error);
            }
        };

        let request = ProvisionRequest::from_deployment(spec);
        let output = match self.provisioner.provision(&request).await {
            Ok(output) => output,
            Err(source) => {
                let err = FleetError::Provisioning(source);
                error!(kind = err.kind(), error = %err, "deployment failed");
                report.errors.push(err.to_string());
                report.finish(abort_on_error);
                return (report, abort_on_error);
            }
        };

        let state_path = output
            .state_file
            .as_deref()
            .or(spec.provision.state_file.as_deref())
            .map(PathBuf::from)
            .unwrap_or_else(|| run.state_file.clone());
        report.state_file = Some(state_path.display().to_string());
        let store = StateStore::new(state_path);
        report
            .errors
            .extend(register_instances(&store, &output.instances).iter().map(ToString::to_string));

        let config_dir = run.config_dir();
        let ctx = DeploymentContext {
            run,
            spec,
            store: &store,
            config_dir: &config_dir,
            ui_url: ui_url.as_deref(),
        };

        let mut aborted = false;
        for (index, instance) in output.instances.iter().enumerate() {
            let span = info_span!("instance", id = %instance.id, name = %instance.display_name());
            let mut instance_report = InstanceReport::new(&instance.id, instance.display_name());
            instance_report.stage = Stage::Provisioned;

            let outcome = self
                .run_instance(&ctx, index, instance, &mut instance_report)
                .instrument(span.clone())
                .await;
            if let Err(err) = outcome {
                self.handle_failure(&ctx, &mut instance_report, err)
                    .instrument(span)
                    .await;
                aborted = abort_on_error;
            }
            report.instances.push(instance_report);

            if aborted {
                let skipped = output.instances.len() - index - 1;
                if skipped > 0 {
                    warn!(skipped, "skipping remaining instances");
                }
                break;
            }
        }

        report.finish(aborted);
        info!(
            status = report.status.as_str(),
            instances = report.instances.len(),
            "deployment finished"
        );
        (report, aborted)
    }

    async fn run_instance(
        &self,
        ctx: &DeploymentContext<'_>,
        index: usize,
        instance: &ProvisionedInstance,
        report: &mut InstanceReport,
    ) -> FleetResult<()> {
        let spec = ctx.spec;
        let id = instance.id.as_str();

        let api_url = match &instance.api_url {
            Some(url) => url.clone(),
            None => ctx
                .store
                .endpoint(id)?
                .ok_or_else(|| FleetError::MissingEndpoint(id.to_string()))?,
        };
        report.api_url = Some(api_url.clone());
        let client = SimClient::new(&api_url, instance.auth_token.as_deref()).map_err(FleetError::Api)?;
        let tokens = TemplateTokens::new(&spec.name, &report.name, index, Some(id), &ctx.run.run_id);

        let labels = render_metadata(&spec.labels.instance, &tokens, "labels.instance")?;
        if !labels.is_empty() {
            self.control
                .set_metadata(id, &labels)
                .await
                .map_err(FleetError::Remote)?;
        }
        report.labels.instance = labels;
        report.stage = Stage::Labeled;

        let attempts = wait_until_ready(
            &client,
            Duration::from_millis(spec.ready_timeout_ms),
            Duration::from_millis(spec.ready_interval_ms),
        )
        .await
        .map_err(FleetError::ReadinessTimeout)?;
        info!(attempts, api_url = %api_url, "instance ready");
        report.stage = Stage::Ready;

        for command in &spec.post_provision {
            self.control.exec(id, command).await.map_err(FleetError::Remote)?;
        }
        report.stage = Stage::PostProvisioned;

        for entry in &spec.plugins {
            let upload = entry.locate(ctx.config_dir)?;
            let content = tokio::fs::read_to_string(&upload.source)
                .await
                .map_err(|source| PluginError::Read {
                    path: upload.source.clone(),
                    source,
                })?;
            info!(dest = %upload.dest, source = %upload.source.display(), "uploading plugin");
            client
                .upload_plugin(&upload.dest, &content, upload.overwrite)
                .await
                .map_err(|source| FleetError::PluginUpload {
                    dest: upload.dest.clone(),
                    source,
                })?;
        }
        report.stage = Stage::PluginsUploaded;

        for entry in &spec.components {
            client
                .inject(InjectKind::Component, entry)
                .await
                .map_err(FleetError::Injection)?;
        }
        report.stage = Stage::ComponentsInjected;

        for entry in &spec.systems {
            client
                .inject(InjectKind::System, entry)
                .await
                .map_err(FleetError::Injection)?;
        }
        if !spec.components.is_empty() || !spec.systems.is_empty() {
            verify_system_counts(&client, spec).await;
        }
        report.stage = Stage::SystemsInjected;

        if spec.playback.start {
            client
                .playback(PlaybackAction::Start)
                .await
                .map_err(FleetError::Api)?;
        }
        report.stage = Stage::PlaybackStarted;

        if !spec.captures.is_empty() {
            let plan_ctx = PlanContext {
                config_dir: ctx.config_dir,
                tokens: &tokens,
                ui_url: ctx.ui_url,
                poll_seconds: spec.ui.poll_seconds,
            };
            let plans = prepare_captures(&spec.captures, &plan_ctx).await?;
            report.captures = run_plans(&client, &plans, spec.capture_mode).await?;
        }
        report.stage = Stage::Captured;

        if spec.cleanup.snapshot {
            let labels = render_metadata(&spec.labels.snapshot, &tokens, "labels.snapshot")?;
            let record = self
                .control
                .snapshot(id, &labels)
                .await
                .map_err(FleetError::Cleanup)?;
            if !ctx.store.record_snapshot(id, &record, &ctx.run.run_id)? {
                warn!(snapshot = %record.id, "instance not in state file, snapshot not recorded");
            }
            report.labels.snapshot = labels;
            report.snapshot = Some(record);
        }
        report.stage = Stage::Snapshotted;

        let stop_action = if spec.playback.pause {
            Some(PlaybackAction::Pause)
        } else if spec.playback.stop {
            Some(PlaybackAction::Stop)
        } else {
            None
        };
        if let Some(action) = stop_action {
            client.playback(action).await.map_err(FleetError::Api)?;
        }
        report.stage = Stage::PlaybackStopped;

        if spec.cleanup.stop {
            self.control.stop(id).await.map_err(FleetError::Cleanup)?;
            report.cleanup.stop = Some(StopOutcome::stopped(timestamp_now()));
            ctx.store.record_stop(id, spec.cleanup.forget)?;
        }
        report.stage = Stage::Stopped;

        info!(captures = report.captures.len(), "instance complete");
        Ok(())
    }

    /// Record `err`, collect diagnostics and stop the instance when
    /// `cleanup.stopOnFailure` asks for it. Nothing here replaces `err` as
    /// the instance's primary error.
    async fn handle_failure(&self, ctx: &DeploymentContext<'_>, report: &mut InstanceReport, err: FleetError) {
        error!(kind = err.kind(), error = %err, stage = ?report.stage, "instance failed");
        report.status = Status::Failed;
        report.errors.push(err.to_string());

        if let Err(diag) = self.control.diagnostics(&report.id).await {
            warn!(error = %diag, "diagnostics unavailable");
        }

        if !ctx.spec.cleanup.stop_on_failure || report.cleanup.stop.is_some() {
            return;
        }
        let stopped = self.control.stop(&report.id).await;
        match stopped {
            Ok(()) => {
                report.cleanup.stop_on_failure = Some(StopOutcome::stopped(timestamp_now()));
                if let Err(state_err) = ctx.store.record_stop(&report.id, ctx.spec.cleanup.forget) {
                    warn!(error = %state_err, "failed to record stop");
                }
            }
            Err(stop_err) => {
                warn!(error = %stop_err, "stop after failure failed");
                report.errors.push(format!("Cleanup stop failed: {stop_err}"));
                report.cleanup.stop_on_failure = Some(StopOutcome::failed(stop_err.to_string()));
            }
        }
    }
}

/// Metrics UI address for `spec`, resolved to its WebSocket endpoint.
async fn deployment_ui_url(run: &FleetRun, spec: &DeploymentSpec) -> FleetResult<Option<String>> {
    let Some(raw) = run.ui_url_for(spec) else {
        return Ok(None);
    };
    let url = resolve_ui_url(raw)
        .await
        .map_err(|e| ConfigError::UiUrl(e.to_string()))?;
    info!(ui_url = %url, "metrics UI target");
    Ok(Some(url))
}

/// Add newly provisioned instances to the state file. Existing records are
/// kept; they only gain an apiUrl they were missing.
///
/// An unreadable state file stops registration and is returned as an
/// error for the deployment report.
fn register_instances(store: &StateStore, instances: &[ProvisionedInstance]) -> Vec<FleetError> {
    let mut errors = Vec::new();
    for instance in instances {
        let record = match store.instance(&instance.id) {
            Ok(Some(mut existing)) => match instance.api_url.as_deref() {
                Some(url) if existing.api_url().is_none() => {
                    existing.set_api_url(url);
                    existing
                }
                _ => continue,
            },
            Ok(None) => InstanceRecord::new(&instance.id, instance.api_url.as_deref()),
            Err(err) => {
                warn!(instance = %instance.id, error = %err, "state file unreadable, instances not registered");
                errors.push(FleetError::State(err));
                break;
            }
        };
        if let Err(err) = store.register_instance(record) {
            warn!(instance = %instance.id, error = %err, "failed to register instance");
            errors.push(FleetError::State(err));
        }
    }
    errors
}

/// Warn when a player reports fewer systems than were injected into it.
async fn verify_system_counts(client: &SimClient, spec: &DeploymentSpec) {
    let status = match client.status().await {
        Ok(status) => status,
        Err(err) => {
            warn!(error = %err, "status check after injection failed");
            return;
        }
    };
    for player in [Player::Simulation, Player::Evaluation] {
        let expected = spec.system_count(player);
        if let Some(reported) = status.player(player).system_count {
            if reported < expected as u64 {
                warn!(%player, expected, reported, "player reports fewer systems than injected");
            }
        }
    }
}
