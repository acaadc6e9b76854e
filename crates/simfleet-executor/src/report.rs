//! Run reports and status aggregation.
//!
//! The report tree mirrors the fleet: one [`FleetReport`] holding a
//! [`DeploymentReport`] per deployment that ran, each holding an
//! [`InstanceReport`] per provisioned instance. It is printed as JSON by
//! the CLI regardless of outcome.

use serde::Serialize;

use simfleet_capture::CaptureSummary;
use simfleet_state::SnapshotRecord;

/// Steps of the per-instance lifecycle, in execution order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    #[default]
    Pending,
    Provisioned,
    Labeled,
    Ready,
    PostProvisioned,
    PluginsUploaded,
    ComponentsInjected,
    SystemsInjected,
    PlaybackStarted,
    Captured,
    Snapshotted,
    PlaybackStopped,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Partial,
    Failed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::Partial => "partial",
            Status::Failed => "failed",
        }
    }
}

/// Result of a stop request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StopOutcome {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stopped_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StopOutcome {
    pub fn stopped(at: String) -> Self {
        Self {
            status: "stopped",
            stopped_at: Some(at),
            error: None,
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            status: "failed",
            stopped_at: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<StopOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_on_failure: Option<StopOutcome>,
}

/// Rendered labels actually applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppliedLabels {
    pub instance: Vec<String>,
    pub snapshot: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceReport {
    pub id: String,
    pub name: String,
    pub api_url: Option<String>,
    pub status: Status,
    /// Last lifecycle step that completed.
    pub stage: Stage,
    pub captures: Vec<CaptureSummary>,
    pub snapshot: Option<SnapshotRecord>,
    pub cleanup: CleanupReport,
    pub labels: AppliedLabels,
    pub errors: Vec<String>,
}

impl InstanceReport {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            api_url: None,
            status: Status::Ok,
            stage: Stage::Pending,
            captures: Vec::new(),
            snapshot: None,
            cleanup: CleanupReport::default(),
            labels: AppliedLabels::default(),
            errors: Vec::new(),
        }
    }

    pub fn failed(&self) -> bool {
        self.status == Status::Failed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentReport {
    pub name: String,
    pub status: Status,
    pub state_file: Option<String>,
    pub instances: Vec<InstanceReport>,
    /// Failures not tied to a single instance, such as provisioning.
    pub errors: Vec<String>,
}

impl DeploymentReport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: Status::Ok,
            state_file: None,
            instances: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Set `status` from the instance outcomes.
    ///
    /// `aborted` means a failure stopped the run before this deployment
    /// finished.
    pub fn finish(&mut self, aborted: bool) {
        let failed = self.instances.iter().filter(|i| i.failed()).count();
        self.status = if !self.errors.is_empty() && self.instances.is_empty() {
            Status::Failed
        } else if aborted || (failed > 0 && failed == self.instances.len()) {
            Status::Failed
        } else if failed > 0 || !self.errors.is_empty() {
            Status::Partial
        } else {
            Status::Ok
        };
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetReport {
    pub status: Status,
    /// Path of the fleet config file.
    pub config: Option<String>,
    pub run_id: String,
    pub continue_on_error: bool,
    pub deployments: Vec<DeploymentReport>,
    pub errors: Vec<String>,
}

impl FleetReport {
    pub fn new(config: Option<String>, run_id: &str, continue_on_error: bool) -> Self {
        Self {
            status: Status::Ok,
            config,
            run_id: run_id.to_string(),
            continue_on_error,
            deployments: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Collect deployment and instance errors and set `status`.
    pub fn finish(&mut self) {
        for deployment in &self.deployments {
            self.errors
                .extend(deployment.errors.iter().map(|e| format!("{}: {e}", deployment.name)));
            for instance in &deployment.instances {
                self.errors.extend(
                    instance
                        .errors
                        .iter()
                        .map(|e| format!("{}/{}: {e}", deployment.name, instance.name)),
                );
            }
        }
        self.status = fleet_status(&self.deployments, self.continue_on_error);
    }

    /// Whether the CLI should exit successfully.
    pub fn succeeded(&self) -> bool {
        match self.status {
            Status::Ok => true,
            Status::Partial => self.continue_on_error,
            Status::Failed => false,
        }
    }
}

/// `ok` iff every deployment is `ok`; `failed` when errors were not
/// tolerated or every deployment failed; `partial` otherwise.
pub fn fleet_status(deployments: &[DeploymentReport], continue_on_error: bool) -> Status {
    if deployments.iter().all(|d| d.status == Status::Ok) {
        return Status::Ok;
    }
    if !continue_on_error || deployments.iter().all(|d| d.status == Status::Failed) {
        return Status::Failed;
    }
    Status::Partial
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(failed: bool) -> InstanceReport {
        let mut report = InstanceReport::new("i", "n");
        if failed {
            report.status = Status::Failed;
            report.errors.push("boom".into());
        }
        report
    }

    fn deployment(name: &str, outcomes: &[bool], aborted: bool) -> DeploymentReport {
        let mut report = DeploymentReport::new(name);
        report.instances = outcomes.iter().map(|f| instance(*f)).collect();
        report.finish(aborted);
        report
    }

    #[test]
    fn deployment_statuses() {
        assert_eq!(deployment("d", &[false, false], false).status, Status::Ok);
        assert_eq!(deployment("d", &[false, true], false).status, Status::Partial);
        assert_eq!(deployment("d", &[true, true], false).status, Status::Failed);
        assert_eq!(deployment("d", &[true], true).status, Status::Failed);

        let mut provisioning = DeploymentReport::new("d");
        provisioning.errors.push("provisioning failed".into());
        provisioning.finish(false);
        assert_eq!(provisioning.status, Status::Failed);
    }

    #[test]
    fn fleet_statuses() {
        let ok = deployment("a", &[false], false);
        let partial = deployment("b", &[false, true], false);
        let failed = deployment("c", &[true], false);

        assert_eq!(fleet_status(&[ok.clone(), ok.clone()], false), Status::Ok);
        assert_eq!(fleet_status(&[ok.clone(), partial.clone()], true), Status::Partial);
        assert_eq!(fleet_status(&[ok.clone(), failed.clone()], true), Status::Partial);
        assert_eq!(fleet_status(&[ok.clone(), partial], false), Status::Failed);
        assert_eq!(fleet_status(&[failed.clone(), failed], true), Status::Failed);
        assert_eq!(fleet_status(&[], true), Status::Ok);
        assert_eq!(fleet_status(&[ok], true), Status::Ok);
    }

    #[test]
    fn fleet_errors_are_attributed() {
        let mut report = FleetReport::new(Some("fleet.json".into()), "r1", true);
        report.deployments.push(deployment("a", &[false, true], false));
        report.finish();
        assert_eq!(report.status, Status::Partial);
        assert_eq!(report.errors, vec!["a/n: boom".to_string()]);
        assert!(report.succeeded());

        let mut strict = FleetReport::new(None, "r1", false);
        strict.deployments.push(deployment("a", &[true], true));
        strict.finish();
        assert_eq!(strict.status, Status::Failed);
        assert!(!strict.succeeded());
    }

    #[test]
    fn report_json_shape() {
        let mut report = InstanceReport::new("inst_1", "a-1");
        report.cleanup.stop = Some(StopOutcome::stopped("2026-01-01T00:00:00.000Z".into()));
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["stage"], "pending");
        assert_eq!(value["apiUrl"], serde_json::Value::Null);
        assert_eq!(value["cleanup"]["stop"]["stoppedAt"], "2026-01-01T00:00:00.000Z");
        assert!(value["cleanup"].get("stopOnFailure").is_none());
    }
}
