//! Remote instance control seam and its cloud-CLI implementation.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use simfleet_state::{SnapshotRecord, timestamp_now};

use crate::command::{CommandOutput, run_command};
use crate::error::{ProvisionError, ProvisionResult};
use crate::payload::extract_json_payload;
use crate::shell::wrap_shell_command;

/// Boxed future returned by [`InstanceControl`] methods.
pub type ControlFuture<'a, T> = Pin<Box<dyn Future<Output = ProvisionResult<T>> + Send + 'a>>;

/// Operations on a provisioned instance, outside its simulation API.
pub trait InstanceControl: Send + Sync {
    /// Attach `key=value` metadata labels.
    fn set_metadata<'a>(&'a self, instance_id: &'a str, labels: &'a [String]) -> ControlFuture<'a, ()>;

    /// Run a shell command on the instance; non-zero exit is an error.
    fn exec<'a>(&'a self, instance_id: &'a str, command: &'a str) -> ControlFuture<'a, ()>;

    /// Snapshot the instance with the given metadata labels.
    fn snapshot<'a>(&'a self, instance_id: &'a str, labels: &'a [String]) -> ControlFuture<'a, SnapshotRecord>;

    fn stop<'a>(&'a self, instance_id: &'a str) -> ControlFuture<'a, ()>;

    /// Relay the simulation service's recent log to the local log.
    fn diagnostics<'a>(&'a self, instance_id: &'a str) -> ControlFuture<'a, ()>;
}

/// Read a snapshot record out of the CLI's `--json` output.
///
/// The id is taken from `id`, `snapshotId` or `snapshot_id`; the creation
/// time from `created_at` or `createdAt`, else now.
pub fn parse_snapshot(instance_id: &str, stdout: &str, labels: &[String]) -> ProvisionResult<SnapshotRecord> {
    let parsed = extract_json_payload(stdout).unwrap_or(Value::Null);
    let field = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| parsed.get(*k).and_then(Value::as_str))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };
    let id = field(&["id", "snapshotId", "snapshot_id"])
        .ok_or_else(|| ProvisionError::SnapshotId(instance_id.to_string()))?;
    Ok(SnapshotRecord {
        id,
        created_at: field(&["created_at", "createdAt"]).unwrap_or_else(timestamp_now),
        metadata: labels.to_vec(),
    })
}

/// [`InstanceControl`] backed by a cloud provider CLI
/// (`<cli> instance set-metadata|exec|snapshot|stop ...`).
#[derive(Debug, Clone)]
pub struct RemoteCli {
    argv: Vec<String>,
    service_unit: String,
    timeout: Duration,
}

impl RemoteCli {
    /// `argv` is the CLI program plus any fixed leading arguments.
    pub fn new(argv: Vec<String>, service_unit: impl Into<String>, timeout: Duration) -> Self {
        Self {
            argv,
            service_unit: service_unit.into(),
            timeout,
        }
    }

    async fn instance_cmd(&self, label: &str, instance_id: &str, args: &[&str]) -> ProvisionResult<CommandOutput> {
        if self.argv.is_empty() {
            return Err(ProvisionError::NoCommand("remote control"));
        }
        let mut argv = self.argv.clone();
        argv.push("instance".into());
        argv.extend(args.iter().map(|a| a.to_string()));
        run_command(&argv, &format!("{label}:{instance_id}"), self.timeout).await
    }

    async fn checked(&self, label: &str, instance_id: &str, args: &[&str], what: String) -> ProvisionResult<CommandOutput> {
        let output = self.instance_cmd(label, instance_id, args).await?;
        if !output.success() {
            return Err(ProvisionError::Exit { what, code: output.code });
        }
        Ok(output)
    }

    fn with_metadata<'a>(mut args: Vec<&'a str>, labels: &'a [String]) -> Vec<&'a str> {
        for label in labels {
            args.push("--metadata");
            args.push(label);
        }
        args
    }

    async fn do_set_metadata(&self, instance_id: &str, labels: &[String]) -> ProvisionResult<()> {
        if labels.is_empty() {
            return Ok(());
        }
        info!(instance = %instance_id, entries = labels.len(), "labeling instance");
        let args = Self::with_metadata(vec!["set-metadata", instance_id], labels);
        self.checked("label", instance_id, &args, format!("labeling instance {instance_id}"))
            .await?;
        Ok(())
    }

    async fn do_exec(&self, label: &str, instance_id: &str, command: &str) -> ProvisionResult<CommandOutput> {
        let wrapped = wrap_shell_command(command);
        self.instance_cmd(label, instance_id, &["exec", instance_id, "--", "bash", "-lc", &wrapped])
            .await
    }

    async fn do_snapshot(&self, instance_id: &str, labels: &[String]) -> ProvisionResult<SnapshotRecord> {
        info!(instance = %instance_id, "snapshotting instance");
        let args = Self::with_metadata(vec!["snapshot", instance_id, "--json"], labels);
        let output = self
            .checked("snapshot", instance_id, &args, format!("snapshot of {instance_id}"))
            .await?;
        let record = parse_snapshot(instance_id, &output.stdout, labels)?;
        info!(instance = %instance_id, snapshot = %record.id, "snapshot taken");
        Ok(record)
    }

    async fn do_stop(&self, instance_id: &str) -> ProvisionResult<()> {
        info!(instance = %instance_id, "stopping instance");
        self.checked("stop", instance_id, &["stop", instance_id], format!("stopping instance {instance_id}"))
            .await?;
        Ok(())
    }

    async fn do_diagnostics(&self, instance_id: &str) -> ProvisionResult<()> {
        let command = format!("journalctl -u {} --no-pager -n 200", self.service_unit);
        info!(instance = %instance_id, %command, "collecting diagnostics");
        let output = self.do_exec("journalctl", instance_id, &command).await?;
        if !output.success() {
            warn!(instance = %instance_id, code = ?output.code, "diagnostics command failed");
            return Err(ProvisionError::Exit {
                what: "diagnostics".into(),
                code: output.code,
            });
        }
        Ok(())
    }
}

impl InstanceControl for RemoteCli {
    fn set_metadata<'a>(&'a self, instance_id: &'a str, labels: &'a [String]) -> ControlFuture<'a, ()> {
        Box::pin(self.do_set_metadata(instance_id, labels))
    }

    fn exec<'a>(&'a self, instance_id: &'a str, command: &'a str) -> ControlFuture<'a, ()> {
        Box::pin(async move {
            info!(instance = %instance_id, %command, "exec");
            let output = self.do_exec("exec", instance_id, command).await?;
            if !output.success() {
                return Err(ProvisionError::Exit {
                    what: format!("exec ({command})"),
                    code: output.code,
                });
            }
            Ok(())
        })
    }

    fn snapshot<'a>(&'a self, instance_id: &'a str, labels: &'a [String]) -> ControlFuture<'a, SnapshotRecord> {
        Box::pin(self.do_snapshot(instance_id, labels))
    }

    fn stop<'a>(&'a self, instance_id: &'a str) -> ControlFuture<'a, ()> {
        Box::pin(self.do_stop(instance_id))
    }

    fn diagnostics<'a>(&'a self, instance_id: &'a str) -> ControlFuture<'a, ()> {
        Box::pin(self.do_diagnostics(instance_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_id_aliases() {
        let labels = vec!["simeval.run=r1".to_string()];
        let rec = parse_snapshot("i1", r#"{"id":"snap_1","created_at":"2026-01-01T00:00:00Z"}"#, &labels).unwrap();
        assert_eq!(rec.id, "snap_1");
        assert_eq!(rec.created_at, "2026-01-01T00:00:00Z");
        assert_eq!(rec.metadata, labels);

        let rec = parse_snapshot("i1", "working...\n{\"snapshotId\":\"snap_2\",\"createdAt\":\"t\"}", &[]).unwrap();
        assert_eq!((rec.id.as_str(), rec.created_at.as_str()), ("snap_2", "t"));

        let rec = parse_snapshot("i1", r#"{"snapshot_id":"snap_3"}"#, &[]).unwrap();
        assert_eq!(rec.id, "snap_3");
        assert!(rec.created_at.ends_with('Z'));
    }

    #[test]
    fn snapshot_without_id_fails() {
        assert!(matches!(
            parse_snapshot("i1", r#"{"status":"ok"}"#, &[]),
            Err(ProvisionError::SnapshotId(id)) if id == "i1"
        ));
        assert!(parse_snapshot("i1", "not json", &[]).is_err());
    }
}
