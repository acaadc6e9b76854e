//! Provisioning seam.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::info;

use simfleet_core::{DeploymentSpec, Mode};

use crate::command::run_command;
use crate::error::{ProvisionError, ProvisionResult};
use crate::payload::ProvisionOutput;

/// Boxed future returned by [`Provisioner`] implementations.
pub type ProvisionFuture<'a> = Pin<Box<dyn Future<Output = ProvisionResult<ProvisionOutput>> + Send + 'a>>;

/// Everything the collaborator needs to create a deployment's instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    pub deployment: String,
    pub snapshot: String,
    pub mode: Mode,
    pub count: u32,
    pub parallel: u32,
    pub name_prefix: String,
    pub memory: Option<String>,
    pub vcpus: Option<String>,
    pub state_file: Option<String>,
    pub skip_update: bool,
    pub require_update: bool,
    /// Passed through verbatim after the generated flags.
    pub extra_args: Vec<String>,
}

impl ProvisionRequest {
    pub fn from_deployment(spec: &DeploymentSpec) -> Self {
        Self {
            deployment: spec.name.clone(),
            snapshot: spec.snapshot.clone(),
            mode: spec.mode,
            count: spec.count,
            parallel: spec.parallel,
            name_prefix: spec.provision.name_prefix.clone(),
            memory: spec.provision.memory.clone(),
            vcpus: spec.provision.vcpus.clone(),
            state_file: spec.provision.state_file.clone(),
            skip_update: spec.provision.skip_update,
            require_update: spec.provision.require_update,
            extra_args: spec.provision.args.clone(),
        }
    }

    /// Command-line arguments for the collaborator, starting with the
    /// `provision` subcommand.
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "provision".into(),
            "--snapshot".into(),
            self.snapshot.clone(),
            "--mode".into(),
            self.mode.as_str().into(),
            "--count".into(),
            self.count.to_string(),
            "--parallel".into(),
            self.parallel.to_string(),
            "--name-prefix".into(),
            self.name_prefix.clone(),
        ];
        if let Some(memory) = &self.memory {
            args.extend(["--memory".to_string(), memory.clone()]);
        }
        if let Some(vcpus) = &self.vcpus {
            args.extend(["--vcpus".to_string(), vcpus.clone()]);
        }
        if let Some(state) = &self.state_file {
            args.extend(["--state".to_string(), state.clone()]);
        }
        if self.skip_update {
            args.push("--skip-update".into());
        }
        if self.require_update {
            args.push("--require-update".into());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// Creates the instances for one deployment.
///
/// Injected into the executor so runs can be tested without a cloud.
pub trait Provisioner: Send + Sync {
    fn provision<'a>(&'a self, request: &'a ProvisionRequest) -> ProvisionFuture<'a>;
}

/// Runs an external provisioning command and parses its stdout payload.
#[derive(Debug, Clone)]
pub struct CommandProvisioner {
    argv: Vec<String>,
    timeout: Duration,
}

impl CommandProvisioner {
    /// `argv` is the program and any fixed leading arguments; the request's
    /// arguments are appended.
    pub fn new(argv: Vec<String>, timeout: Duration) -> Self {
        Self { argv, timeout }
    }

    async fn run(&self, request: &ProvisionRequest) -> ProvisionResult<ProvisionOutput> {
        if self.argv.is_empty() {
            return Err(ProvisionError::NoCommand("provisioning"));
        }
        info!(
            deployment = %request.deployment,
            count = request.count,
            snapshot = %request.snapshot,
            mode = request.mode.as_str(),
            "provisioning instances"
        );
        let mut argv = self.argv.clone();
        argv.extend(request.to_args());

        let output = run_command(&argv, &format!("fleet:{}", request.deployment), self.timeout).await?;
        if !output.success() {
            return Err(ProvisionError::Exit {
                what: "provisioning".into(),
                code: output.code,
            });
        }
        let parsed = ProvisionOutput::parse(&output.stdout)?;
        info!(
            deployment = %request.deployment,
            instances = parsed.instances.len(),
            "provisioned"
        );
        Ok(parsed)
    }
}

impl Provisioner for CommandProvisioner {
    fn provision<'a>(&'a self, request: &'a ProvisionRequest) -> ProvisionFuture<'a> {
        Box::pin(self.run(request))
    }
}
