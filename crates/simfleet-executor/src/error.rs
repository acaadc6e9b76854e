//! Fleet error taxonomy.
//!
//! Every failure that can end an instance or a deployment is one of these
//! variants; library errors are wrapped, never flattened to strings.

use thiserror::Error;

use simfleet_capture::CaptureError;
use simfleet_core::{ConfigError, PluginError, TemplateError};
use simfleet_provision::ProvisionError;
use simfleet_sim::SimError;
use simfleet_state::StateError;

pub type FleetResult<T> = Result<T, FleetError>;

#[derive(Debug, Error)]
pub enum FleetError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("label error: {0}")]
    Labels(#[from] TemplateError),

    #[error("provisioning failed: {0}")]
    Provisioning(#[source] ProvisionError),

    #[error("instance {0} has no apiUrl in provisioning output or state file")]
    MissingEndpoint(String),

    #[error("instance not ready: {0}")]
    ReadinessTimeout(#[source] SimError),

    #[error("injection failed: {0}")]
    Injection(#[source] SimError),

    #[error("plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("plugin upload to {dest} failed: {source}")]
    PluginUpload {
        dest: String,
        #[source]
        source: SimError,
    },

    #[error("simulation API error: {0}")]
    Api(#[source] SimError),

    #[error("capture failed: {0}")]
    Capture(#[from] CaptureError),

    #[error("cleanup failed: {0}")]
    Cleanup(#[source] ProvisionError),

    #[error("state file error: {0}")]
    State(#[from] StateError),

    #[error("remote command failed: {0}")]
    Remote(#[source] ProvisionError),
}

impl FleetError {
    /// Short category name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FleetError::Config(_) | FleetError::Labels(_) => "config",
            FleetError::Provisioning(_) | FleetError::MissingEndpoint(_) => "provisioning",
            FleetError::ReadinessTimeout(_) => "readiness_timeout",
            FleetError::Injection(_) => "injection",
            FleetError::Plugin(_) | FleetError::PluginUpload { .. } => "plugin",
            FleetError::Api(_) => "api",
            FleetError::Capture(_) => "capture",
            FleetError::Cleanup(_) => "cleanup",
            FleetError::State(_) => "state",
            FleetError::Remote(_) => "remote",
        }
    }
}
