//! simfleet-executor — runs a fleet of simulation deployments end to end.
//!
//! A [`FleetRun`] bundles the resolved fleet config with operator settings
//! and command-line overrides. [`FleetExecutor::run`] provisions each
//! deployment, drives every instance through its lifecycle and returns a
//! [`FleetReport`] describing what happened, including every failure.
//!
//! Collaborators are injected as trait objects
//! ([`simfleet_provision::Provisioner`], [`simfleet_provision::InstanceControl`])
//! so whole runs can be exercised against stubs.

pub mod error;
pub mod executor;
pub mod report;
pub mod run;

pub use error::{FleetError, FleetResult};
pub use executor::FleetExecutor;
pub use report::{
    AppliedLabels, CleanupReport, DeploymentReport, FleetReport, InstanceReport, Stage, Status, StopOutcome,
    fleet_status,
};
pub use run::{FleetRun, RunOverrides, new_run_id};
