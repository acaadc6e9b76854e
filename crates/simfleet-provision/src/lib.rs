//! simfleet-provision — the orchestrator's subprocess collaborators.
//!
//! Two seams, each a trait so the executor can be driven by stubs:
//!
//! - **`Provisioner`** creates instances for a deployment. The shipped
//!   implementation runs a configurable command and scrapes a JSON payload
//!   from its stdout.
//! - **`InstanceControl`** labels, executes commands on, snapshots and
//!   stops instances. The shipped implementation drives a cloud CLI.
//!
//! Child output is relayed line by line to the log, tagged with a
//! `label:instance` prefix.

pub mod command;
pub mod control;
pub mod error;
pub mod payload;
pub mod provisioner;
pub mod shell;

pub use command::{CommandOutput, run_command};
pub use control::{ControlFuture, InstanceControl, RemoteCli, parse_snapshot};
pub use error::{ProvisionError, ProvisionResult};
pub use payload::{ProvisionOutput, ProvisionedInstance, extract_json_payload};
pub use provisioner::{CommandProvisioner, ProvisionFuture, ProvisionRequest, Provisioner};
pub use shell::wrap_shell_command;
