//! Boundary parser for the provisioning collaborator's stdout.
//!
//! The collaborator prints progress freely and ends with a JSON object
//! describing what it created. The payload is the shortest parseable `{...}`
//! suffix of the trimmed output.

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ProvisionError, ProvisionResult};

/// Extract the trailing JSON object from mixed command output.
///
/// Candidate start positions are tried from the last `{` backwards; the
/// first suffix that parses as a whole wins.
pub fn extract_json_payload(output: &str) -> Option<Value> {
    let trimmed = output.trim();
    trimmed
        .match_indices('{')
        .rev()
        .find_map(|(i, _)| serde_json::from_str::<Value>(&trimmed[i..]).ok())
}

/// One instance as reported by the collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionedInstance {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub api_url: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl ProvisionedInstance {
    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().filter(|n| !n.is_empty()).unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionOutput {
    #[serde(default)]
    pub instances: Vec<ProvisionedInstance>,
    /// State file the collaborator wrote to, if it reports one.
    #[serde(default)]
    pub state_file: Option<String>,
}

impl ProvisionOutput {
    /// Parse collaborator stdout. A missing payload or an empty instance
    /// list is an error.
    pub fn parse(stdout: &str) -> ProvisionResult<Self> {
        let payload = extract_json_payload(stdout).ok_or(ProvisionError::MissingPayload)?;
        let output: ProvisionOutput =
            serde_json::from_value(payload).map_err(|e| ProvisionError::Payload(e.to_string()))?;
        if output.instances.is_empty() {
            return Err(ProvisionError::NoInstances);
        }
        Ok(output)
    }
}
