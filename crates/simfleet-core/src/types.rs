//! Resolved deployment types.
//!
//! These are the typed view of one fleet deployment after defaults have
//! been merged and every field validated. Nothing downstream reads the raw
//! JSON again.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::PluginError;

/// Built-in instance label templates, used when `defaults` has no `labels`.
pub const DEFAULT_INSTANCE_LABELS: &[&str] = &[
    "simeval.run=${runId}",
    "simeval.deployment=${deployment}",
    "simeval.instance=${instance}",
];

/// Built-in snapshot label templates, used when `defaults` has no `labels`.
pub const DEFAULT_SNAPSHOT_LABELS: &[&str] = &[
    "name=simeval-${deployment}-${instance}-${runId}",
    "simeval.run=${runId}",
    "simeval.deployment=${deployment}",
    "simeval.instance=${instance}",
];

pub const DEFAULT_READY_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_READY_INTERVAL_MS: u64 = 2_000;
pub const DEFAULT_POLL_SECONDS: f64 = 2.0;

/// Which simulation engine a component or system targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    Simulation,
    Evaluation,
}

impl Player {
    /// `eval` and `evaluation` select the evaluation player; anything else,
    /// including nothing, selects the simulation player.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("evaluation" | "eval") => Player::Evaluation,
            _ => Player::Simulation,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Player::Simulation => "simulation",
            Player::Evaluation => "evaluation",
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the provisioning collaborator creates instances from the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Build,
    Clone,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Build => "build",
            Mode::Clone => "clone",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    #[default]
    Parallel,
    Sequential,
}

/// On-disk layout of a capture file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureFormat {
    /// One JSON document per line.
    Jsonl,
    /// A single JSON array.
    Json,
}

impl CaptureFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "jsonl" => Some(CaptureFormat::Jsonl),
            "json" => Some(CaptureFormat::Json),
            _ => None,
        }
    }

    /// `.json` files hold an array, everything else is line-delimited.
    pub fn infer(path: &Path) -> Self {
        let lower = path.to_string_lossy().to_ascii_lowercase();
        if lower.ends_with(".json") {
            CaptureFormat::Json
        } else {
            CaptureFormat::Jsonl
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels {
    pub instance: Vec<String>,
    pub snapshot: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cleanup {
    pub snapshot: bool,
    pub stop: bool,
    pub stop_on_failure: bool,
    pub forget: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Playback {
    pub start: bool,
    pub pause: bool,
    pub stop: bool,
}

impl Default for Playback {
    fn default() -> Self {
        Self {
            start: true,
            pause: false,
            stop: true,
        }
    }
}

/// Arguments handed to the provisioning collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionSpec {
    pub name_prefix: String,
    pub args: Vec<String>,
    pub state_file: Option<String>,
    pub skip_update: bool,
    pub require_update: bool,
    pub memory: Option<String>,
    pub vcpus: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentUi {
    pub url: Option<String>,
    pub poll_seconds: f64,
}

/// A plugin file to upload into the instance's codebase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginEntry {
    pub source: String,
    pub dest: Option<String>,
    pub overwrite: bool,
}

/// A plugin located on disk and ready to upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginUpload {
    pub source: PathBuf,
    pub dest: String,
    pub overwrite: bool,
}

impl PluginEntry {
    /// Resolve the source against `config_dir` and work out the destination.
    ///
    /// Without an explicit `dest`, the destination is everything after the
    /// last `/plugins/` segment of the source path, prefixed with `plugins/`.
    pub fn locate(&self, config_dir: &Path) -> Result<PluginUpload, PluginError> {
        let source = config_dir.join(self.source.trim());
        if !source.exists() {
            return Err(PluginError::NotFound(source));
        }
        if !source.is_file() {
            return Err(PluginError::NotAFile(source));
        }
        let dest = match &self.dest {
            Some(dest) => dest.clone(),
            None => infer_plugin_dest(&source).ok_or_else(|| PluginError::NoDestination(source.clone()))?,
        };
        if !dest.starts_with("plugins/") {
            return Err(PluginError::BadDestination(dest));
        }
        Ok(PluginUpload {
            source,
            dest,
            overwrite: self.overwrite,
        })
    }
}

fn infer_plugin_dest(source: &Path) -> Option<String> {
    let normalized = source.to_string_lossy().replace('\\', "/");
    let index = normalized.rfind("/plugins/")?;
    Some(normalized[index + 1..].to_string())
}

/// A component or system module to inject into a player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectEntry {
    pub player: Player,
    pub module_path: String,
    pub export_name: Option<String>,
}

/// Per-capture metrics UI settings.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CaptureUi {
    /// Use the deployment's UI target if there is one.
    #[default]
    Inherit,
    /// Never forward this capture.
    Disabled,
    /// Forward, failing if no UI target is configured.
    Required {
        capture_id: Option<String>,
        filename: Option<String>,
        poll_seconds: Option<f64>,
    },
}

/// One capture as written in the fleet config.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSpec {
    pub stream: String,
    pub out: String,
    pub format: Option<CaptureFormat>,
    pub frames: Option<u64>,
    pub duration_ms: Option<u64>,
    pub component: Option<String>,
    pub entity: Option<String>,
    pub include_acks: bool,
    pub ui: CaptureUi,
}

/// One deployment with defaults merged and every field validated.
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentSpec {
    pub name: String,
    pub snapshot: String,
    pub mode: Mode,
    pub count: u32,
    pub parallel: u32,
    pub ready_timeout_ms: u64,
    pub ready_interval_ms: u64,
    pub capture_mode: CaptureMode,
    pub labels: Labels,
    pub cleanup: Cleanup,
    pub provision: ProvisionSpec,
    pub playback: Playback,
    pub post_provision: Vec<String>,
    pub ui: DeploymentUi,
    pub plugins: Vec<PluginEntry>,
    pub components: Vec<InjectEntry>,
    pub systems: Vec<InjectEntry>,
    pub captures: Vec<CaptureSpec>,
}

impl DeploymentSpec {
    /// Number of systems injected into `player`.
    pub fn system_count(&self, player: Player) -> usize {
        self.systems.iter().filter(|s| s.player == player).count()
    }
}
