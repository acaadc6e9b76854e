//! Operator settings (`~/.simfleet/config.toml`).
//!
//! Machine-wide defaults that sit below anything in a fleet config or on
//! the command line: the default snapshot, the metrics UI, where the
//! instance state file lives, and how to reach the provisioning and remote
//! control tools.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SettingsError;

pub const SETTINGS_ENV: &str = "SIMFLEET_SETTINGS";
pub const STATE_FILE_ENV: &str = "SIMFLEET_STATE_FILE";

const DEFAULT_REMOTE_CLI: &str = "morphcloud";
const DEFAULT_SERVICE_UNIT: &str = "simeval.service";
const DEFAULT_PROVISIONER: &str = "simfleet-provisioner";
const DEFAULT_PROVISION_TIMEOUT_SECS: u64 = 1800;
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Snapshot used when the fleet config's defaults name none.
    pub snapshot: Option<String>,
    /// Fleet config used when `--config` is not given.
    pub fleet_config: Option<PathBuf>,
    /// Metrics UI used when neither the CLI nor the fleet config names one.
    pub ui_url: Option<String>,
    pub state_file: Option<PathBuf>,
    /// Program and leading arguments of the provisioning collaborator.
    pub provisioner: Vec<String>,
    pub remote_cli: Option<String>,
    pub service_unit: Option<String>,
    pub provision_timeout_secs: Option<u64>,
    pub command_timeout_secs: Option<u64>,
}

impl Settings {
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Locate and load settings for this process.
    ///
    /// `explicit` (from `--settings`) wins, then `$SIMFLEET_SETTINGS`, then
    /// `~/.simfleet/config.toml`.
    pub fn discover(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        Self::discover_with(explicit, std::env::var_os(SETTINGS_ENV), dirs::home_dir())
    }

    /// [`Settings::discover`] with the environment passed in.
    ///
    /// A path named explicitly or through the environment must exist. The
    /// home-directory default is optional.
    pub fn discover_with(
        explicit: Option<&Path>,
        env_path: Option<OsString>,
        home: Option<PathBuf>,
    ) -> Result<Self, SettingsError> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        if let Some(path) = env_path.filter(|p| !p.is_empty()) {
            return Self::from_file(Path::new(&path));
        }
        let Some(home) = home else {
            return Ok(Self::default());
        };
        let path = home.join(".simfleet").join("config.toml");
        if !path.exists() {
            debug!(?path, "no settings file, using defaults");
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    /// Where the instance state file lives.
    ///
    /// Command line, then `$SIMFLEET_STATE_FILE`, then settings, then
    /// `~/.simfleet/instances.json`.
    pub fn state_file_path(&self, cli: Option<&Path>) -> PathBuf {
        self.state_file_path_with(cli, std::env::var_os(STATE_FILE_ENV), dirs::home_dir())
    }

    pub fn state_file_path_with(
        &self,
        cli: Option<&Path>,
        env_path: Option<OsString>,
        home: Option<PathBuf>,
    ) -> PathBuf {
        if let Some(path) = cli {
            return path.to_path_buf();
        }
        if let Some(path) = env_path.filter(|p| !p.is_empty()) {
            return PathBuf::from(path);
        }
        if let Some(path) = &self.state_file {
            return path.clone();
        }
        home.unwrap_or_else(|| PathBuf::from("."))
            .join(".simfleet")
            .join("instances.json")
    }

    pub fn remote_cli(&self) -> &str {
        self.remote_cli.as_deref().unwrap_or(DEFAULT_REMOTE_CLI)
    }

    pub fn service_unit(&self) -> &str {
        self.service_unit.as_deref().unwrap_or(DEFAULT_SERVICE_UNIT)
    }

    /// Provisioner program and leading arguments.
    pub fn provisioner_argv(&self) -> Vec<String> {
        if self.provisioner.is_empty() {
            vec![DEFAULT_PROVISIONER.to_string()]
        } else {
            self.provisioner.clone()
        }
    }

    pub fn provision_timeout(&self) -> Duration {
        Duration::from_secs(
            self.provision_timeout_secs
                .unwrap_or(DEFAULT_PROVISION_TIMEOUT_SECS),
        )
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs.unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full() {
        let toml_str = r#"
snapshot = "snap-base"
ui_url = "http://localhost:5050"
state_file = "/var/lib/simfleet/instances.json"
provisioner = ["node", "tools/provision.js"]
remote_cli = "cloudctl"
service_unit = "sim.service"
provision_timeout_secs = 60
command_timeout_secs = 30
"#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.snapshot.as_deref(), Some("snap-base"));
        assert_eq!(settings.provisioner_argv(), vec!["node", "tools/provision.js"]);
        assert_eq!(settings.remote_cli(), "cloudctl");
        assert_eq!(settings.service_unit(), "sim.service");
        assert_eq!(settings.provision_timeout(), Duration::from_secs(60));
        assert_eq!(settings.command_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn defaults_when_empty() {
        let settings: Settings = toml::from_str("").unwrap();
        assert_eq!(settings.remote_cli(), "morphcloud");
        assert_eq!(settings.service_unit(), "simeval.service");
        assert_eq!(settings.provisioner_argv(), vec!["simfleet-provisioner"]);
        assert_eq!(settings.provision_timeout(), Duration::from_secs(1800));
    }

    #[test]
    fn missing_home_file_is_default() {
        let home = tempfile::tempdir().unwrap();
        let settings = Settings::discover_with(None, None, Some(home.path().to_path_buf())).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn home_file_is_loaded() {
        let home = tempfile::tempdir().unwrap();
        let dir = home.path().join(".simfleet");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("config.toml"), "snapshot = \"from-home\"\n").unwrap();
        let settings = Settings::discover_with(None, None, Some(home.path().to_path_buf())).unwrap();
        assert_eq!(settings.snapshot.as_deref(), Some("from-home"));
    }

    #[test]
    fn explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Settings::discover_with(Some(&missing), None, None).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));

        let err = Settings::discover_with(None, Some(missing.clone().into_os_string()), None).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }

    #[test]
    fn state_file_precedence() {
        let settings = Settings {
            state_file: Some(PathBuf::from("/from/settings.json")),
            ..Settings::default()
        };
        let home = Some(PathBuf::from("/home/op"));
        assert_eq!(
            settings.state_file_path_with(Some(Path::new("/cli.json")), Some("/env.json".into()), home.clone()),
            PathBuf::from("/cli.json")
        );
        assert_eq!(
            settings.state_file_path_with(None, Some("/env.json".into()), home.clone()),
            PathBuf::from("/env.json")
        );
        assert_eq!(
            settings.state_file_path_with(None, None, home.clone()),
            PathBuf::from("/from/settings.json")
        );
        assert_eq!(
            Settings::default().state_file_path_with(None, None, home),
            PathBuf::from("/home/op/.simfleet/instances.json")
        );
    }
}
