//! Everything one fleet invocation needs, resolved up front.

use std::path::{Path, PathBuf};

use chrono::Utc;

use simfleet_core::{DeploymentSpec, FleetConfig, Settings};

use crate::error::FleetResult;

/// Command-line overrides applied on top of the config and settings.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub ui_url: Option<String>,
    /// `Some(true)` when `--continue-on-error` was given.
    pub continue_on_error: Option<bool>,
    pub state_file: Option<PathBuf>,
}

/// A resolved fleet run: the config, its deployments and the operator's
/// settings and overrides.
#[derive(Debug, Clone)]
pub struct FleetRun {
    pub config: FleetConfig,
    pub deployments: Vec<DeploymentSpec>,
    pub run_id: String,
    pub continue_on_error: bool,
    /// Default state file when the provisioner does not report one.
    pub state_file: PathBuf,
    ui_override: Option<String>,
    settings_ui_url: Option<String>,
}

/// `YYYYMMDDHHMMSSmmm` in UTC.
pub fn new_run_id() -> String {
    Utc::now().format("%Y%m%d%H%M%S%3f").to_string()
}

impl FleetRun {
    /// Resolve `config` against the settings and overrides. Fails before
    /// any remote action when the config is invalid.
    pub fn new(mut config: FleetConfig, settings: &Settings, overrides: RunOverrides) -> FleetResult<Self> {
        config.apply_default_snapshot(settings.snapshot.as_deref());
        let deployments = config.resolve()?;
        let continue_on_error = overrides
            .continue_on_error
            .or(config.continue_on_error)
            .unwrap_or(false);
        let state_file = settings.state_file_path(overrides.state_file.as_deref());
        Ok(Self {
            config,
            deployments,
            run_id: new_run_id(),
            continue_on_error,
            state_file,
            ui_override: overrides.ui_url,
            settings_ui_url: settings.ui_url.clone(),
        })
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// Directory relative plugin and capture paths resolve against.
    pub fn config_dir(&self) -> PathBuf {
        self.config.config_dir()
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config.path.as_deref()
    }

    /// Metrics UI address for a deployment: CLI, then deployment, then
    /// fleet, then settings.
    pub fn ui_url_for<'a>(&'a self, deployment: &'a DeploymentSpec) -> Option<&'a str> {
        [
            self.ui_override.as_deref(),
            deployment.ui.url.as_deref(),
            self.config.ui.url.as_deref(),
            self.settings_ui_url.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: serde_json::Value) -> FleetConfig {
        FleetConfig::from_value(value).unwrap()
    }

    #[test]
    fn run_id_format() {
        let id = new_run_id();
        assert_eq!(id.len(), 17);
        assert!(id.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn continue_on_error_precedence() {
        let settings = Settings::default();
        let cfg = config(json!({ "continueOnError": true, "deployments": [{ "snapshot": "s" }] }));
        let run = FleetRun::new(cfg.clone(), &settings, RunOverrides::default()).unwrap();
        assert!(run.continue_on_error);

        let run = FleetRun::new(
            cfg,
            &settings,
            RunOverrides {
                continue_on_error: Some(false),
                ..RunOverrides::default()
            },
        )
        .unwrap();
        assert!(!run.continue_on_error);

        let plain = config(json!({ "deployments": [{ "snapshot": "s" }] }));
        assert!(!FleetRun::new(plain, &settings, RunOverrides::default()).unwrap().continue_on_error);
    }

    #[test]
    fn ui_url_precedence() {
        let settings = Settings {
            ui_url: Some("settings:5050".into()),
            ..Settings::default()
        };
        let cfg = config(json!({
            "ui": { "url": "fleet:5050" },
            "deployments": [
                { "snapshot": "s", "ui": { "url": "deploy:5050" } },
                { "snapshot": "s" }
            ]
        }));
        let run = FleetRun::new(cfg.clone(), &settings, RunOverrides::default()).unwrap();
        assert_eq!(run.ui_url_for(&run.deployments[0]), Some("deploy:5050"));
        assert_eq!(run.ui_url_for(&run.deployments[1]), Some("fleet:5050"));

        let run = FleetRun::new(
            cfg,
            &settings,
            RunOverrides {
                ui_url: Some("cli:5050".into()),
                ..RunOverrides::default()
            },
        )
        .unwrap();
        assert_eq!(run.ui_url_for(&run.deployments[0]), Some("cli:5050"));

        let bare = config(json!({ "deployments": [{ "snapshot": "s" }] }));
        let run = FleetRun::new(bare.clone(), &settings, RunOverrides::default()).unwrap();
        assert_eq!(run.ui_url_for(&run.deployments[0]), Some("settings:5050"));
        let run = FleetRun::new(bare, &Settings::default(), RunOverrides::default()).unwrap();
        assert_eq!(run.ui_url_for(&run.deployments[0]), None);
    }

    #[test]
    fn settings_snapshot_fills_missing() {
        let settings = Settings {
            snapshot: Some("snap_default".into()),
            ..Settings::default()
        };
        let run = FleetRun::new(config(json!({ "deployments": [{}] })), &settings, RunOverrides::default()).unwrap();
        assert_eq!(run.deployments[0].snapshot, "snap_default");

        let err = FleetRun::new(config(json!({ "deployments": [{}] })), &Settings::default(), RunOverrides::default())
            .unwrap_err();
        assert_eq!(err.kind(), "config");
    }
}
