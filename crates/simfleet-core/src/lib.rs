//! simfleet-core — fleet configuration for simfleet.
//!
//! Turns the user's fleet JSON into fully resolved [`DeploymentSpec`]s,
//! renders the `${token}` templates used for labels, output paths and
//! capture ids, and loads the operator settings file that supplies
//! machine-wide defaults.

pub mod config;
pub mod error;
pub mod settings;
pub mod template;
pub mod types;

pub use config::{FleetConfig, FleetUi, merge_deployment, resolve};
pub use error::{ConfigError, ConfigResult, PluginError, SettingsError, TemplateError};
pub use settings::Settings;
pub use template::{
    TemplateTokens, render, render_id, render_metadata, render_path, uses_instance_token,
};
pub use types::*;
