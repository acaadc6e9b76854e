//! Error types for fleet configuration.

use std::path::PathBuf;

use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or resolving a fleet config. All of them are
/// fatal before any remote action is taken.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("fleet config must be a JSON object")]
    NotAnObject,

    #[error("fleet config must include a non-empty deployments array")]
    MissingDeployments,

    #[error("invalid fleet config:\n  {}", .0.join("\n  "))]
    Invalid(Vec<String>),

    #[error("invalid ui url: {0}")]
    UiUrl(String),
}

/// Errors raised while rendering label and metadata templates.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("invalid {label} entry (expected key=value): {entry}")]
    MalformedEntry { label: String, entry: String },
}

/// Errors raised while locating a plugin source file.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("plugin source not found: {0}")]
    NotFound(PathBuf),

    #[error("plugin source is not a file: {0}")]
    NotAFile(PathBuf),

    #[error("unable to infer plugin destination for {0}, provide dest")]
    NoDestination(PathBuf),

    #[error("plugin destination must start with plugins/: {0}")]
    BadDestination(String),

    #[error("failed to read plugin source {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors raised while loading the operator settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
