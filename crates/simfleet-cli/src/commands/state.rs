use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use serde_json::json;

use simfleet_core::Settings;
use simfleet_state::StateStore;

fn store(settings: &Settings, state_file: Option<PathBuf>) -> StateStore {
    StateStore::new(settings.state_file_path(state_file.as_deref()))
}

pub fn list(settings: &Settings, state_file: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    let store = store(settings, state_file);
    let instances = store
        .list_instances()
        .with_context(|| format!("failed to read state file {}", store.path().display()))?;
    println!("{}", serde_json::to_string_pretty(&instances)?);
    Ok(ExitCode::SUCCESS)
}

/// Remove one record. Exits non-zero when the id was not recorded.
pub fn forget(settings: &Settings, id: &str, state_file: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    let store = store(settings, state_file);
    let removed = store
        .forget(id)
        .with_context(|| format!("failed to update state file {}", store.path().display()))?;
    println!("{}", serde_json::to_string_pretty(&json!({ "id": id, "removed": removed }))?);
    Ok(if removed { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
