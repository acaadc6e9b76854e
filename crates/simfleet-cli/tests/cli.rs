//! Drives the `simfleet` binary.

use std::path::Path;
use std::process::{Command, Output};

use serde_json::Value;

fn simfleet(dir: &Path, args: &[&str]) -> Output {
    let settings = dir.join("settings.toml");
    if !settings.exists() {
        std::fs::write(&settings, "").unwrap();
    }
    Command::new(env!("CARGO_BIN_EXE_simfleet"))
        .arg("--settings")
        .arg(&settings)
        .args(args)
        .env_remove("SIMFLEET_STATE_FILE")
        .env("RUST_LOG", "warn")
        .output()
        .unwrap()
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn state_list_and_forget() {
    let dir = tempfile::tempdir().unwrap();
    let state = dir.path().join("state.json");
    std::fs::write(
        &state,
        r#"{"instances":{"inst_1":{"id":"inst_1","apiUrl":"http://inst-1/api"}}}"#,
    )
    .unwrap();
    let state_arg = state.to_str().unwrap();

    let listed = simfleet(dir.path(), &["state", "list", "--state-file", state_arg]);
    assert!(listed.status.success());
    let instances = stdout_json(&listed);
    assert_eq!(instances[0]["id"], "inst_1");
    assert_eq!(instances[0]["apiUrl"], "http://inst-1/api");

    let forgot = simfleet(dir.path(), &["state", "forget", "inst_1", "--state-file", state_arg]);
    assert!(forgot.status.success());
    assert_eq!(stdout_json(&forgot)["removed"], true);

    let again = simfleet(dir.path(), &["state", "forget", "inst_1", "--state-file", state_arg]);
    assert_eq!(again.status.code(), Some(1));
    assert_eq!(stdout_json(&again)["removed"], false);
}

#[test]
fn invalid_config_fails_before_provisioning() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("fleet.json");
    std::fs::write(&config, r#"{"deployments":[{"name":"a","count":0}]}"#).unwrap();

    let output = simfleet(dir.path(), &["run", "--config", config.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid fleet config"), "{stderr}");
}

#[cfg(unix)]
#[test]
fn provisioning_failure_prints_failed_report() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("provision.sh");
    std::fs::write(&script, "echo 'no capacity' >&2\nexit 3\n").unwrap();
    std::fs::write(
        dir.path().join("settings.toml"),
        format!(
            "provisioner = [\"sh\", \"{}\"]\nstate_file = \"{}\"\n",
            script.display(),
            dir.path().join("state.json").display()
        ),
    )
    .unwrap();
    let config = dir.path().join("fleet.json");
    std::fs::write(&config, r#"{"deployments":[{"name":"a","snapshot":"S1"}]}"#).unwrap();

    let output = simfleet(
        dir.path(),
        &["run", "--config", config.to_str().unwrap(), "--continue-on-error"],
    );
    assert_eq!(output.status.code(), Some(1));

    let report = stdout_json(&output);
    assert_eq!(report["status"], "failed");
    assert_eq!(report["continueOnError"], true);
    assert_eq!(report["deployments"][0]["status"], "failed");
    let error = report["errors"][0].as_str().unwrap();
    assert!(error.starts_with("a: provisioning failed"), "{error}");
}
