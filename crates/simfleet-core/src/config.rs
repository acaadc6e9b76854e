//! Fleet config parsing and resolution.
//!
//! A fleet config is a JSON object with an optional `defaults` block and a
//! `deployments` array. Each deployment is merged over the defaults field
//! by field (not deep-merged) and then validated into a [`DeploymentSpec`].
//! Validation collects every problem across every deployment so the user
//! sees them all at once.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::types::*;

/// Top-level list fields that concatenate defaults then deployment.
const LIST_FIELDS: &[&str] = &["plugins", "components", "systems", "captures"];

/// Nested objects that shallow-merge key by key.
const NESTED_FIELDS: &[&str] = &["provision", "playback", "ui", "postProvision"];

const CLEANUP_KEYS: &[&str] = &["snapshot", "stop", "stopOnFailure", "forget"];

/// Fleet-level `ui` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FleetUi {
    pub url: Option<String>,
    pub poll_seconds: Option<f64>,
}

/// A parsed but not yet resolved fleet config.
#[derive(Debug, Clone)]
pub struct FleetConfig {
    /// File the config was read from, if any.
    pub path: Option<PathBuf>,
    pub ui: FleetUi,
    pub defaults: Map<String, Value>,
    pub deployments: Vec<Value>,
    pub continue_on_error: Option<bool>,
}

impl FleetConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_json(&raw)?;
        config.path = Some(path.to_path_buf());
        debug!(?path, deployments = config.deployments.len(), "fleet config loaded");
        Ok(config)
    }

    pub fn from_json(raw: &str) -> ConfigResult<Self> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> ConfigResult<Self> {
        let Value::Object(mut root) = value else {
            return Err(ConfigError::NotAnObject);
        };
        let deployments = match root.remove("deployments") {
            Some(Value::Array(items)) if !items.is_empty() => items,
            _ => return Err(ConfigError::MissingDeployments),
        };

        let mut problems = Vec::new();
        let ui = match root.get("ui") {
            None | Some(Value::Null) => FleetUi::default(),
            Some(Value::Object(ui)) => FleetUi {
                url: string_field(ui.get("url")),
                poll_seconds: optional_positive_number(ui.get("pollSeconds"), "ui.pollSeconds", &mut problems),
            },
            Some(_) => {
                problems.push("ui must be an object".to_string());
                FleetUi::default()
            }
        };
        let continue_on_error = match root.get("continueOnError") {
            None | Some(Value::Null) => None,
            Some(v) => Some(boolean(Some(v), "continueOnError", false, &mut problems)),
        };
        if !problems.is_empty() {
            return Err(ConfigError::Invalid(problems));
        }

        let defaults = match root.remove("defaults") {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };

        Ok(Self {
            path: None,
            ui,
            defaults,
            deployments,
            continue_on_error,
        })
    }

    /// Directory that relative paths in the config resolve against.
    pub fn config_dir(&self) -> PathBuf {
        self.path
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Fill `defaults.snapshot` from operator settings when the config has
    /// none of its own.
    pub fn apply_default_snapshot(&mut self, snapshot: Option<&str>) {
        let Some(snapshot) = snapshot.filter(|s| !s.trim().is_empty()) else {
            return;
        };
        if string_field(self.defaults.get("snapshot")).is_none() {
            self.defaults
                .insert("snapshot".to_string(), Value::from(snapshot));
        }
    }

    /// Resolve every deployment. See [`resolve`].
    pub fn resolve(&self) -> ConfigResult<Vec<DeploymentSpec>> {
        resolve(self)
    }
}

/// Resolve every deployment in `config` into a typed spec.
///
/// Returns [`ConfigError::Invalid`] listing every violation, each prefixed
/// with the deployment it belongs to.
pub fn resolve(config: &FleetConfig) -> ConfigResult<Vec<DeploymentSpec>> {
    let defaults = with_builtin_defaults(&config.defaults);
    let mut specs = Vec::with_capacity(config.deployments.len());
    let mut problems = Vec::new();

    for (index, raw) in config.deployments.iter().enumerate() {
        let Value::Object(deployment) = raw else {
            problems.push(format!("deployments[{index}]: each deployment must be an object"));
            continue;
        };
        let label = match string_field(deployment.get("name")) {
            Some(name) => format!("deployments[{index}] \"{name}\""),
            None => format!("deployments[{index}]"),
        };
        let merged = match merge_deployment(&defaults, deployment) {
            Ok(merged) => merged,
            Err(found) => {
                problems.extend(found.into_iter().map(|p| format!("{label}: {p}")));
                continue;
            }
        };
        match resolve_deployment(index, &merged, &config.ui) {
            Ok(spec) => specs.push(spec),
            Err(found) => problems.extend(found.into_iter().map(|p| format!("{label}: {p}"))),
        }
    }

    if !problems.is_empty() {
        return Err(ConfigError::Invalid(problems));
    }
    Ok(specs)
}

/// Add the built-in `labels` and `cleanup` blocks to `defaults` when the
/// user did not supply those keys at all.
fn with_builtin_defaults(defaults: &Map<String, Value>) -> Map<String, Value> {
    let mut defaults = defaults.clone();
    if !defaults.contains_key("labels") {
        let mut labels = Map::new();
        labels.insert("instance".into(), Value::from(DEFAULT_INSTANCE_LABELS.to_vec()));
        labels.insert("snapshot".into(), Value::from(DEFAULT_SNAPSHOT_LABELS.to_vec()));
        defaults.insert("labels".into(), Value::Object(labels));
    }
    if !defaults.contains_key("cleanup") {
        let mut cleanup = Map::new();
        cleanup.insert("snapshot".into(), Value::Bool(true));
        cleanup.insert("stop".into(), Value::Bool(true));
        cleanup.insert("stopOnFailure".into(), Value::Bool(true));
        cleanup.insert("forget".into(), Value::Bool(false));
        defaults.insert("cleanup".into(), Value::Object(cleanup));
    }
    defaults
}

/// Merge one raw deployment over the raw defaults.
///
/// * Scalars take the deployment's value, else the default's. `null` counts
///   as absent.
/// * `provision`, `playback`, `ui` and `postProvision` merge key by key.
/// * List fields, `provision.args`, `postProvision.exec` and both label
///   sets concatenate default then deployment, unless the deployment sets
///   the field to `null`, which clears it.
/// * `labels` entries are normalized to `key=value` strings.
/// * `cleanup` flags resolve deployment, then default.
///
/// Returns the list of shape problems found instead when any field has the
/// wrong JSON type.
pub fn merge_deployment(
    defaults: &Map<String, Value>,
    deployment: &Map<String, Value>,
) -> Result<Map<String, Value>, Vec<String>> {
    let mut problems = Vec::new();
    let mut merged = defaults.clone();
    for (key, value) in deployment {
        if !value.is_null() {
            merged.insert(key.clone(), value.clone());
        }
    }

    for &field in NESTED_FIELDS {
        let base = object_field(defaults.get(field), field, &mut problems);
        let over = object_field(deployment.get(field), field, &mut problems);
        let mut combined = base.cloned().unwrap_or_default();
        if let Some(over) = over {
            for (key, value) in over {
                if !value.is_null() {
                    combined.insert(key.clone(), value.clone());
                }
            }
        }
        merged.insert(field.to_string(), Value::Object(combined));
    }

    for &field in LIST_FIELDS {
        let list = concat_list(defaults.get(field), deployment.get(field), field, &mut problems);
        merged.insert(field.to_string(), Value::Array(list));
    }

    let nested_list = |parent: &str, key: &str, problems: &mut Vec<String>| {
        let base = defaults.get(parent).and_then(|p| p.get(key));
        let over = deployment.get(parent).and_then(|p| p.get(key));
        concat_list(base, over, &format!("{parent}.{key}"), problems)
    };
    let args = nested_list("provision", "args", &mut problems);
    let exec = nested_list("postProvision", "exec", &mut problems);
    if let Some(Value::Object(provision)) = merged.get_mut("provision") {
        provision.insert("args".into(), Value::Array(args));
    }
    if let Some(Value::Object(post)) = merged.get_mut("postProvision") {
        post.insert("exec".into(), Value::Array(exec));
    }

    let base_labels = object_field(defaults.get("labels"), "labels", &mut problems);
    let over_labels = object_field(deployment.get("labels"), "labels", &mut problems);
    let mut labels = Map::new();
    for set in ["instance", "snapshot"] {
        let label = format!("labels.{set}");
        let base = metadata_entries(base_labels.and_then(|l| l.get(set)), &label, &mut problems);
        let entries = match over_labels.and_then(|l| l.get(set)) {
            None => base,
            Some(Value::Null) => Vec::new(),
            Some(over) => {
                let mut entries = base;
                entries.extend(metadata_entries(Some(over), &label, &mut problems));
                entries
            }
        };
        labels.insert(set.to_string(), Value::from(entries));
    }
    merged.insert("labels".into(), Value::Object(labels));

    let base_cleanup = object_field(defaults.get("cleanup"), "cleanup", &mut problems);
    let over_cleanup = object_field(deployment.get("cleanup"), "cleanup", &mut problems);
    let mut cleanup = Map::new();
    for &key in CLEANUP_KEYS {
        let value = over_cleanup
            .and_then(|c| c.get(key))
            .filter(|v| !v.is_null())
            .or_else(|| base_cleanup.and_then(|c| c.get(key)))
            .cloned()
            .unwrap_or(Value::Null);
        cleanup.insert(key.to_string(), value);
    }
    merged.insert("cleanup".into(), Value::Object(cleanup));

    if problems.is_empty() {
        Ok(merged)
    } else {
        Err(problems)
    }
}

/// Validate a merged deployment into its typed form.
fn resolve_deployment(
    index: usize,
    merged: &Map<String, Value>,
    fleet_ui: &FleetUi,
) -> Result<DeploymentSpec, Vec<String>> {
    let mut problems = Vec::new();
    let p = &mut problems;

    let name = string_field(merged.get("name")).unwrap_or_else(|| format!("deployment-{}", index + 1));
    let snapshot = string_field(merged.get("snapshot")).unwrap_or_else(|| {
        p.push("missing snapshot".to_string());
        String::new()
    });
    let mode = match string_field(merged.get("mode")).map(|m| m.to_ascii_lowercase()).as_deref() {
        None | Some("build") => Mode::Build,
        Some("clone") => Mode::Clone,
        Some(other) => {
            p.push(format!("invalid mode {other:?}, expected build or clone"));
            Mode::Build
        }
    };

    let empty = Map::new();
    let provision = merged.get("provision").and_then(Value::as_object).unwrap_or(&empty);
    let playback = merged.get("playback").and_then(Value::as_object).unwrap_or(&empty);
    let ui = merged.get("ui").and_then(Value::as_object).unwrap_or(&empty);
    let post = merged.get("postProvision").and_then(Value::as_object).unwrap_or(&empty);
    let cleanup = merged.get("cleanup").and_then(Value::as_object).unwrap_or(&empty);
    let labels = merged.get("labels").and_then(Value::as_object).unwrap_or(&empty);

    let count = positive_int(merged.get("count"), "count", 1, p);
    let parallel_value = merged
        .get("parallel")
        .filter(|v| !v.is_null())
        .or_else(|| provision.get("parallel"));
    let parallel = positive_int(parallel_value, "parallel", 1, p);
    let ready_timeout_ms = positive_int(
        merged.get("readyTimeoutMs"),
        "readyTimeoutMs",
        DEFAULT_READY_TIMEOUT_MS,
        p,
    );
    let ready_interval_ms = positive_int(
        merged.get("readyIntervalMs"),
        "readyIntervalMs",
        DEFAULT_READY_INTERVAL_MS,
        p,
    );
    let capture_mode = match merged.get("captureMode").and_then(Value::as_str) {
        Some("sequential") => CaptureMode::Sequential,
        _ => CaptureMode::Parallel,
    };

    let name_prefix = string_field(provision.get("namePrefix"))
        .or_else(|| string_field(merged.get("namePrefix")))
        .unwrap_or_else(|| name.clone());
    let provision = ProvisionSpec {
        name_prefix,
        args: string_list(provision.get("args"), "provision.args", p),
        state_file: string_field(provision.get("stateFile")),
        skip_update: boolean(provision.get("skipUpdate"), "provision.skipUpdate", true, p),
        require_update: boolean(provision.get("requireUpdate"), "provision.requireUpdate", false, p),
        memory: string_field(provision.get("memory")),
        vcpus: string_field(provision.get("vcpus")),
    };

    let playback = Playback {
        start: boolean(playback.get("start"), "playback.start", true, p),
        pause: boolean(playback.get("pause"), "playback.pause", false, p),
        stop: boolean(playback.get("stop"), "playback.stop", true, p),
    };

    let cleanup = Cleanup {
        snapshot: boolean(cleanup.get("snapshot"), "cleanup.snapshot", false, p),
        stop: boolean(cleanup.get("stop"), "cleanup.stop", false, p),
        stop_on_failure: boolean(cleanup.get("stopOnFailure"), "cleanup.stopOnFailure", false, p),
        forget: boolean(cleanup.get("forget"), "cleanup.forget", false, p),
    };

    let labels = Labels {
        instance: string_list(labels.get("instance"), "labels.instance", p),
        snapshot: string_list(labels.get("snapshot"), "labels.snapshot", p),
    };

    let ui = DeploymentUi {
        url: string_field(ui.get("url")),
        poll_seconds: optional_positive_number(ui.get("pollSeconds"), "ui.pollSeconds", p)
            .or(fleet_ui.poll_seconds)
            .unwrap_or(DEFAULT_POLL_SECONDS),
    };

    let post_provision = string_list(post.get("exec"), "postProvision.exec", p);

    let plugins = entries(merged.get("plugins"), "plugins", p, plugin_entry);
    let components = entries(merged.get("components"), "components", p, inject_entry);
    let systems = entries(merged.get("systems"), "systems", p, inject_entry);
    let captures = entries(merged.get("captures"), "captures", p, capture_spec);

    if !problems.is_empty() {
        return Err(problems);
    }
    Ok(DeploymentSpec {
        name,
        snapshot,
        mode,
        count: count as u32,
        parallel: parallel as u32,
        ready_timeout_ms,
        ready_interval_ms,
        capture_mode,
        labels,
        cleanup,
        provision,
        playback,
        post_provision,
        ui,
        plugins,
        components,
        systems,
        captures,
    })
}

// ── Entry parsers ──────────────────────────────────────────────────

fn entries<T>(
    value: Option<&Value>,
    field: &str,
    problems: &mut Vec<String>,
    parse: impl Fn(&Value, &str, &mut Vec<String>) -> Option<T>,
) -> Vec<T> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| parse(item, &format!("{field}[{i}]"), problems))
        .collect()
}

fn plugin_entry(value: &Value, label: &str, problems: &mut Vec<String>) -> Option<PluginEntry> {
    let (source, dest, overwrite) = match value {
        Value::String(source) => (Some(source.trim().to_string()), None, false),
        Value::Object(entry) => (
            string_field(entry.get("source")).or_else(|| string_field(entry.get("path"))),
            string_field(entry.get("dest")).or_else(|| string_field(entry.get("target"))),
            boolean(entry.get("overwrite"), &format!("{label}.overwrite"), false, problems),
        ),
        _ => {
            problems.push(format!("{label}: plugin entry must be a string or object"));
            return None;
        }
    };
    let Some(source) = source.filter(|s| !s.is_empty()) else {
        problems.push(format!("{label}: plugin entry missing source"));
        return None;
    };
    if let Some(dest) = &dest {
        if !dest.starts_with("plugins/") {
            problems.push(format!("{label}: plugin destination must start with plugins/: {dest}"));
            return None;
        }
    }
    Some(PluginEntry {
        source,
        dest,
        overwrite,
    })
}

fn inject_entry(value: &Value, label: &str, problems: &mut Vec<String>) -> Option<InjectEntry> {
    let Value::Object(entry) = value else {
        problems.push(format!("{label}: entry must be an object"));
        return None;
    };
    let module_path = ["module", "path", "modulePath"]
        .iter()
        .find_map(|key| string_field(entry.get(*key)));
    let Some(module_path) = module_path else {
        problems.push(format!("{label}: entry missing module path"));
        return None;
    };
    if !module_path.starts_with("plugins/") {
        problems.push(format!("{label}: modulePath must start with plugins/: {module_path}"));
        return None;
    }
    Some(InjectEntry {
        player: Player::parse(entry.get("player").and_then(Value::as_str)),
        module_path,
        export_name: string_field(entry.get("export")).or_else(|| string_field(entry.get("exportName"))),
    })
}

fn capture_spec(value: &Value, label: &str, problems: &mut Vec<String>) -> Option<CaptureSpec> {
    let Value::Object(entry) = value else {
        problems.push(format!("{label}: capture entry must be an object"));
        return None;
    };
    let before = problems.len();
    let stream = string_field(entry.get("stream"));
    if stream.is_none() {
        problems.push(format!("{label}: capture entry missing stream"));
    }
    let out = string_field(entry.get("out"));
    if out.is_none() {
        problems.push(format!("{label}: capture entry missing out path"));
    }
    let format = match string_field(entry.get("format")) {
        None => None,
        Some(raw) => match CaptureFormat::parse(&raw) {
            Some(format) => Some(format),
            None => {
                problems.push(format!("{label}: invalid capture format {raw:?}"));
                None
            }
        },
    };
    let frames = optional_positive_int(entry.get("frames"), &format!("{label}.frames"), problems);
    let duration_ms = first_present(entry, &["durationMs", "duration"])
        .and_then(|v| optional_positive_number(Some(v), &format!("{label}.durationMs"), problems))
        .or_else(|| {
            first_present(entry, &["durationSeconds", "durationSec"])
                .and_then(|v| optional_positive_number(Some(v), &format!("{label}.durationSeconds"), problems))
                .map(|secs| secs * 1000.0)
        })
        .map(|ms| ms.round().max(1.0) as u64);
    if frames.is_none() && duration_ms.is_none() && problems.len() == before {
        problems.push(format!(
            "{label}: capture {} requires frames or duration",
            stream.as_deref().unwrap_or("?")
        ));
    }
    let ui = match entry.get("ui") {
        None | Some(Value::Null) => CaptureUi::Inherit,
        Some(Value::Bool(false)) => CaptureUi::Disabled,
        Some(Value::Bool(true)) => CaptureUi::Required {
            capture_id: None,
            filename: None,
            poll_seconds: None,
        },
        Some(Value::Object(ui)) => CaptureUi::Required {
            capture_id: string_field(ui.get("captureId")).or_else(|| string_field(ui.get("id"))),
            filename: string_field(ui.get("filename")),
            poll_seconds: optional_positive_number(ui.get("pollSeconds"), &format!("{label}.ui.pollSeconds"), problems),
        },
        Some(_) => {
            problems.push(format!("{label}: ui must be a boolean or object"));
            CaptureUi::Inherit
        }
    };
    let include_acks = boolean(entry.get("includeAcks"), &format!("{label}.includeAcks"), false, problems);

    if problems.len() != before {
        return None;
    }
    Some(CaptureSpec {
        stream: stream?,
        out: out?,
        format,
        frames,
        duration_ms,
        component: string_field(entry.get("component")),
        entity: string_field(entry.get("entity")),
        include_acks,
        ui,
    })
}

// ── Value helpers ──────────────────────────────────────────────────

fn first_present<'a>(entry: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| entry.get(*k).filter(|v| !v.is_null()))
}

/// Non-empty trimmed string; numbers are accepted and stringified.
fn string_field(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn object_field<'a>(
    value: Option<&'a Value>,
    field: &str,
    problems: &mut Vec<String>,
) -> Option<&'a Map<String, Value>> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::Object(map)) => Some(map),
        Some(_) => {
            problems.push(format!("{field} must be an object"));
            None
        }
    }
}

fn concat_list(
    base: Option<&Value>,
    over: Option<&Value>,
    field: &str,
    problems: &mut Vec<String>,
) -> Vec<Value> {
    let base = match base {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.clone(),
        Some(_) => {
            problems.push(format!("expected {field} to be an array"));
            Vec::new()
        }
    };
    match over {
        None => base,
        Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => {
            let mut combined = base;
            combined.extend(items.iter().cloned());
            combined
        }
        Some(_) => {
            problems.push(format!("expected {field} to be an array"));
            base
        }
    }
}

/// Normalize a label set written as a string, array or key/value object.
fn metadata_entries(value: Option<&Value>, field: &str, problems: &mut Vec<String>) -> Vec<String> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items.iter().map(scalar_to_string).collect(),
        Some(Value::Object(map)) => map
            .iter()
            .map(|(k, v)| format!("{k}={}", scalar_to_string(v)))
            .collect(),
        Some(_) => {
            problems.push(format!("expected {field} to be an array, string, or object"));
            Vec::new()
        }
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn string_list(value: Option<&Value>, field: &str, problems: &mut Vec<String>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::String(s) => out.push(s.clone()),
            Value::Number(_) | Value::Bool(_) => out.push(item.to_string()),
            _ => problems.push(format!("{field}[{i}] must be a string")),
        }
    }
    out
}

/// Accepts `true/false` and the strings `1/0/true/false/yes/no/on/off`.
fn boolean(value: Option<&Value>, field: &str, fallback: bool, problems: &mut Vec<String>) -> bool {
    let parsed = match value {
        None | Some(Value::Null) => return fallback,
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(1) => Some(true),
            Some(0) => Some(false),
            _ => None,
        },
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        },
        Some(_) => None,
    };
    parsed.unwrap_or_else(|| {
        problems.push(format!("{field} must be a boolean"));
        fallback
    })
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn optional_positive_number(value: Option<&Value>, field: &str, problems: &mut Vec<String>) -> Option<f64> {
    let value = value.filter(|v| !v.is_null() && v.as_str() != Some(""))?;
    match number(value).filter(|n| *n > 0.0) {
        Some(n) => Some(n),
        None => {
            problems.push(format!("{field} must be a positive number, got {value}"));
            None
        }
    }
}

fn optional_positive_int(value: Option<&Value>, field: &str, problems: &mut Vec<String>) -> Option<u64> {
    let value = value.filter(|v| !v.is_null())?;
    match number(value).filter(|n| *n > 0.0 && n.fract() == 0.0 && *n <= u32::MAX as f64) {
        Some(n) => Some(n as u64),
        None => {
            problems.push(format!("{field} must be a positive integer, got {value}"));
            None
        }
    }
}

fn positive_int(value: Option<&Value>, field: &str, fallback: u64, problems: &mut Vec<String>) -> u64 {
    optional_positive_int(value, field, problems).unwrap_or(fallback)
}
