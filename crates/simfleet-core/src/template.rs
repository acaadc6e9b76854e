//! `${token}` rendering for labels, output paths and capture ids.
//!
//! Recognised tokens are `deployment`, `instance`, `index` (1-based),
//! `instanceId` and `runId`. Anything else renders as the empty string.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::TemplateError;

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{(\w+)\}").expect("token pattern is a valid regex"));

static INSTANCE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{(index|instance|instanceId)\}").expect("instance pattern is a valid regex")
});

/// Values substituted into templates for one instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateTokens {
    pub deployment: String,
    pub instance: String,
    /// Zero-based position of the instance within its deployment.
    pub index: usize,
    pub instance_id: Option<String>,
    pub run_id: String,
}

impl TemplateTokens {
    pub fn new(
        deployment: impl Into<String>,
        instance: impl Into<String>,
        index: usize,
        instance_id: Option<&str>,
        run_id: impl Into<String>,
    ) -> Self {
        Self {
            deployment: deployment.into(),
            instance: instance.into(),
            index,
            instance_id: instance_id.filter(|id| !id.is_empty()).map(str::to_string),
            run_id: run_id.into(),
        }
    }

    fn lookup(&self, key: &str) -> String {
        match key {
            "deployment" => self.deployment.clone(),
            "instance" => self.instance.clone(),
            "index" => (self.index + 1).to_string(),
            "instanceId" => self.instance_id.clone().unwrap_or_default(),
            "runId" => self.run_id.clone(),
            _ => String::new(),
        }
    }

    /// Whether rendered paths and ids for this instance need a `-N` suffix
    /// to stay distinct from the first instance's.
    pub fn needs_suffix(&self, template: &str) -> bool {
        self.index > 0 && !uses_instance_token(template)
    }
}

/// Substitute every `${token}` in `template`.
pub fn render(template: &str, tokens: &TemplateTokens) -> String {
    TOKEN
        .replace_all(template, |caps: &Captures<'_>| tokens.lookup(&caps[1]))
        .into_owned()
}

/// Whether `template` references a token that differs per instance.
pub fn uses_instance_token(template: &str) -> bool {
    INSTANCE_TOKEN.is_match(template)
}

/// Insert `-<n>` before the file extension of `path`.
pub fn append_path_suffix(path: &Path, n: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match path.extension() {
        Some(ext) => format!("{stem}-{n}.{}", ext.to_string_lossy()),
        None => format!("{stem}-{n}"),
    };
    path.with_file_name(file_name)
}

/// Render a path template, suffixing it for instances after the first when
/// the template would otherwise collide. Returns the path and whether a
/// suffix was applied.
pub fn render_path(template: &str, tokens: &TemplateTokens, base: &Path) -> (PathBuf, bool) {
    let rendered = PathBuf::from(render(template, tokens));
    let path = if rendered.is_absolute() {
        rendered
    } else {
        base.join(rendered)
    };
    if tokens.needs_suffix(template) {
        (append_path_suffix(&path, tokens.index + 1), true)
    } else {
        (path, false)
    }
}

/// Render an identifier template with the same collision rule as paths.
pub fn render_id(template: &str, tokens: &TemplateTokens) -> String {
    let rendered = render(template, tokens);
    if tokens.needs_suffix(template) {
        format!("{rendered}-{}", tokens.index + 1)
    } else {
        rendered
    }
}

/// Render `key=value` metadata entries.
///
/// Entries are trimmed after rendering and empty ones dropped. Anything left
/// without an `=` is rejected.
pub fn render_metadata(
    entries: &[String],
    tokens: &TemplateTokens,
    label: &str,
) -> Result<Vec<String>, TemplateError> {
    let mut rendered = Vec::with_capacity(entries.len());
    for entry in entries {
        let value = render(entry, tokens).trim().to_string();
        if value.is_empty() {
            continue;
        }
        if !value.contains('=') {
            return Err(TemplateError::MalformedEntry {
                label: label.to_string(),
                entry: value,
            });
        }
        rendered.push(value);
    }
    Ok(rendered)
}
