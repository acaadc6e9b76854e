//! Domain types for the instance state file.
//!
//! The provisioning collaborator writes richer records than the
//! orchestrator needs (service name, port, internal IP, ...). Records are
//! kept as the raw JSON objects, so saving a loaded file reproduces the
//! collaborator's key order and explicit nulls.

use chrono::{SecondsFormat, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Unique identifier of a provisioned instance.
pub type InstanceId = String;

/// Whole contents of the state file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub instances: Instances,
    /// Stamped by every save.
    #[serde(default)]
    pub updated_at: Option<String>,
    /// Top-level keys written by other tools.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Instance records in file order.
///
/// Serialized as a JSON object keyed by instance id. Records keep the
/// position they were loaded or first inserted at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Instances(Vec<InstanceRecord>);

/// One instance as recorded in the state file.
///
/// The record is the raw JSON object the provisioning collaborator wrote,
/// with typed accessors for the fields the orchestrator reads or updates.
/// Key order and explicit `null` values survive a load/save cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceRecord {
    id: InstanceId,
    fields: Map<String, Value>,
}

/// Outcome of snapshotting an instance, as recorded in the state file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRecord {
    pub id: String,
    pub created_at: String,
    pub metadata: Vec<String>,
}

impl PersistedState {
    /// Whether the state has no instances.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Look up an instance by id.
    pub fn instance(&self, id: &str) -> Option<&InstanceRecord> {
        self.instances.get(id)
    }
}

impl Instances {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&InstanceRecord> {
        self.0.iter().find(|r| r.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut InstanceRecord> {
        self.0.iter_mut().find(|r| r.id == id)
    }

    /// Insert a record, replacing one with the same id in place. New ids
    /// are appended.
    pub fn insert(&mut self, record: InstanceRecord) -> Option<InstanceRecord> {
        match self.get_mut(&record.id) {
            Some(slot) => Some(std::mem::replace(slot, record)),
            None => {
                self.0.push(record);
                None
            }
        }
    }

    /// Remove a record, keeping the order of the rest.
    pub fn remove(&mut self, id: &str) -> Option<InstanceRecord> {
        let index = self.0.iter().position(|r| r.id == id)?;
        Some(self.0.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstanceRecord> {
        self.0.iter()
    }
}

impl IntoIterator for Instances {
    type Item = InstanceRecord;
    type IntoIter = std::vec::IntoIter<InstanceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl Serialize for Instances {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|r| (&r.id, &r.fields)))
    }
}

impl<'de> Deserialize<'de> for Instances {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
        let mut records = Vec::with_capacity(raw.len());
        for (key, value) in raw {
            let Value::Object(fields) = value else {
                return Err(de::Error::custom(format!("instance {key} is not an object")));
            };
            records.push(InstanceRecord::from_fields(key, fields));
        }
        Ok(Instances(records))
    }
}

impl Serialize for InstanceRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

impl InstanceRecord {
    /// Create a record for a freshly provisioned instance.
    pub fn new(id: &str, api_url: Option<&str>) -> Self {
        let mut fields = Map::new();
        fields.insert("id".into(), Value::from(id));
        if let Some(url) = api_url {
            fields.insert("apiUrl".into(), Value::from(url));
        }
        Self {
            id: id.to_string(),
            fields,
        }
    }

    /// Wrap a record stored under `key`. The key is the instance id, even
    /// when the object carries no `id` field of its own.
    pub fn from_fields(key: impl Into<InstanceId>, fields: Map<String, Value>) -> Self {
        Self {
            id: key.into(),
            fields,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Every field as written, in file order.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Set a field. An existing key keeps its position.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.fields.insert(key.to_string(), value.into());
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn api_url(&self) -> Option<&str> {
        self.str_field("apiUrl").filter(|u| !u.is_empty())
    }

    pub fn snapshot_id(&self) -> Option<&str> {
        self.str_field("snapshotId")
    }

    pub fn snapshot_created_at(&self) -> Option<&str> {
        self.str_field("snapshotCreatedAt")
    }

    pub fn snapshot_metadata(&self) -> Option<Vec<&str>> {
        let items = self.fields.get("snapshotMetadata")?.as_array()?;
        Some(items.iter().filter_map(Value::as_str).collect())
    }

    pub fn stopped_at(&self) -> Option<&str> {
        self.str_field("stoppedAt")
    }

    pub fn last_run_id(&self) -> Option<&str> {
        self.str_field("lastRunId")
    }

    pub fn set_api_url(&mut self, url: &str) {
        self.insert("apiUrl", url);
    }

    /// Record the last snapshot taken from this instance.
    pub fn set_snapshot(&mut self, snapshot: &SnapshotRecord, run_id: &str) {
        self.insert("snapshotId", snapshot.id.as_str());
        self.insert("snapshotCreatedAt", snapshot.created_at.as_str());
        self.insert("snapshotMetadata", snapshot.metadata.clone());
        self.insert("lastRunId", run_id);
    }

    pub fn set_stopped_at(&mut self, at: &str) {
        self.insert("stoppedAt", at);
    }

    /// Resolve the simulation API base URL for this instance.
    ///
    /// Prefers the recorded `apiUrl`, then `publicUrl` + `/api`, then
    /// `http://internalIp:port/api`.
    pub fn endpoint(&self) -> Option<String> {
        if let Some(url) = self.api_url() {
            return Some(url.to_string());
        }
        if let Some(public) = self.str_field("publicUrl") {
            let trimmed = public.trim_end_matches('/');
            if !trimmed.is_empty() {
                return Some(format!("{trimmed}/api"));
            }
        }
        let ip = self.str_field("internalIp")?;
        let port = match self.fields.get("port")? {
            Value::Number(n) => n.to_string(),
            Value::String(s) if !s.is_empty() => s.clone(),
            _ => return None,
        };
        Some(format!("http://{ip}:{port}/api"))
    }

    /// Whether the instance has been marked stopped.
    pub fn is_stopped(&self) -> bool {
        self.stopped_at().is_some()
    }
}

/// Current UTC time in the state file's timestamp format.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
