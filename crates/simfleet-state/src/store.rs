//! StateStore — JSON-file-backed instance registry.
//!
//! Every mutating call loads the file, applies one change and saves it
//! back. The store holds no cached copy, so a fresh `StateStore` over the
//! same path always sees the latest contents.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::types::*;

/// Load the state file at `path`.
///
/// A missing file yields an empty state. A file that exists but does not
/// parse is an error; it is never silently reset.
pub fn load(path: &Path) -> StateResult<PersistedState> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(?path, "state file missing, starting empty");
            return Ok(PersistedState::default());
        }
        Err(source) => {
            return Err(StateError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    if raw.trim().is_empty() {
        return Ok(PersistedState::default());
    }
    serde_json::from_str(&raw).map_err(|source| StateError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Stamp `updatedAt` and write `state` to `path` as pretty JSON.
pub fn save(path: &Path, state: &mut PersistedState) -> StateResult<()> {
    state.updated_at = Some(timestamp_now());
    let mut body = serde_json::to_string_pretty(state)?;
    body.push('\n');
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StateError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, body).map_err(|source| StateError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(?path, instances = state.instances.len(), "state file saved");
    Ok(())
}

/// Read-modify-write access to one state file.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> StateResult<PersistedState> {
        load(&self.path)
    }

    pub fn save(&self, state: &mut PersistedState) -> StateResult<()> {
        save(&self.path, state)
    }

    // ── Lookups ────────────────────────────────────────────────────

    /// Get an instance record by id.
    pub fn instance(&self, id: &str) -> StateResult<Option<InstanceRecord>> {
        Ok(self.load()?.instances.remove(id))
    }

    /// List all instance records in file order.
    pub fn list_instances(&self) -> StateResult<Vec<InstanceRecord>> {
        Ok(self.load()?.instances.into_iter().collect())
    }

    /// Resolve the API endpoint recorded for an instance.
    pub fn endpoint(&self, id: &str) -> StateResult<Option<String>> {
        Ok(self.instance(id)?.and_then(|record| record.endpoint()))
    }

    // ── Mutations ──────────────────────────────────────────────────

    /// Insert or replace an instance record.
    pub fn register_instance(&self, record: InstanceRecord) -> StateResult<()> {
        let mut state = self.load()?;
        let id = record.id().to_string();
        state.instances.insert(record);
        self.save(&mut state)?;
        debug!(instance = %id, "instance registered");
        Ok(())
    }

    /// Record a snapshot taken from an instance. Returns false when the id
    /// is unknown, in which case the file is left untouched.
    pub fn record_snapshot(
        &self,
        id: &str,
        snapshot: &SnapshotRecord,
        run_id: &str,
    ) -> StateResult<bool> {
        self.update(id, |record| record.set_snapshot(snapshot, run_id))
    }

    /// Record that an instance was stopped. With `forget` the record is
    /// removed instead of being stamped with `stoppedAt`.
    pub fn record_stop(&self, id: &str, forget: bool) -> StateResult<bool> {
        if forget {
            return self.forget(id);
        }
        self.update(id, |record| record.set_stopped_at(&timestamp_now()))
    }

    /// Remove an instance record. Returns whether it existed.
    pub fn forget(&self, id: &str) -> StateResult<bool> {
        let mut state = self.load()?;
        if state.instances.remove(id).is_none() {
            return Ok(false);
        }
        self.save(&mut state)?;
        debug!(instance = %id, "instance forgotten");
        Ok(true)
    }

    fn update(&self, id: &str, apply: impl FnOnce(&mut InstanceRecord)) -> StateResult<bool> {
        let mut state = self.load()?;
        let Some(record) = state.instances.get_mut(id) else {
            debug!(instance = %id, "unknown instance, state unchanged");
            return Ok(false);
        };
        apply(record);
        self.save(&mut state)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, StateStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("nested").join("instances.json"));
        (dir, store)
    }

    #[test]
    fn missing_file_is_empty_state() {
        let (_dir, store) = temp_store();
        let state = store.load().unwrap();
        assert!(state.is_empty());
        assert!(state.updated_at.is_none());
    }

    #[test]
    fn unparseable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instances.json");
        fs::write(&path, "{ not json").unwrap();
        let err = load(&path).unwrap_err();
        assert!(matches!(err, StateError::Parse { .. }));
        // The broken file is left as-is.
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn save_creates_parents_and_stamps_updated_at() {
        let (_dir, store) = temp_store();
        let mut state = PersistedState::default();
        store.save(&mut state).unwrap();
        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.ends_with("}\n"));
        assert!(state.updated_at.is_some());
        assert!(raw.contains("\"updatedAt\""));
    }

    #[test]
    fn register_and_lookup() {
        let (_dir, store) = temp_store();
        store
            .register_instance(InstanceRecord::new("i-1", Some("https://a/api")))
            .unwrap();
        let record = store.instance("i-1").unwrap().unwrap();
        assert_eq!(record.api_url(), Some("https://a/api"));
        assert_eq!(store.endpoint("i-1").unwrap().as_deref(), Some("https://a/api"));
        assert!(store.instance("i-2").unwrap().is_none());
    }

    #[test]
    fn record_snapshot_fields() {
        let (_dir, store) = temp_store();
        store.register_instance(InstanceRecord::new("i-1", None)).unwrap();
        let snapshot = SnapshotRecord {
            id: "snap-9".into(),
            created_at: "2026-01-01T00:00:00Z".into(),
            metadata: vec!["simeval.run=r1".into()],
        };
        assert!(store.record_snapshot("i-1", &snapshot, "r1").unwrap());
        let record = store.instance("i-1").unwrap().unwrap();
        assert_eq!(record.snapshot_id(), Some("snap-9"));
        assert_eq!(record.snapshot_created_at(), Some("2026-01-01T00:00:00Z"));
        assert_eq!(record.snapshot_metadata(), Some(vec!["simeval.run=r1"]));
        assert_eq!(record.last_run_id(), Some("r1"));
    }

    #[test]
    fn record_stop_marks_or_forgets() {
        let (_dir, store) = temp_store();
        store.register_instance(InstanceRecord::new("i-1", None)).unwrap();
        store.register_instance(InstanceRecord::new("i-2", None)).unwrap();

        assert!(store.record_stop("i-1", false).unwrap());
        assert!(store.instance("i-1").unwrap().unwrap().is_stopped());

        assert!(store.record_stop("i-2", true).unwrap());
        assert!(store.instance("i-2").unwrap().is_none());
    }

    #[test]
    fn unknown_id_is_noop() {
        let (_dir, store) = temp_store();
        store.register_instance(InstanceRecord::new("i-1", None)).unwrap();
        let before = fs::read_to_string(store.path()).unwrap();

        assert!(!store.record_stop("nope", false).unwrap());
        assert!(!store.forget("nope").unwrap());
        let snapshot = SnapshotRecord {
            id: "s".into(),
            created_at: "t".into(),
            metadata: vec![],
        };
        assert!(!store.record_snapshot("nope", &snapshot, "r").unwrap());

        assert_eq!(fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn record_without_id_takes_map_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instances.json");
        fs::write(&path, r#"{"instances":{"i-7":{"apiUrl":"http://x/api"}}}"#).unwrap();
        let state = load(&path).unwrap();
        assert_eq!(state.instance("i-7").unwrap().id(), "i-7");
    }
}
