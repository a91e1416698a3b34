//! Durable round trip of the graph through a key-value text store.
//!
//! Three independent keys hold JSON arrays: `nodes`, `edges` and `legend`.
//! Every save replaces the whole value under a key. Loading never fails: a
//! missing or corrupt value degrades to an empty collection (the built-in
//! legend for a missing `legend` key). Reset stores empty arrays rather than
//! removing keys.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::legend::{LegendEntry, default_legend};
use crate::model::{Edge, Snapshot, TableNode};

pub const NODES_KEY: &str = "nodes";
pub const EDGES_KEY: &str = "edges";
pub const LEGEND_KEY: &str = "legend";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path(key)) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.to_string(),
                source,
            }),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let io_err = |source: io::Error| StoreError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        // Whole-value replace via rename.
        let tmp = self.dir.join(format!(".{}.json.tmp", key));
        fs::write(&tmp, value).map_err(io_err)?;
        fs::rename(&tmp, self.path(key)).map_err(io_err)
    }
}

/// Collections read back at startup.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LoadedState {
    pub nodes: Vec<TableNode>,
    pub edges: Vec<Edge>,
    pub legend: Vec<LegendEntry>,
}

pub struct PersistenceAdapter<S> {
    store: S,
    saved_nodes: Option<Arc<Vec<TableNode>>>,
    saved_edges: Option<Arc<Vec<Edge>>>,
    saved_legend: Option<Arc<Vec<LegendEntry>>>,
}

impl<S: KeyValueStore> PersistenceAdapter<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            saved_nodes: None,
            saved_edges: None,
            saved_legend: None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn load(&self) -> LoadedState {
        LoadedState {
            nodes: self.read_key(NODES_KEY).unwrap_or_default(),
            edges: self.read_key(EDGES_KEY).unwrap_or_default(),
            legend: self.read_key(LEGEND_KEY).unwrap_or_else(default_legend),
        }
    }

    /// Record `snapshot` as what the store already holds, without writing.
    pub fn mark_saved(&mut self, snapshot: &Snapshot) {
        self.saved_nodes = Some(Arc::clone(&snapshot.nodes));
        self.saved_edges = Some(Arc::clone(&snapshot.edges));
        self.saved_legend = Some(Arc::clone(&snapshot.legend));
    }

    /// Write all three keys.
    pub fn save(&mut self, snapshot: &Snapshot) {
        self.write_key(NODES_KEY, &snapshot.nodes);
        self.write_key(EDGES_KEY, &snapshot.edges);
        self.write_key(LEGEND_KEY, &snapshot.legend);
        self.mark_saved(snapshot);
    }

    /// Write only the keys whose collection changed since the last save.
    /// Returns how many keys were written.
    pub fn sync(&mut self, snapshot: &Snapshot) -> usize {
        let mut written = 0;

        if !same(&self.saved_nodes, &snapshot.nodes) {
            self.write_key(NODES_KEY, &snapshot.nodes);
            self.saved_nodes = Some(Arc::clone(&snapshot.nodes));
            written += 1;
        }
        if !same(&self.saved_edges, &snapshot.edges) {
            self.write_key(EDGES_KEY, &snapshot.edges);
            self.saved_edges = Some(Arc::clone(&snapshot.edges));
            written += 1;
        }
        if !same(&self.saved_legend, &snapshot.legend) {
            self.write_key(LEGEND_KEY, &snapshot.legend);
            self.saved_legend = Some(Arc::clone(&snapshot.legend));
            written += 1;
        }

        written
    }

    /// Store empty arrays under every key.
    ///
    /// The keys are overwritten, not removed: a missing `legend` key loads
    /// the built-in legend, while a stored `[]` loads as empty, so a reset
    /// followed by a reload stays empty.
    pub fn clear(&mut self) {
        for key in [NODES_KEY, EDGES_KEY, LEGEND_KEY] {
            if let Err(e) = self.store.set(key, "[]") {
                warn!(key, error = %e, "failed to clear persisted key");
            }
        }
        self.saved_nodes = None;
        self.saved_edges = None;
        self.saved_legend = None;
        info!("persisted state cleared");
    }

    fn read_key<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "no persisted value");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "failed to read persisted value");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "corrupt persisted value, using default");
                None
            }
        }
    }

    fn write_key<T: Serialize>(&mut self, key: &str, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(key, error = %e, "failed to serialize state");
                return;
            }
        };
        if let Err(e) = self.store.set(key, &json) {
            warn!(key, error = %e, "failed to persist state");
        }
    }
}

fn same<T>(saved: &Option<Arc<T>>, current: &Arc<T>) -> bool {
    saved.as_ref().is_some_and(|s| Arc::ptr_eq(s, current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CardinalityKind, Column, EdgeSpec, Endpoint, NodeData};
    use crate::store::{GraphStore, LinkOrigin};

    fn sample() -> Snapshot {
        let mut store = GraphStore::default();
        let a = store
            .create_node(NodeData::new("ORDERS", vec![Column::new("id", true)], "#fbbf24"))
            .unwrap();
        let b = store
            .create_node(NodeData::new("CUSTOMERS", vec![Column::new("id", true)], "#94a3b8"))
            .unwrap();
        store.create_edge(
            EdgeSpec::new(Endpoint::column(&a, "id"), Endpoint::column(&b, "id"), CardinalityKind::ManyToOne),
            LinkOrigin::Explicit,
        );
        Snapshot {
            nodes: store.nodes(),
            edges: store.edges(),
            legend: Arc::new(default_legend()),
        }
    }

    #[test]
    fn test_missing_keys_load_defaults() {
        let adapter = PersistenceAdapter::new(MemoryStore::new());
        let state = adapter.load();
        assert!(state.nodes.is_empty());
        assert!(state.edges.is_empty());
        assert_eq!(state.legend, default_legend());
    }

    #[test]
    fn test_corrupt_keys_degrade_independently() {
        let snapshot = sample();
        let mut adapter = PersistenceAdapter::new(MemoryStore::new());
        adapter.save(&snapshot);

        let mut store = adapter.into_store();
        store.set(EDGES_KEY, "{not json").unwrap();
        store.set(LEGEND_KEY, "42").unwrap();

        let state = PersistenceAdapter::new(store).load();
        assert_eq!(state.nodes, *snapshot.nodes);
        assert!(state.edges.is_empty());
        assert_eq!(state.legend, default_legend());
    }

    #[test]
    fn test_save_load_round_trip() {
        let snapshot = sample();
        let mut adapter = PersistenceAdapter::new(MemoryStore::new());
        adapter.save(&snapshot);

        let state = adapter.load();
        assert_eq!(state.nodes, *snapshot.nodes);
        assert_eq!(state.edges, *snapshot.edges);
        assert_eq!(state.edges[0].kind(), CardinalityKind::ManyToOne);
    }

    #[test]
    fn test_save_is_idempotent() {
        let snapshot = sample();
        let mut adapter = PersistenceAdapter::new(MemoryStore::new());
        adapter.save(&snapshot);
        let first = adapter.store().clone();
        adapter.save(&snapshot);
        let second = adapter.store();
        for key in [NODES_KEY, EDGES_KEY, LEGEND_KEY] {
            assert_eq!(first.get(key).unwrap(), second.get(key).unwrap());
        }
    }

    #[test]
    fn test_sync_writes_changed_keys_only() {
        let snapshot = sample();
        let mut adapter = PersistenceAdapter::new(MemoryStore::new());
        assert_eq!(adapter.sync(&snapshot), 3);
        assert_eq!(adapter.sync(&snapshot), 0);

        let changed = Snapshot {
            edges: Arc::new(Vec::new()),
            ..snapshot.clone()
        };
        assert_eq!(adapter.sync(&changed), 1);
        assert_eq!(adapter.store().get(EDGES_KEY).unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_clear_then_load_is_empty() {
        let mut adapter = PersistenceAdapter::new(MemoryStore::new());
        adapter.save(&sample());
        adapter.clear();
        let state = adapter.load();
        assert_eq!(state, LoadedState::default());
    }

    #[test]
    fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("state"));
        assert_eq!(store.get(NODES_KEY).unwrap(), None);

        store.set(NODES_KEY, "[]").unwrap();
        assert_eq!(store.get(NODES_KEY).unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("state").join("nodes.json").exists());

        store.set(NODES_KEY, "[1]").unwrap();
        assert_eq!(store.get(NODES_KEY).unwrap().as_deref(), Some("[1]"));
        assert!(!dir.path().join("state").join(".nodes.json.tmp").exists());
    }

    #[test]
    fn test_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = sample();
        let mut adapter = PersistenceAdapter::new(FileStore::new(dir.path()));
        adapter.save(&snapshot);

        let reopened = PersistenceAdapter::new(FileStore::new(dir.path()));
        let state = reopened.load();
        assert_eq!(state.nodes, *snapshot.nodes);
        assert_eq!(state.edges, *snapshot.edges);
        assert_eq!(state.legend, *snapshot.legend);
    }
}
