//! Bulk structured import and export.
//!
//! The document maps kind name -> unique id -> field mapping:
//!
//! ```json
//! {
//!   "site":   { "ams01": { "slug": "ams01", "vlans": ["ams01__100"] } },
//!   "vlan":   { "ams01__100": { "site": "ams01", "vid": 100, "name": "mgmt" } }
//! }
//! ```
//!
//! Records are built from their fields; the unique-id key is only used to
//! report failures.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{SyncError, SyncResult};
use crate::store::SnapshotStore;
use crate::value::{Fields, Identity};

/// Bulk document: kind -> unique id -> fields.
pub type BulkData = BTreeMap<String, BTreeMap<String, Fields>>;

/// A document entry that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFailure {
    pub kind: String,
    pub key: String,
    pub error: SyncError,
}

/// Outcome of a bulk load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: usize,
    pub failures: Vec<LoadFailure>,
    /// Kind names present in the document but not in the registry.
    pub skipped_kinds: Vec<String>,
    /// Child references dropped because the child was never loaded.
    pub pruned_children: Vec<(String, Identity)>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.skipped_kinds.is_empty() && self.pruned_children.is_empty()
    }
}

/// Loads a bulk document into `store` in registry order.
///
/// Each entry is independent: a record with a missing identifier or a
/// duplicate identity is reported and skipped.
pub fn load(store: &mut SnapshotStore, mut data: BulkData) -> LoadReport {
    let mut report = LoadReport::default();
    let order = store.registry().order();

    for kind in &order {
        let Some(entries) = data.remove(*kind) else {
            continue;
        };
        for (key, fields) in entries {
            match store.insert(kind, fields) {
                Ok(_) => report.loaded += 1,
                Err(error) => {
                    warn!(kind = *kind, key = %key, error = %error, "Skipping record");
                    report.failures.push(LoadFailure {
                        kind: kind.to_string(),
                        key,
                        error,
                    });
                }
            }
        }
    }

    for kind in data.into_keys() {
        warn!(kind = %kind, "Skipping undeclared kind");
        report.skipped_kinds.push(kind);
    }

    report.pruned_children = store
        .prune_dangling_children()
        .into_iter()
        .map(|(kind, id)| (kind.to_string(), id))
        .collect();
    for (kind, id) in &report.pruned_children {
        warn!(kind = %kind, identity = %id, "Pruned dangling child reference");
    }

    info!(
        store = %store.name(),
        loaded = report.loaded,
        failed = report.failures.len(),
        "Bulk load complete"
    );
    report
}

/// Parses a JSON bulk document and loads it.
///
/// # Errors
///
/// Returns [`SyncError::Import`] if the text is not a valid document.
pub fn load_json_str(store: &mut SnapshotStore, json: &str) -> SyncResult<LoadReport> {
    let data: BulkData =
        serde_json::from_str(json).map_err(|e| SyncError::Import(e.to_string()))?;
    Ok(load(store, data))
}

/// Reads and loads a JSON bulk document from disk.
///
/// # Errors
///
/// Returns [`SyncError::Import`] if the file cannot be read or decoded.
pub fn load_json_file(store: &mut SnapshotStore, path: impl AsRef<Path>) -> SyncResult<LoadReport> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)
        .map_err(|e| SyncError::Import(format!("{}: {}", path.display(), e)))?;
    load_json_str(store, &json)
}

/// Renders a store back into bulk document form.
pub fn export(store: &SnapshotStore) -> BulkData {
    let registry = store.registry();
    let mut data = BulkData::new();
    for kind in registry.order() {
        let Ok(schema) = registry.schema(kind) else {
            continue;
        };
        let entries: BTreeMap<String, Fields> = store
            .get_all(kind)
            .map(|r| (r.unique_id(), r.to_fields(schema)))
            .collect();
        if !entries.is_empty() {
            data.insert(kind.to_string(), entries);
        }
    }
    data
}

/// Renders a store as a pretty-printed JSON bulk document.
pub fn to_json_string(store: &SnapshotStore) -> SyncResult<String> {
    serde_json::to_string_pretty(&export(store)).map_err(|e| SyncError::Import(e.to_string()))
}
