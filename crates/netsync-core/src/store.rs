//! Snapshot Store: one in-memory view of a system's inventory.
//!
//! Records are kept per kind in insertion order and keyed by identity.
//! Secondary indices map native handles and declared unique fields back to
//! identities, and a parent index answers "which record contains this one".

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::record::Record;
use crate::registry::Registry;
use crate::value::{Fields, Handle, Identity, Value};

type RecordKey = (&'static str, Identity);
type Table = IndexMap<Identity, Record>;

/// Keyed, registry-typed collection of records for one system.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    name: String,
    registry: Arc<Registry>,
    tables: HashMap<&'static str, Table>,
    handles: HashMap<(&'static str, Handle), Identity>,
    unique: HashMap<(&'static str, &'static str, String), Identity>,
    parents: HashMap<RecordKey, RecordKey>,
}

impl SnapshotStore {
    /// Creates an empty store with one table per registry kind.
    pub fn new(name: impl Into<String>, registry: Arc<Registry>) -> Self {
        let tables = registry.kinds().map(|kind| (kind, Table::new())).collect();
        Self {
            name: name.into(),
            registry,
            tables,
            handles: HashMap::new(),
            unique: HashMap::new(),
            parents: HashMap::new(),
        }
    }

    /// Empty store over the standard network registry.
    pub fn network(name: impl Into<String>) -> Self {
        Self::new(name, Arc::new(Registry::network()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Total number of records across all kinds.
    pub fn len(&self) -> usize {
        self.tables.values().map(|t| t.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(|t| t.is_empty())
    }

    pub fn count(&self, kind: &str) -> usize {
        self.tables.get(kind).map(|t| t.len()).unwrap_or(0)
    }

    fn table(&self, kind: &str) -> SyncResult<&Table> {
        self.tables
            .get(kind)
            .ok_or_else(|| SyncError::UnknownKind(kind.to_string()))
    }

    fn record_mut(&mut self, kind: &str, id: &Identity) -> SyncResult<&mut Record> {
        self.tables
            .get_mut(kind)
            .ok_or_else(|| SyncError::UnknownKind(kind.to_string()))?
            .get_mut(id)
            .ok_or_else(|| SyncError::not_found(kind, id))
    }

    /// Builds a record of `kind` from raw fields.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UnknownKind`] or [`SyncError::MissingIdentifier`].
    pub fn build(&self, kind: &str, fields: Fields) -> SyncResult<Record> {
        let schema = self.registry.schema(kind)?;
        Record::new(schema, fields)
    }

    /// Inserts a record.
    ///
    /// Children the record lists are registered as contained by it, whether
    /// or not they have been added yet.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::DuplicateIdentity`] if the identity is taken; the
    /// store is left unchanged.
    pub fn add(&mut self, record: Record) -> SyncResult<()> {
        let kind = record.kind();
        let id = record.identity().clone();
        let schema = *self.registry.schema(kind)?;

        if self.table(kind)?.contains_key(&id) {
            return Err(SyncError::duplicate(kind, &id));
        }

        if let Some(handle) = record.handle() {
            self.handles.insert((kind, handle.clone()), id.clone());
        }
        for field in schema.unique_fields {
            if let Some(value) = record.get(field).identity_part() {
                self.unique.entry((kind, field, value)).or_insert_with(|| id.clone());
            }
        }
        for (child_kind, child_id) in record.all_children() {
            self.parents
                .insert((child_kind, child_id.clone()), (kind, id.clone()));
        }

        debug!(store = %self.name, kind, identity = %id, "Added record");

        let table = self
            .tables
            .get_mut(kind)
            .ok_or_else(|| SyncError::UnknownKind(kind.to_string()))?;
        table.insert(id, record);
        Ok(())
    }

    /// Builds and inserts a record, returning its identity.
    pub fn insert(&mut self, kind: &str, fields: Fields) -> SyncResult<Identity> {
        let record = self.build(kind, fields)?;
        let id = record.identity().clone();
        self.add(record)?;
        Ok(id)
    }

    /// Returns the record with the same identity, inserting it first if absent.
    ///
    /// The boolean is true if the record was inserted. An existing record is
    /// returned untouched.
    pub fn get_or_add(&mut self, kind: &str, fields: Fields) -> SyncResult<(&Record, bool)> {
        let record = self.build(kind, fields)?;
        let id = record.identity().clone();
        let created = !self.contains(kind, &id);
        if created {
            self.add(record)?;
        }
        Ok((self.get(kind, &id)?, created))
    }

    pub fn contains(&self, kind: &str, id: &Identity) -> bool {
        self.tables
            .get(kind)
            .map(|t| t.contains_key(id))
            .unwrap_or(false)
    }

    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] if no record has this identity.
    pub fn get(&self, kind: &str, id: &Identity) -> SyncResult<&Record> {
        self.table(kind)?
            .get(id)
            .ok_or_else(|| SyncError::not_found(kind, id))
    }

    /// Looks up a record by its `__`-joined unique id.
    pub fn get_by_uid(&self, kind: &str, unique_id: &str) -> SyncResult<&Record> {
        self.get(kind, &Identity::parse(unique_id))
    }

    /// Records of a kind in insertion order. Unknown kinds yield nothing.
    pub fn get_all(&self, kind: &str) -> impl Iterator<Item = &Record> + '_ {
        self.tables.get(kind).into_iter().flat_map(|t| t.values())
    }

    pub fn get_by_handle(&self, kind: &str, handle: &Handle) -> Option<&Record> {
        let (kind, _) = self.tables.get_key_value(kind)?;
        let id = self.handles.get(&(*kind, handle.clone()))?;
        self.get(kind, id).ok()
    }

    /// Lookup through a field declared unique by the kind's schema.
    pub fn get_by_unique(&self, kind: &str, field: &str, value: &str) -> Option<&Record> {
        let schema = self.registry.schema(kind).ok()?;
        let field = schema.unique_fields.iter().find(|f| **f == field)?;
        let id = self.unique.get(&(schema.kind, *field, value.to_string()))?;
        self.get(kind, id).ok()
    }

    /// Linear scan for records whose `field` equals `value`.
    pub fn get_by_attribute<'a>(
        &'a self,
        kind: &str,
        field: &'a str,
        value: &'a Value,
    ) -> impl Iterator<Item = &'a Record> + 'a {
        self.get_all(kind).filter(move |r| r.get(field) == value)
    }

    /// Attaches `child` under `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::UndeclaredChild`] if the parent kind does not
    /// declare the child kind, or [`SyncError::NotFound`] if the parent is
    /// missing.
    pub fn add_child(
        &mut self,
        parent_kind: &str,
        parent_id: &Identity,
        child_kind: &str,
        child_id: &Identity,
    ) -> SyncResult<()> {
        let registry = Arc::clone(&self.registry);
        let parent_schema = registry.schema(parent_kind)?;
        let child_schema = registry.schema(child_kind)?;
        if parent_schema.children_field(child_kind).is_none() {
            return Err(SyncError::UndeclaredChild {
                parent: parent_kind.to_string(),
                child: child_kind.to_string(),
            });
        }

        let parent = self.record_mut(parent_kind, parent_id)?;
        if parent.add_child(child_schema.kind, child_id.clone()) {
            self.parents.insert(
                (child_schema.kind, child_id.clone()),
                (parent_schema.kind, parent_id.clone()),
            );
        }
        Ok(())
    }

    /// Kind and identity of the record containing `(kind, id)`.
    pub fn parent_of(&self, kind: &str, id: &Identity) -> Option<(&'static str, &Identity)> {
        let (kind, _) = self.tables.get_key_value(kind)?;
        self.parents
            .get(&(*kind, id.clone()))
            .map(|(parent_kind, parent_id)| (*parent_kind, parent_id))
    }

    /// Records transitively contained by `(kind, id)`, deepest first.
    pub fn descendants(&self, kind: &str, id: &Identity) -> Vec<(&'static str, Identity)> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        self.collect_descendants(kind, id, &mut seen, &mut out);
        out
    }

    fn collect_descendants(
        &self,
        kind: &str,
        id: &Identity,
        seen: &mut HashSet<RecordKey>,
        out: &mut Vec<(&'static str, Identity)>,
    ) {
        let Ok(record) = self.get(kind, id) else {
            return;
        };
        for (child_kind, child_id) in record.all_children() {
            if !seen.insert((child_kind, child_id.clone())) {
                continue;
            }
            self.collect_descendants(child_kind, child_id, seen, out);
            if self.contains(child_kind, child_id) {
                out.push((child_kind, child_id.clone()));
            }
        }
    }

    /// Sets or clears a record's native handle.
    pub fn set_handle(&mut self, kind: &str, id: &Identity, handle: Option<Handle>) -> SyncResult<()> {
        let record = self.record_mut(kind, id)?;
        let kind = record.kind();
        let old = record.handle().cloned();
        record.set_handle(handle.clone());

        if let Some(old) = old {
            self.handles.remove(&(kind, old));
        }
        if let Some(handle) = handle {
            self.handles.insert((kind, handle), id.clone());
        }
        Ok(())
    }

    /// Writes field values onto an existing record, keeping indices current.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] or [`SyncError::InvalidField`]. On
    /// error no field has been written.
    pub fn update(&mut self, kind: &str, id: &Identity, changes: &Fields) -> SyncResult<()> {
        let schema = *self.registry.schema(kind)?;
        if let Some(field) = changes.keys().find(|f| schema.is_identifier(f)) {
            return Err(SyncError::InvalidField {
                kind: kind.to_string(),
                field: field.clone(),
                reason: "identity fields are immutable".to_string(),
            });
        }

        let record = self.record_mut(kind, id)?;
        let old_unique: Vec<_> = schema
            .unique_fields
            .iter()
            .filter_map(|f| record.get(f).identity_part().map(|v| (*f, v)))
            .collect();

        for (field, value) in changes {
            record.set(field, value.clone())?;
        }

        let new_unique: Vec<_> = schema
            .unique_fields
            .iter()
            .filter_map(|f| record.get(f).identity_part().map(|v| (*f, v)))
            .collect();

        for (field, value) in old_unique {
            let key = (schema.kind, field, value);
            if self.unique.get(&key) == Some(id) {
                self.unique.remove(&key);
            }
        }
        for (field, value) in new_unique {
            self.unique
                .entry((schema.kind, field, value))
                .or_insert_with(|| id.clone());
        }
        Ok(())
    }

    /// Removes a record and detaches it from its parent.
    ///
    /// The record's own children stay in the store; callers wanting a
    /// cascade use [`descendants`](Self::descendants) first.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NotFound`] if the record is absent.
    pub fn remove(&mut self, kind: &str, id: &Identity) -> SyncResult<Record> {
        let schema = *self.registry.schema(kind)?;
        let record = self
            .tables
            .get_mut(kind)
            .and_then(|t| t.shift_remove(id))
            .ok_or_else(|| SyncError::not_found(kind, id))?;
        let kind = schema.kind;

        if let Some(handle) = record.handle() {
            self.handles.remove(&(kind, handle.clone()));
        }
        for field in schema.unique_fields {
            if let Some(value) = record.get(field).identity_part() {
                let key = (kind, *field, value);
                if self.unique.get(&key) == Some(id) {
                    self.unique.remove(&key);
                }
            }
        }

        if let Some((parent_kind, parent_id)) = self.parents.remove(&(kind, id.clone())) {
            if let Ok(parent) = self.record_mut(parent_kind, &parent_id) {
                parent.remove_child(kind, id);
            }
        }
        for (child_kind, child_id) in record.all_children() {
            let key = (child_kind, child_id.clone());
            if self.parents.get(&key) == Some(&(kind, id.clone())) {
                self.parents.remove(&key);
            }
        }

        debug!(store = %self.name, kind, identity = %id, "Removed record");
        Ok(record)
    }

    /// Drops child references whose records are absent from the store.
    ///
    /// Returns the dangling `(kind, identity)` pairs that were removed.
    pub fn prune_dangling_children(&mut self) -> Vec<(&'static str, Identity)> {
        let present: HashSet<RecordKey> = self
            .tables
            .iter()
            .flat_map(|(kind, table)| table.keys().map(move |id| (*kind, id.clone())))
            .collect();

        let mut dropped = Vec::new();
        for record in self.tables.values_mut().flat_map(|t| t.values_mut()) {
            dropped.extend(record.retain_children(|kind, id| present.contains(&(kind, id.clone()))));
        }
        for key in &dropped {
            self.parents.remove(key);
        }
        dropped
    }
}
