//! Sync (apply) engine: replays a diff against a target store.
//!
//! # Ordering
//!
//! Groups are applied in diff order. Within a group creates run first, then
//! updates, then deletes. Deleting a record first deletes every descendant
//! that is itself pending deletion, deepest first, so a child is never
//! deleted after its parent.
//!
//! # Reference resolution
//!
//! Values being written come from the source record, which names referents
//! by unique id. Each id is looked up in the target store and replaced by
//! the referent's native handle. Existing target records are always located
//! through the target store. A referent missing from the target leaves that
//! one field out of the write and is listed on the report.

use std::collections::{BTreeMap, HashSet};
use std::ops::ControlFlow;

use tracing::{debug, info, instrument, warn};

use crate::diff::{diff, Diff, DiffGroup, Modified, SyncFlags};
use crate::error::{SyncError, SyncResult};
use crate::hooks::{Locator, RefValue, TargetHooks, WriteRequest};
use crate::record::Record;
use crate::registry::Schema;
use crate::report::{ApplyAction, ApplyReport, ApplyStatus, UnresolvedRef};
use crate::store::SnapshotStore;
use crate::value::{Fields, Handle, Identity, Value};

/// Computes the diff from `source` to `target` and applies it.
///
/// # Errors
///
/// Returns [`SyncError::Schema`] if the stores use different registries.
pub fn sync<H>(
    source: &SnapshotStore,
    target: &mut SnapshotStore,
    hooks: &mut H,
    flags: SyncFlags,
) -> SyncResult<(Diff, ApplyReport)>
where
    H: TargetHooks + ?Sized,
{
    let diff = diff(source, target, flags)?;
    let report = apply(&diff, source, target, hooks, flags)?;
    Ok((diff, report))
}

/// Applies `diff` to `target`, calling `hooks` for every write.
///
/// Per-record failures never surface as `Err`; they are collected on the
/// returned [`ApplyReport`]. With `continue_on_failure` off, the first
/// failure stops the run and sets [`ApplyReport::aborted`].
///
/// # Errors
///
/// Returns [`SyncError::Schema`] if a kind in the diff is not declared.
#[instrument(skip_all, fields(source = %source.name(), target = %target.name()))]
pub fn apply<H>(
    diff: &Diff,
    source: &SnapshotStore,
    target: &mut SnapshotStore,
    hooks: &mut H,
    flags: SyncFlags,
) -> SyncResult<ApplyReport>
where
    H: TargetHooks + ?Sized,
{
    let registry = source.registry().clone();
    for group in &diff.groups {
        if !target.registry().contains(group.kind) {
            return Err(SyncError::schema(format!(
                "kind '{}' is not declared by target store '{}'",
                group.kind,
                target.name()
            )));
        }
    }

    let pending_delete: HashSet<(&'static str, Identity)> = diff
        .groups
        .iter()
        .flat_map(|g| g.deleted.iter().map(move |id| (g.kind, id.clone())))
        .collect();

    let mut applier = Applier {
        source,
        target,
        hooks,
        flags,
        report: ApplyReport::new(),
        pending_delete,
        deleted: HashSet::new(),
    };

    for group in &diff.groups {
        let schema = registry.schema(group.kind)?;
        if applier.apply_group(schema, group).is_break() {
            break;
        }
    }

    let report = applier.report;
    info!(
        created = report.created.succeeded,
        updated = report.updated.succeeded,
        deleted = report.deleted.succeeded,
        failed = report.failed(),
        unresolved = report.unresolved.len(),
        aborted = report.aborted,
        "Applied diff"
    );
    Ok(report)
}

struct Applier<'a, H: ?Sized> {
    source: &'a SnapshotStore,
    target: &'a mut SnapshotStore,
    hooks: &'a mut H,
    flags: SyncFlags,
    report: ApplyReport,
    pending_delete: HashSet<(&'static str, Identity)>,
    deleted: HashSet<(&'static str, Identity)>,
}

impl<H> Applier<'_, H>
where
    H: TargetHooks + ?Sized,
{
    fn apply_group(&mut self, schema: &Schema, group: &DiffGroup) -> ControlFlow<()> {
        for id in &group.created {
            let result = self.create(schema, id);
            self.settle(ApplyAction::Create, schema.kind, id, result)?;
        }
        for modified in &group.modified {
            let result = self.update(schema, modified);
            self.settle(ApplyAction::Update, schema.kind, &modified.identity, result)?;
        }
        for id in &group.deleted {
            self.delete_tree(schema, id)?;
        }
        ControlFlow::Continue(())
    }

    /// Records the outcome of one change; breaks if the run must stop.
    fn settle(
        &mut self,
        action: ApplyAction,
        kind: &str,
        id: &Identity,
        result: SyncResult<ApplyStatus>,
    ) -> ControlFlow<()> {
        match result {
            Ok(status) => {
                self.report.record(action, status);
                ControlFlow::Continue(())
            }
            Err(err) => {
                warn!(%action, kind, identity = %id, error = %err, "Failed to apply change");
                self.report.record_failure(action, kind, &id.unique_id(), &err);
                if self.flags.continue_on_failure {
                    ControlFlow::Continue(())
                } else {
                    self.report.aborted = true;
                    ControlFlow::Break(())
                }
            }
        }
    }

    fn create(&mut self, schema: &Schema, id: &Identity) -> SyncResult<ApplyStatus> {
        if self.target.contains(schema.kind, id) {
            return Ok(ApplyStatus::Skipped);
        }
        let source = self.source;
        let record = source.get(schema.kind, id)?;

        let ids: Fields = record
            .identity_fields()
            .map(|(f, v)| (f.to_string(), v.clone()))
            .collect();
        let mut attrs = Fields::new();
        let mut refs = BTreeMap::new();

        for (field, value) in record.attributes() {
            if value.is_null() || is_reference(schema, field) {
                continue;
            }
            attrs.insert(field.to_string(), value.clone());
        }

        for &(field, target_kind) in schema.foreign_keys.iter().chain(schema.many_to_many) {
            let value = record.get(field);
            if let Some(resolved) = self.resolve(schema, record, field, target_kind, value) {
                refs.insert(field.to_string(), resolved);
            }
        }

        for relation in schema.generic {
            match (relation.resolver)(record, self.target) {
                Some(handle) => {
                    refs.insert(relation.field.to_string(), RefValue::One(handle));
                }
                None => {
                    let reference = relation
                        .identifiers
                        .iter()
                        .filter_map(|f| record.get(f).identity_part())
                        .collect::<Vec<_>>()
                        .join(Identity::SEPARATOR);
                    self.unresolved(record, relation.field, relation.target, reference);
                }
            }
        }

        let request = WriteRequest {
            kind: schema.kind.to_string(),
            identity: id.clone(),
            ids,
            attrs,
            refs,
        };
        let handle = self
            .hooks
            .create(&request)
            .map_err(|e| SyncError::hook(ApplyAction::Create, schema.kind, id, e))?;

        let parent = source
            .parent_of(schema.kind, id)
            .map(|(kind, parent_id)| (kind, parent_id.clone()));

        let mut created = self.target.build(schema.kind, record.fields().clone())?;
        created.set_handle(Some(handle));
        self.target.add(created)?;

        if let Some((parent_kind, parent_id)) = parent {
            if self.target.contains(parent_kind, &parent_id) {
                self.target
                    .add_child(parent_kind, &parent_id, schema.kind, id)?;
            }
        }

        debug!(kind = schema.kind, identity = %id, "Created record");
        Ok(ApplyStatus::Success)
    }

    fn update(&mut self, schema: &Schema, modified: &Modified) -> SyncResult<ApplyStatus> {
        let id = &modified.identity;
        let source = self.source;
        let source_record = source.get(schema.kind, id)?;
        let locator = self.locate(schema, id)?;

        let mut attrs = Fields::new();
        let mut refs = BTreeMap::new();
        let mut changes = Fields::new();

        for change in &modified.changes {
            let field = change.field;
            changes.insert(field.to_string(), change.source.clone());

            if change.source.is_null() || !is_reference(schema, field) {
                attrs.insert(field.to_string(), change.source.clone());
                continue;
            }
            let target_kind = schema
                .foreign_key(field)
                .or_else(|| schema.many_to_many(field))
                .unwrap_or_default();
            if let Some(resolved) =
                self.resolve(schema, source_record, field, target_kind, &change.source)
            {
                refs.insert(field.to_string(), resolved);
            }
        }

        let request = WriteRequest {
            kind: schema.kind.to_string(),
            identity: id.clone(),
            ids: locator.keys.clone(),
            attrs,
            refs,
        };
        self.hooks
            .update(&locator, &request)
            .map_err(|e| SyncError::hook(ApplyAction::Update, schema.kind, id, e))?;

        self.target.update(schema.kind, id, &changes)?;
        debug!(kind = schema.kind, identity = %id, "Updated record");
        Ok(ApplyStatus::Success)
    }

    /// Deletes `id` after any of its descendants that are pending deletion.
    fn delete_tree(&mut self, schema: &Schema, id: &Identity) -> ControlFlow<()> {
        let descendants: Vec<_> = self
            .target
            .descendants(schema.kind, id)
            .into_iter()
            .filter(|key| self.pending_delete.contains(key))
            .collect();

        for (kind, child_id) in descendants {
            let result = self.delete(kind, &child_id);
            self.settle(ApplyAction::Delete, kind, &child_id, result)?;
        }

        let result = self.delete(schema.kind, id);
        self.settle(ApplyAction::Delete, schema.kind, id, result)
    }

    fn delete(&mut self, kind: &'static str, id: &Identity) -> SyncResult<ApplyStatus> {
        let key = (kind, id.clone());
        if self.deleted.contains(&key) || !self.target.contains(kind, id) {
            return Ok(ApplyStatus::Skipped);
        }

        let schema = *self.target.registry().schema(kind)?;
        let locator = self.locate(&schema, id)?;
        self.hooks
            .delete(&locator)
            .map_err(|e| SyncError::hook(ApplyAction::Delete, kind, id, e))?;

        self.target.remove(kind, id)?;
        self.deleted.insert(key);
        debug!(kind, identity = %id, "Deleted record");
        Ok(ApplyStatus::Success)
    }

    /// Addresses an existing target record: its handle plus identity fields,
    /// with foreign-key identifiers swapped for the referents' handles.
    fn locate(&self, schema: &Schema, id: &Identity) -> SyncResult<Locator> {
        let record = self.target.get(schema.kind, id)?;
        let keys = record
            .identity_fields()
            .map(|(field, value)| {
                let key = schema
                    .foreign_key(field)
                    .and_then(|kind| target_handle(self.target, kind, value))
                    .map(|h| Value::from(h.as_str()))
                    .unwrap_or_else(|| value.clone());
                (field.to_string(), key)
            })
            .collect();

        Ok(Locator {
            kind: schema.kind.to_string(),
            identity: id.clone(),
            handle: record.handle().cloned(),
            keys,
        })
    }

    /// Resolves a foreign-key or many-to-many value to target handles.
    ///
    /// Missing referents are dropped and recorded as unresolved. Returns
    /// `None` when there is nothing left to write.
    fn resolve(
        &mut self,
        schema: &Schema,
        record: &Record,
        field: &'static str,
        target_kind: &'static str,
        value: &Value,
    ) -> Option<RefValue> {
        if schema.many_to_many(field).is_some() {
            let items = value.as_list()?;
            let mut handles = Vec::with_capacity(items.len());
            for item in items {
                match target_handle(self.target, target_kind, item) {
                    Some(handle) => handles.push(handle),
                    None => self.unresolved(record, field, target_kind, item.to_string()),
                }
            }
            return Some(RefValue::Many(handles));
        }

        if value.is_null() {
            return None;
        }
        match target_handle(self.target, target_kind, value) {
            Some(handle) => Some(RefValue::One(handle)),
            None => {
                let reference = value.identity_part().unwrap_or_default();
                self.unresolved(record, field, target_kind, reference);
                None
            }
        }
    }

    fn unresolved(&mut self, record: &Record, field: &str, target: &str, reference: String) {
        let entry = UnresolvedRef {
            kind: record.kind().to_string(),
            identity: record.unique_id(),
            field: field.to_string(),
            target: target.to_string(),
            reference,
        };
        debug!(error = %entry.to_error(), "Leaving reference unset");
        self.report.unresolved.push(entry);
    }
}

fn is_reference(schema: &Schema, field: &str) -> bool {
    schema.foreign_key(field).is_some() || schema.many_to_many(field).is_some()
}

/// Native handle of the `kind` record whose unique id is `value`.
///
/// A referent that exists but has no native handle yet is addressed by its
/// unique id.
fn target_handle(target: &SnapshotStore, kind: &str, value: &Value) -> Option<Handle> {
    let uid = value.identity_part()?;
    let record = target.get_by_uid(kind, &uid).ok()?;
    Some(
        record
            .handle()
            .cloned()
            .unwrap_or_else(|| Handle::new(record.unique_id())),
    )
}
