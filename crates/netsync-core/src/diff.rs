//! Diff Engine: structural comparison of two snapshot stores.
//!
//! Kinds are visited in [`Registry::order`], so a parent kind's group always
//! precedes its child kinds' groups. Within a group, records keep the
//! insertion order of the store they come from.
//!
//! [`Registry::order`]: crate::Registry::order

use std::fmt;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::error::{SyncError, SyncResult};
use crate::registry::Schema;
use crate::store::SnapshotStore;
use crate::value::{Identity, Value};

/// Tolerance flags shared by the diff and sync engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncFlags {
    /// Record a failing record and move on instead of stopping the run.
    pub continue_on_failure: bool,
    /// Leave records that exist only in the target untouched.
    pub skip_unmatched_dst: bool,
}

impl Default for SyncFlags {
    fn default() -> Self {
        Self {
            continue_on_failure: true,
            skip_unmatched_dst: false,
        }
    }
}

impl SyncFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_continue_on_failure(mut self, enabled: bool) -> Self {
        self.continue_on_failure = enabled;
        self
    }

    pub fn with_skip_unmatched_dst(mut self, enabled: bool) -> Self {
        self.skip_unmatched_dst = enabled;
        self
    }
}

/// One attribute whose value differs between source and target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: &'static str,
    pub source: Value,
    pub target: Value,
}

/// A record present on both sides with differing attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Modified {
    pub identity: Identity,
    pub changes: Vec<FieldChange>,
}

impl Modified {
    pub fn changed_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.changes.iter().map(|c| c.field)
    }
}

/// Created/deleted/modified partition of one kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffGroup {
    pub kind: &'static str,
    pub created: Vec<Identity>,
    pub deleted: Vec<Identity>,
    pub modified: Vec<Modified>,
}

impl DiffGroup {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            created: Vec::new(),
            deleted: Vec::new(),
            modified: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty() && self.modified.is_empty()
    }
}

/// Counts of a diff, per partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    pub create: usize,
    pub update: usize,
    pub delete: usize,
    pub no_change: usize,
}

impl fmt::Display for DiffSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "create={} update={} delete={} no-change={}",
            self.create, self.update, self.delete, self.no_change
        )
    }
}

/// Ordered per-kind diff between a source and a target store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diff {
    pub source: String,
    pub target: String,
    pub groups: Vec<DiffGroup>,
    #[serde(skip)]
    unchanged: usize,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(DiffGroup::is_empty)
    }

    pub fn group(&self, kind: &str) -> Option<&DiffGroup> {
        self.groups.iter().find(|g| g.kind == kind)
    }

    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary {
            no_change: self.unchanged,
            ..DiffSummary::default()
        };
        for group in &self.groups {
            summary.create += group.created.len();
            summary.update += group.modified.len();
            summary.delete += group.deleted.len();
        }
        summary
    }
}

/// Compares attribute values, ignoring order inside many-to-many lists.
fn field_differs(schema: &Schema, field: &str, source: &Value, target: &Value) -> bool {
    if schema.many_to_many(field).is_some() {
        source.sorted() != target.sorted()
    } else {
        source != target
    }
}

/// Computes the diff that would converge `target` onto `source`.
///
/// # Errors
///
/// Returns [`SyncError::Schema`] if the two stores are not built over the
/// same registry kinds. Per-record problems cannot occur here.
#[instrument(skip_all, fields(source = %source.name(), target = %target.name()))]
pub fn diff(source: &SnapshotStore, target: &SnapshotStore, flags: SyncFlags) -> SyncResult<Diff> {
    let registry = source.registry();
    let source_kinds: Vec<_> = registry.kinds().collect();
    let target_kinds: Vec<_> = target.registry().kinds().collect();
    if source_kinds != target_kinds {
        return Err(SyncError::schema(format!(
            "stores '{}' and '{}' use different registries",
            source.name(),
            target.name()
        )));
    }

    let mut groups = Vec::new();
    let mut unchanged = 0;

    for kind in registry.order() {
        let schema = registry.schema(kind)?;
        let mut group = DiffGroup::new(kind);

        for record in source.get_all(kind) {
            let Ok(existing) = target.get(kind, record.identity()) else {
                group.created.push(record.identity().clone());
                continue;
            };

            let changes: Vec<FieldChange> = record
                .attributes()
                .filter(|(field, value)| field_differs(schema, field, value, existing.get(field)))
                .map(|(field, value)| FieldChange {
                    field,
                    source: value.clone(),
                    target: existing.get(field).clone(),
                })
                .collect();

            if changes.is_empty() {
                unchanged += 1;
            } else {
                group.modified.push(Modified {
                    identity: record.identity().clone(),
                    changes,
                });
            }
        }

        if !flags.skip_unmatched_dst {
            group.deleted = target
                .get_all(kind)
                .filter(|r| !source.contains(kind, r.identity()))
                .map(|r| r.identity().clone())
                .collect();
        }

        debug!(
            kind,
            created = group.created.len(),
            modified = group.modified.len(),
            deleted = group.deleted.len(),
            "Diffed kind"
        );
        groups.push(group);
    }

    Ok(Diff {
        source: source.name().to_string(),
        target: target.name().to_string(),
        groups,
        unchanged,
    })
}
