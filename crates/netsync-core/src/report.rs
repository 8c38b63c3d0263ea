//! Outcome types for applying a diff.

use std::fmt;

use serde::Serialize;

use crate::error::SyncError;

/// Kind of change applied to one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplyAction {
    Create,
    Update,
    Delete,
}

impl fmt::Display for ApplyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApplyAction::Create => "create",
            ApplyAction::Update => "update",
            ApplyAction::Delete => "delete",
        };
        write!(f, "{}", s)
    }
}

/// Result of applying a single change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplyStatus {
    Success,
    /// Target already matched the source for this record.
    Skipped,
    Failed,
}

impl ApplyStatus {
    /// Returns true unless the change failed.
    pub fn is_success(&self) -> bool {
        matches!(self, ApplyStatus::Success | ApplyStatus::Skipped)
    }
}

/// Per-status totals for one action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ActionCounts {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl ActionCounts {
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }

    fn bump(&mut self, status: ApplyStatus) {
        match status {
            ApplyStatus::Success => self.succeeded += 1,
            ApplyStatus::Skipped => self.skipped += 1,
            ApplyStatus::Failed => self.failed += 1,
        }
    }
}

/// A change that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplyFailure {
    pub action: ApplyAction,
    pub kind: String,
    pub identity: String,
    pub error: String,
}

/// A reference left unset because its referent was missing from the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedRef {
    pub kind: String,
    pub identity: String,
    pub field: String,
    pub target: String,
    pub reference: String,
}

impl UnresolvedRef {
    pub fn to_error(&self) -> SyncError {
        SyncError::UnresolvedReference {
            kind: self.kind.clone(),
            field: self.field.clone(),
            target: self.target.clone(),
            identity: self.reference.clone(),
        }
    }
}

/// Aggregate outcome of one apply run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub created: ActionCounts,
    pub updated: ActionCounts,
    pub deleted: ActionCounts,
    pub failures: Vec<ApplyFailure>,
    pub unresolved: Vec<UnresolvedRef>,
    /// Set when a failure stopped the run early.
    pub aborted: bool,
}

impl ApplyReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, action: ApplyAction, status: ApplyStatus) {
        self.counts_mut(action).bump(status);
    }

    pub fn record_failure(&mut self, action: ApplyAction, kind: &str, identity: &str, error: &SyncError) {
        self.record(action, ApplyStatus::Failed);
        self.failures.push(ApplyFailure {
            action,
            kind: kind.to_string(),
            identity: identity.to_string(),
            error: error.to_string(),
        });
    }

    pub fn counts(&self, action: ApplyAction) -> &ActionCounts {
        match action {
            ApplyAction::Create => &self.created,
            ApplyAction::Update => &self.updated,
            ApplyAction::Delete => &self.deleted,
        }
    }

    fn counts_mut(&mut self, action: ApplyAction) -> &mut ActionCounts {
        match action {
            ApplyAction::Create => &mut self.created,
            ApplyAction::Update => &mut self.updated,
            ApplyAction::Delete => &mut self.deleted,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.created.succeeded + self.updated.succeeded + self.deleted.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Returns true if nothing failed and the run was not aborted.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.aborted
    }
}
