//! Error types for snapshot, diff and sync operations.
//!
//! Every per-record condition is a variant of [`SyncError`]. Only
//! [`SyncError::Schema`] is fatal to a whole run; everything else is
//! isolated to the record that produced it and aggregated by the caller.

use thiserror::Error;

use crate::report::ApplyAction;

/// Result type alias for netsync-core operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while loading, diffing or applying snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// A record with the same kind and identity is already in the store.
    #[error("Duplicate identity: {kind} '{identity}' already exists")]
    DuplicateIdentity { kind: String, identity: String },

    /// Lookup miss.
    #[error("Not found: {kind} '{identity}'")]
    NotFound { kind: String, identity: String },

    /// A reference field points at a record missing from the target store.
    #[error("Unresolved reference: {kind}.{field} -> {target} '{identity}'")]
    UnresolvedReference {
        kind: String,
        field: String,
        target: String,
        identity: String,
    },

    /// A relation that cannot exist, e.g. a cable on a virtual interface.
    #[error("Invalid relation on {kind} '{identity}': {reason}")]
    InvalidRelation {
        kind: String,
        identity: String,
        reason: String,
    },

    /// The target's create/update/delete hook failed.
    #[error("{action} hook failed for {kind} '{identity}': {message}")]
    HookFailure {
        action: ApplyAction,
        kind: String,
        identity: String,
        message: String,
    },

    /// A record is missing one of its identity fields.
    #[error("Missing identifier '{field}' for {kind}")]
    MissingIdentifier { kind: String, field: String },

    /// A field cannot be written (identity fields are immutable).
    #[error("Invalid field {kind}.{field}: {reason}")]
    InvalidField {
        kind: String,
        field: String,
        reason: String,
    },

    /// Containment between two kinds that the registry does not declare.
    #[error("{parent} does not declare {child} as a child kind")]
    UndeclaredChild { parent: String, child: String },

    /// Kind name absent from the registry.
    #[error("Unknown kind: {0}")]
    UnknownKind(String),

    /// Bulk import document could not be read or decoded.
    #[error("Import failed: {0}")]
    Import(String),

    /// Registry misconfiguration. Fatal to the whole run.
    #[error("Schema error: {0}")]
    Schema(String),
}

impl SyncError {
    pub fn duplicate(kind: impl Into<String>, identity: impl ToString) -> Self {
        Self::DuplicateIdentity {
            kind: kind.into(),
            identity: identity.to_string(),
        }
    }

    pub fn not_found(kind: impl Into<String>, identity: impl ToString) -> Self {
        Self::NotFound {
            kind: kind.into(),
            identity: identity.to_string(),
        }
    }

    pub fn invalid_relation(
        kind: impl Into<String>,
        identity: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidRelation {
            kind: kind.into(),
            identity: identity.to_string(),
            reason: reason.into(),
        }
    }

    pub fn hook(
        action: ApplyAction,
        kind: impl Into<String>,
        identity: impl ToString,
        err: HookError,
    ) -> Self {
        Self::HookFailure {
            action,
            kind: kind.into(),
            identity: identity.to_string(),
            message: err.0,
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    /// Returns true if the error only affects the record that produced it.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, SyncError::Schema(_))
    }
}

/// Error returned by a [`TargetHooks`](crate::TargetHooks) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_display() {
        let err = SyncError::duplicate("interface", "ams01-edge-01__Ethernet1/1");
        assert_eq!(
            err.to_string(),
            "Duplicate identity: interface 'ams01-edge-01__Ethernet1/1' already exists"
        );
    }

    #[test]
    fn test_hook_failure_carries_context() {
        let err = SyncError::hook(
            ApplyAction::Update,
            "vlan",
            "ams01__100",
            HookError::new("409 conflict"),
        );
        assert_eq!(
            err.to_string(),
            "update hook failed for vlan 'ams01__100': 409 conflict"
        );
    }

    #[test]
    fn test_only_schema_errors_are_fatal() {
        assert!(SyncError::not_found("device", "x").is_recoverable());
        assert!(SyncError::invalid_relation("cable", "x", "virtual").is_recoverable());
        assert!(!SyncError::schema("bad registry").is_recoverable());
    }
}
