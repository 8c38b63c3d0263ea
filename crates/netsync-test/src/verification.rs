//! Verification helpers for testing snapshot stores
//!
//! Provides assertion helpers over store contents and containment

use netsync_core::{Identity, Record, SnapshotStore, Value};
use thiserror::Error;

/// Verification error types
#[derive(Error, Debug, PartialEq)]
pub enum VerificationError {
    #[error("Expected {kind} '{identity}' not found")]
    RecordNotFound { kind: String, identity: String },

    #[error("Unexpected {kind} '{identity}' present")]
    UnexpectedRecord { kind: String, identity: String },

    #[error("Value mismatch for {kind} '{identity}'.{field}: expected {expected}, got {actual}")]
    ValueMismatch {
        kind: String,
        identity: String,
        field: String,
        expected: Value,
        actual: Value,
    },

    #[error("Expected {expected} {kind} records, found {actual}")]
    CountMismatch {
        kind: String,
        expected: usize,
        actual: usize,
    },

    #[error("{parent} does not contain {child}")]
    ChildMissing { parent: String, child: String },

    #[error("{parent} still contains {child}")]
    UnexpectedChild { parent: String, child: String },
}

/// Result type for verification operations
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Snapshot store verification helper
pub struct StoreVerifier<'a> {
    store: &'a SnapshotStore,
}

impl<'a> StoreVerifier<'a> {
    /// Create a new store verifier
    pub fn new(store: &'a SnapshotStore) -> Self {
        Self { store }
    }

    fn record(&self, kind: &str, uid: &str) -> VerifyResult<&'a Record> {
        self.store
            .get_by_uid(kind, uid)
            .map_err(|_| VerificationError::RecordNotFound {
                kind: kind.to_string(),
                identity: uid.to_string(),
            })
    }

    /// Verify that a record exists
    pub fn assert_exists(&self, kind: &str, uid: &str) -> VerifyResult<()> {
        self.record(kind, uid).map(|_| ())
    }

    /// Verify that a record does not exist
    pub fn assert_absent(&self, kind: &str, uid: &str) -> VerifyResult<()> {
        if self.store.contains(kind, &Identity::parse(uid)) {
            return Err(VerificationError::UnexpectedRecord {
                kind: kind.to_string(),
                identity: uid.to_string(),
            });
        }
        Ok(())
    }

    /// Verify that a field has a specific value
    pub fn assert_field(
        &self,
        kind: &str,
        uid: &str,
        field: &str,
        expected: impl Into<Value>,
    ) -> VerifyResult<()> {
        let expected = expected.into();
        let actual = self.record(kind, uid)?.get(field).clone();
        if actual != expected {
            return Err(VerificationError::ValueMismatch {
                kind: kind.to_string(),
                identity: uid.to_string(),
                field: field.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Verify the number of records of a kind
    pub fn assert_count(&self, kind: &str, expected: usize) -> VerifyResult<()> {
        let actual = self.store.count(kind);
        if actual != expected {
            return Err(VerificationError::CountMismatch {
                kind: kind.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }

    /// Verify that `parent` lists `child` among its children
    pub fn assert_child(
        &self,
        parent_kind: &str,
        parent: &str,
        child_kind: &str,
        child: &str,
    ) -> VerifyResult<()> {
        let record = self.record(parent_kind, parent)?;
        if !record.children(child_kind).contains(&Identity::parse(child)) {
            return Err(VerificationError::ChildMissing {
                parent: format!("{} '{}'", parent_kind, parent),
                child: format!("{} '{}'", child_kind, child),
            });
        }
        Ok(())
    }

    /// Verify that `parent` no longer lists `child`
    pub fn assert_not_child(
        &self,
        parent_kind: &str,
        parent: &str,
        child_kind: &str,
        child: &str,
    ) -> VerifyResult<()> {
        let record = self.record(parent_kind, parent)?;
        if record.children(child_kind).contains(&Identity::parse(child)) {
            return Err(VerificationError::UnexpectedChild {
                parent: format!("{} '{}'", parent_kind, parent),
                child: format!("{} '{}'", child_kind, child),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Ams01Topology;

    #[test]
    fn test_verifier_reports_mismatches() {
        let store = Ams01Topology::new().build("ams01").unwrap();
        let verifier = StoreVerifier::new(&store);

        verifier.assert_exists("device", "ams01-edge-01").unwrap();
        verifier.assert_absent("device", "ams01-edge-99").unwrap();
        verifier
            .assert_field("vlan", "ams01__100", "name", "mgmt")
            .unwrap();
        verifier
            .assert_child("device", "ams01-edge-01", "interface", "ams01-edge-01__Loopback0")
            .unwrap();

        assert!(matches!(
            verifier.assert_count("device", 3),
            Err(VerificationError::CountMismatch { actual: 2, .. })
        ));
        assert!(matches!(
            verifier.assert_field("vlan", "ams01__100", "name", "voice"),
            Err(VerificationError::ValueMismatch { .. })
        ));
    }
}
