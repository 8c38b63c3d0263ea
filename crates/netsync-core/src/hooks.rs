//! Target-side persistence hooks.
//!
//! The sync engine decides *what* to write; a [`TargetHooks`]
//! implementation decides *how* the target system stores it. References
//! arrive already resolved to native handles of the target system.

use std::collections::BTreeMap;

use crate::error::HookError;
use crate::value::{Fields, Handle, Identity};

/// A reference field resolved to native handles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefValue {
    One(Handle),
    Many(Vec<Handle>),
}

/// Identity and attributes of a record to create or update.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub kind: String,
    pub identity: Identity,
    /// Identity fields with their raw values.
    pub ids: Fields,
    /// Plain attribute values being written.
    pub attrs: Fields,
    /// Reference fields resolved in the target. Unresolvable references are
    /// absent here and reported on the apply report instead.
    pub refs: BTreeMap<String, RefValue>,
}

/// Addresses an existing record in the target system.
#[derive(Debug, Clone, PartialEq)]
pub struct Locator {
    pub kind: String,
    pub identity: Identity,
    /// Native handle, when the target store knows it.
    pub handle: Option<Handle>,
    /// Identity fields, with reference identifiers resolved to handles where
    /// possible.
    pub keys: Fields,
}

/// Persistence operations of a target system.
///
/// Implementations must not assume any call order beyond what the sync
/// engine guarantees: parents before children on create, children before
/// parents on delete.
pub trait TargetHooks {
    /// Persists a new record and returns its native handle.
    fn create(&mut self, request: &WriteRequest) -> Result<Handle, HookError>;

    /// Writes changed fields onto an existing record.
    fn update(&mut self, locator: &Locator, request: &WriteRequest) -> Result<(), HookError>;

    /// Removes an existing record.
    fn delete(&mut self, locator: &Locator) -> Result<(), HookError>;
}

/// Hooks that accept every change and hand out sequential handles.
///
/// Useful when the target store itself is the system of record.
#[derive(Debug, Default)]
pub struct InMemoryHooks {
    next: u64,
}

impl InMemoryHooks {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TargetHooks for InMemoryHooks {
    fn create(&mut self, _request: &WriteRequest) -> Result<Handle, HookError> {
        self.next += 1;
        Ok(Handle::new(self.next.to_string()))
    }

    fn update(&mut self, _locator: &Locator, _request: &WriteRequest) -> Result<(), HookError> {
        Ok(())
    }

    fn delete(&mut self, _locator: &Locator) -> Result<(), HookError> {
        Ok(())
    }
}
