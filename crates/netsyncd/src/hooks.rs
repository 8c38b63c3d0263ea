//! Journaling target hooks.
//!
//! [`JournalHooks`] stands in for a real system of record: every write is
//! accepted, new records get a UUID handle, and each call is journaled so
//! the CLI can print or persist exactly what a sync would have sent.

use std::collections::{BTreeMap, HashSet};

use netsync_core::{
    ApplyAction, Fields, Handle, HookError, Locator, RefValue, TargetHooks, Value, WriteRequest,
};
use serde::Serialize;
use uuid::Uuid;

/// One journaled hook call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalEntry {
    pub action: ApplyAction,
    pub kind: String,
    pub identity: String,
    /// Handle assigned on create, or the located handle otherwise.
    pub handle: Option<String>,
    pub attrs: Fields,
    pub refs: BTreeMap<String, Value>,
}

#[derive(Debug, Default)]
pub struct JournalHooks {
    entries: Vec<JournalEntry>,
    reject: HashSet<(ApplyAction, String, String)>,
}

fn refs_to_values(refs: &BTreeMap<String, RefValue>) -> BTreeMap<String, Value> {
    refs.iter()
        .map(|(field, value)| {
            let value = match value {
                RefValue::One(handle) => Value::from(handle.as_str()),
                RefValue::Many(handles) => {
                    Value::from(handles.iter().map(|h| h.as_str().to_string()).collect::<Vec<_>>())
                }
            };
            (field.clone(), value)
        })
        .collect()
}

impl JournalHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the given call fail, for exercising error paths.
    pub fn reject(mut self, action: ApplyAction, kind: &str, unique_id: &str) -> Self {
        self.reject
            .insert((action, kind.to_string(), unique_id.to_string()));
        self
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn count(&self, action: ApplyAction) -> usize {
        self.entries.iter().filter(|e| e.action == action).count()
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }

    fn check(&self, action: ApplyAction, kind: &str, unique_id: &str) -> Result<(), HookError> {
        if self
            .reject
            .contains(&(action, kind.to_string(), unique_id.to_string()))
        {
            return Err(HookError::new(format!("{} rejected by target", action)));
        }
        Ok(())
    }
}

impl TargetHooks for JournalHooks {
    fn create(&mut self, request: &WriteRequest) -> Result<Handle, HookError> {
        let uid = request.identity.unique_id();
        self.check(ApplyAction::Create, &request.kind, &uid)?;

        let handle = Handle::new(Uuid::new_v4().to_string());
        let mut attrs = request.ids.clone();
        attrs.extend(request.attrs.clone());
        self.entries.push(JournalEntry {
            action: ApplyAction::Create,
            kind: request.kind.clone(),
            identity: uid,
            handle: Some(handle.as_str().to_string()),
            attrs,
            refs: refs_to_values(&request.refs),
        });
        Ok(handle)
    }

    fn update(&mut self, locator: &Locator, request: &WriteRequest) -> Result<(), HookError> {
        let uid = locator.identity.unique_id();
        self.check(ApplyAction::Update, &locator.kind, &uid)?;

        self.entries.push(JournalEntry {
            action: ApplyAction::Update,
            kind: locator.kind.clone(),
            identity: uid,
            handle: locator.handle.as_ref().map(|h| h.as_str().to_string()),
            attrs: request.attrs.clone(),
            refs: refs_to_values(&request.refs),
        });
        Ok(())
    }

    fn delete(&mut self, locator: &Locator) -> Result<(), HookError> {
        let uid = locator.identity.unique_id();
        self.check(ApplyAction::Delete, &locator.kind, &uid)?;

        self.entries.push(JournalEntry {
            action: ApplyAction::Delete,
            kind: locator.kind.clone(),
            identity: uid,
            handle: locator.handle.as_ref().map(|h| h.as_str().to_string()),
            attrs: locator.keys.clone(),
            refs: BTreeMap::new(),
        });
        Ok(())
    }
}
