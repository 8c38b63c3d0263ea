//! Target hooks that record every call

use std::collections::HashSet;

use netsync_core::{ApplyAction, Handle, HookError, Locator, TargetHooks, WriteRequest};

/// One recorded hook invocation
#[derive(Debug, Clone, PartialEq)]
pub struct HookCall {
    pub action: ApplyAction,
    pub kind: String,
    /// Unique id of the record
    pub identity: String,
    /// Request passed to create/update; `None` for delete
    pub request: Option<WriteRequest>,
}

/// Hooks that record calls and fail on demand
#[derive(Debug, Default)]
pub struct RecordingHooks {
    calls: Vec<HookCall>,
    failing: HashSet<(ApplyAction, String, String)>,
    next: u64,
}

impl RecordingHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `action` on the record with this unique id fail
    pub fn fail_on(mut self, action: ApplyAction, kind: &str, identity: &str) -> Self {
        self.failing
            .insert((action, kind.to_string(), identity.to_string()));
        self
    }

    pub fn calls(&self) -> &[HookCall] {
        &self.calls
    }

    /// Calls of one action, as `kind:unique_id`
    pub fn calls_for(&self, action: ApplyAction) -> Vec<String> {
        self.calls
            .iter()
            .filter(|c| c.action == action)
            .map(|c| format!("{}:{}", c.kind, c.identity))
            .collect()
    }

    /// Position of the first call matching `kind:unique_id`
    pub fn position(&self, action: ApplyAction, kind: &str, identity: &str) -> Option<usize> {
        self.calls
            .iter()
            .position(|c| c.action == action && c.kind == kind && c.identity == identity)
    }

    fn record(
        &mut self,
        action: ApplyAction,
        kind: &str,
        identity: String,
        request: Option<WriteRequest>,
    ) -> Result<(), HookError> {
        if self
            .failing
            .contains(&(action, kind.to_string(), identity.clone()))
        {
            return Err(HookError::new(format!("injected {} failure", action)));
        }
        self.calls.push(HookCall {
            action,
            kind: kind.to_string(),
            identity,
            request,
        });
        Ok(())
    }
}

impl TargetHooks for RecordingHooks {
    fn create(&mut self, request: &WriteRequest) -> Result<Handle, HookError> {
        self.record(
            ApplyAction::Create,
            &request.kind,
            request.identity.unique_id(),
            Some(request.clone()),
        )?;
        self.next += 1;
        Ok(Handle::new(format!("rec-{}", self.next)))
    }

    fn update(&mut self, locator: &Locator, request: &WriteRequest) -> Result<(), HookError> {
        self.record(
            ApplyAction::Update,
            &locator.kind,
            locator.identity.unique_id(),
            Some(request.clone()),
        )
    }

    fn delete(&mut self, locator: &Locator) -> Result<(), HookError> {
        self.record(
            ApplyAction::Delete,
            &locator.kind,
            locator.identity.unique_id(),
            None,
        )
    }
}
