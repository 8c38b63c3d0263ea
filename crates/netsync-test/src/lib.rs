//! Test infrastructure for netsync
//!
//! Provides:
//! - Record builders and canonical topology fixtures
//! - Recording target hooks with injectable failures
//! - Snapshot store verification helpers

pub mod fixtures;
mod hooks;
mod verification;

pub use fixtures::*;
pub use hooks::{HookCall, RecordingHooks};
pub use verification::*;
