//! Snapshot reconciliation engine for network inventories.
//!
//! This crate holds the generic machinery that converges one view of a
//! network onto another:
//!
//! - [`Registry`]: declarative schema of every entity kind
//! - [`SnapshotStore`]: indexed, registry-typed records of one system
//! - [`loader`]: bulk import/export of stores
//! - [`diff()`]: per-kind created/deleted/modified partitions
//! - [`apply`]: replays a diff through [`TargetHooks`]
//! - [`check_data_consistency`]: post-collection pruning pass
//!
//! # Flow
//!
//! 1. Two stores are loaded, one per system
//! 2. The collected store is validated
//! 3. The diff from source to target is computed
//! 4. The diff is applied to the target store and its backing system
//!
//! # Example
//!
//! ```ignore
//! use netsync_core::{loader, sync, InMemoryHooks, SnapshotStore, SyncFlags};
//!
//! let mut network = SnapshotStore::network("network");
//! loader::load_json_file(&mut network, "network.json")?;
//! let mut inventory = SnapshotStore::network("inventory");
//! loader::load_json_file(&mut inventory, "inventory.json")?;
//!
//! let (diff, report) = sync(&network, &mut inventory, &mut InMemoryHooks::new(), SyncFlags::default())?;
//! println!("{} ({} failed)", diff.summary(), report.failed());
//! ```

mod diff;
mod error;
mod hooks;
pub mod loader;
mod record;
mod registry;
mod report;
mod store;
mod sync;
mod validate;
mod value;

pub use diff::{diff, Diff, DiffGroup, DiffSummary, FieldChange, Modified, SyncFlags};
pub use error::{HookError, SyncError, SyncResult};
pub use hooks::{InMemoryHooks, Locator, RefValue, TargetHooks, WriteRequest};
pub use loader::{BulkData, LoadFailure, LoadReport};
pub use record::{Record, HANDLE_FIELD};
pub use registry::{kinds, GenericRelation, Registry, Resolver, Schema};
pub use report::{ActionCounts, ApplyAction, ApplyFailure, ApplyReport, ApplyStatus, UnresolvedRef};
pub use store::SnapshotStore;
pub use sync::{apply, sync};
pub use validate::{
    associate_device, check_data_consistency, is_virtual_interface, ValidationReport,
    ASSOCIATIONS_FIELD,
};
pub use value::{Fields, Handle, Identity, Value};
