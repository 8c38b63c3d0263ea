//! netsync - network inventory reconciliation
//!
//! Library half of the `netsync` binary:
//!
//! - [`config_file`]: TOML configuration with defaults and validation
//! - [`logging`]: tracing subscriber setup
//! - [`hooks`]: journaling target hooks with UUID handles
//! - [`summary`]: text rendering of diffs and reports
//! - [`commands`]: the `diff`, `sync` and `collect` commands

pub mod commands;
pub mod config_file;
mod error;
pub mod hooks;
pub mod logging;
pub mod summary;

pub use commands::{CollectInputs, SyncOptions, SyncOutcome};
pub use config_file::{LoggingConfig, NetsyncConfig, SyncConfig, DEFAULT_CONFIG_PATH};
pub use error::{NetsyncError, Result};
pub use hooks::{JournalEntry, JournalHooks};
