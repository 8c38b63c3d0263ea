//! `diff`, `sync` and `collect` command implementations.
//!
//! Each command returns its outcome rather than printing it, so `main` owns
//! all output and the tests can inspect results directly.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use netsync_collect::{load_inventory, FileCollector, FileTopology, LiveLoad, LiveLoader};
use netsync_core::{apply, diff, loader, ApplyReport, Diff, Registry, SnapshotStore};
use tracing::{info, instrument, warn};

use crate::config_file::NetsyncConfig;
use crate::error::{NetsyncError, Result};
use crate::hooks::{JournalEntry, JournalHooks};

/// Store name of the system being reconciled.
pub const INVENTORY_STORE: &str = "inventory";

/// Network registry with the configured top-level kinds first.
pub fn registry(config: &NetsyncConfig) -> Result<Arc<Registry>> {
    let registry = Registry::network();
    if config.import.top_level.is_empty() {
        return Ok(Arc::new(registry));
    }
    Ok(Arc::new(registry.with_top_level(config.import.top_level.as_slice())?))
}

/// Loads a bulk JSON document into a new store named `name`.
///
/// Records that fail individually are logged and left out.
pub fn load_store(registry: &Arc<Registry>, name: &str, path: &Path) -> Result<SnapshotStore> {
    let mut store = SnapshotStore::new(name, Arc::clone(registry));
    let report = loader::load_json_file(&mut store, path)?;
    for failure in &report.failures {
        warn!(store = name, kind = %failure.kind, key = %failure.key, error = %failure.error, "Record not loaded");
    }
    for kind in &report.skipped_kinds {
        warn!(store = name, kind = %kind, "Unknown kind skipped");
    }
    Ok(store)
}

/// Loads the target document, or starts from an empty store.
fn load_target(registry: &Arc<Registry>, path: Option<&Path>) -> Result<SnapshotStore> {
    match path {
        Some(path) => load_store(registry, INVENTORY_STORE, path),
        None => Ok(SnapshotStore::new(INVENTORY_STORE, Arc::clone(registry))),
    }
}

/// Result of a sync run.
#[derive(Debug)]
pub struct SyncOutcome {
    pub diff: Diff,
    /// `None` for a dry run.
    pub report: Option<ApplyReport>,
    pub journal: Vec<JournalEntry>,
    /// Target store after the run.
    pub target: SnapshotStore,
}

impl SyncOutcome {
    pub fn is_clean(&self) -> bool {
        self.report.as_ref().map_or(true, ApplyReport::is_clean)
    }
}

/// Options shared by `sync` and `collect`.
#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub target: Option<PathBuf>,
    /// Where the converged target is written as a bulk document.
    pub output: Option<PathBuf>,
    /// Where the hook journal is written.
    pub journal: Option<PathBuf>,
    pub dry_run: bool,
}

/// Computes the diff converging `target` onto `source`.
pub fn run_diff(config: &NetsyncConfig, source: &Path, target: &Path) -> Result<Diff> {
    let registry = registry(config)?;
    let source = load_store(&registry, "source", source)?;
    let target = load_store(&registry, INVENTORY_STORE, target)?;
    Ok(diff(&source, &target, config.sync.flags())?)
}

/// Converges the target onto an already loaded source store.
#[instrument(skip_all, fields(source = %source.name(), dry_run = options.dry_run))]
pub fn sync_store(config: &NetsyncConfig, source: &SnapshotStore, options: &SyncOptions) -> Result<SyncOutcome> {
    let mut target = load_target(&registry(config)?, options.target.as_deref())?;
    let flags = config.sync.flags();
    let pending = diff(source, &target, flags)?;
    info!(summary = %pending.summary(), "Diff computed");

    if options.dry_run {
        return Ok(SyncOutcome {
            diff: pending,
            report: None,
            journal: Vec::new(),
            target,
        });
    }

    let mut hooks = JournalHooks::new();
    let report = apply(&pending, source, &mut target, &mut hooks, flags)?;

    if let Some(path) = &options.output {
        std::fs::write(path, loader::to_json_string(&target)?)?;
        info!(path = %path.display(), records = target.len(), "Target written");
    }
    if let Some(path) = &options.journal {
        let json = hooks
            .to_json_string()
            .map_err(|e| NetsyncError::config(format!("Failed to encode journal: {}", e)))?;
        std::fs::write(path, json)?;
    }

    Ok(SyncOutcome {
        diff: pending,
        report: Some(report),
        journal: hooks.entries().to_vec(),
        target,
    })
}

/// Loads `source` from disk and converges the target onto it.
pub fn run_sync(config: &NetsyncConfig, source: &Path, options: &SyncOptions) -> Result<SyncOutcome> {
    let source = load_store(&registry(config)?, "source", source)?;
    sync_store(config, &source, options)
}

/// Inputs of a live collection from facts files.
#[derive(Debug, Clone)]
pub struct CollectInputs {
    pub inventory: PathBuf,
    /// Directory holding `<device>.json` facts files.
    pub facts: PathBuf,
    /// Links file for the external topology cabling strategy.
    pub topology: Option<PathBuf>,
}

/// Builds the network store from an inventory and per-device facts files.
pub async fn run_collect(config: &NetsyncConfig, inputs: &CollectInputs) -> Result<LiveLoad> {
    let devices = load_inventory(&inputs.inventory)?;
    let mut live = LiveLoader::new(
        config.import.clone(),
        config.collect.clone(),
        Arc::new(FileCollector::new(&inputs.facts)),
    );
    if let Some(path) = &inputs.topology {
        live = live.with_topology(Arc::new(FileTopology::new(path)));
    }
    Ok(live.load(&devices).await?)
}
