//! End-to-end tests of the netsync commands over files on disk.

use std::path::{Path, PathBuf};

use netsync_core::{kinds, loader, ApplyAction, SnapshotStore};
use netsync_test::interface_fixtures::interface_with_description;
use netsync_test::{Ams01Topology, StoreVerifier};
use netsyncd::commands::{self, CollectInputs, SyncOptions};
use netsyncd::NetsyncConfig;
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write_store(dir: &TempDir, file: &str, store: &SnapshotStore) -> PathBuf {
    let path = dir.path().join(file);
    std::fs::write(&path, loader::to_json_string(store).unwrap()).unwrap();
    path
}

fn network_doc(dir: &TempDir) -> (PathBuf, SnapshotStore) {
    let store = Ams01Topology::new().build("network").unwrap();
    (write_store(dir, "network.json", &store), store)
}

#[test]
fn test_diff_of_identical_documents_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (source, _) = network_doc(&dir);

    let diff = commands::run_diff(&NetsyncConfig::default(), &source, &source).unwrap();
    assert!(diff.is_empty());
}

#[test]
fn test_sync_into_empty_inventory_writes_output() {
    let dir = tempfile::tempdir().unwrap();
    let (source, network) = network_doc(&dir);
    let options = SyncOptions {
        output: Some(dir.path().join("inventory.json")),
        journal: Some(dir.path().join("journal.json")),
        ..SyncOptions::default()
    };

    let outcome = commands::run_sync(&NetsyncConfig::default(), &source, &options).unwrap();
    assert!(outcome.is_clean());
    assert_eq!(outcome.diff.summary().create, network.len());
    assert_eq!(outcome.journal.len(), network.len());
    assert!(outcome.journal.iter().all(|e| e.action == ApplyAction::Create));

    // the written inventory converges: a second sync has nothing to do
    let rerun = SyncOptions {
        target: options.output.clone(),
        ..SyncOptions::default()
    };
    let outcome = commands::run_sync(&NetsyncConfig::default(), &source, &rerun).unwrap();
    assert!(outcome.diff.is_empty());
    assert!(outcome.journal.is_empty());

    let journal = std::fs::read_to_string(dir.path().join("journal.json")).unwrap();
    assert!(journal.contains("\"kind\": \"device\""));
}

fn position(kinds: &[&str], kind: &str) -> usize {
    kinds.iter().position(|k| *k == kind).unwrap()
}

#[test]
fn test_configured_top_level_orders_diff_and_creates() {
    let dir = tempfile::tempdir().unwrap();
    let (source, _) = network_doc(&dir);
    let mut config = NetsyncConfig::default();
    config.import.top_level = vec!["device".to_string(), "site".to_string()];

    let outcome = commands::run_sync(&config, &source, &SyncOptions::default()).unwrap();

    let groups: Vec<&str> = outcome.diff.groups.iter().map(|g| g.kind).collect();
    assert_eq!(groups[0], "device");
    assert!(position(&groups, "device") < position(&groups, "site"));

    let created: Vec<&str> = outcome.journal.iter().map(|e| e.kind.as_str()).collect();
    assert_eq!(created[0], "device");
    assert!(position(&created, "device") < position(&created, "site"));

    let diff = commands::run_diff(&config, &source, &source).unwrap();
    let groups: Vec<&str> = diff.groups.iter().map(|g| g.kind).collect();
    assert_eq!(groups[0], "device");
}

#[test]
fn test_dry_run_applies_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (source, _) = network_doc(&dir);
    let output = dir.path().join("inventory.json");
    let options = SyncOptions {
        output: Some(output.clone()),
        dry_run: true,
        ..SyncOptions::default()
    };

    let outcome = commands::run_sync(&NetsyncConfig::default(), &source, &options).unwrap();
    assert!(outcome.report.is_none());
    assert!(!outcome.diff.is_empty());
    assert!(outcome.target.is_empty());
    assert!(!output.exists());
}

#[test]
fn test_skip_unmatched_dst_keeps_extra_records() {
    let dir = tempfile::tempdir().unwrap();
    let (source, _) = network_doc(&dir);
    let mut inventory = Ams01Topology::new().build("inventory").unwrap();
    interface_with_description(Ams01Topology::EDGE_02, "Ethernet1/9", "spare")
        .insert(&mut inventory)
        .unwrap();
    let target = write_store(&dir, "inventory.json", &inventory);

    let options = SyncOptions {
        target: Some(target),
        ..SyncOptions::default()
    };

    let mut config = NetsyncConfig::default();
    config.sync.skip_unmatched_dst = true;
    let outcome = commands::run_sync(&config, &source, &options).unwrap();
    assert!(outcome.diff.is_empty());
    StoreVerifier::new(&outcome.target)
        .assert_exists(kinds::INTERFACE, "ams01-edge-02__Ethernet1/9")
        .unwrap();

    let outcome = commands::run_sync(&NetsyncConfig::default(), &source, &options).unwrap();
    let report = outcome.report.unwrap();
    assert_eq!(report.deleted.succeeded, 1);
    StoreVerifier::new(&outcome.target)
        .assert_absent(kinds::INTERFACE, "ams01-edge-02__Ethernet1/9")
        .unwrap();
}

fn write_facts(dir: &Path) {
    std::fs::write(
        dir.join("inventory.json"),
        r#"[
            { "name": "ams01-edge-01", "site": "ams01", "primary_ip": "10.1.0.1" },
            { "name": "ams01-edge-02", "site": "ams01" }
        ]"#,
    )
    .unwrap();
    std::fs::create_dir(dir.join("facts")).unwrap();
    std::fs::write(
        dir.join("facts").join("ams01-edge-01.json"),
        r#"{
            "interfaces": [
                { "name": "Ethernet1/1", "description": "uplink", "addresses": ["10.1.0.1/24"] },
                { "name": "Loopback0", "addresses": ["10.255.0.1/32"] }
            ],
            "vlans": [ { "vid": 100, "name": "mgmt" } ]
        }"#,
    )
    .unwrap();
}

#[tokio::test]
async fn test_collect_then_sync() {
    let dir = tempfile::tempdir().unwrap();
    write_facts(dir.path());
    let inputs = CollectInputs {
        inventory: dir.path().join("inventory.json"),
        facts: dir.path().join("facts"),
        topology: None,
    };

    let config = NetsyncConfig::default();
    let live = commands::run_collect(&config, &inputs).await.unwrap();
    assert_eq!(live.report.collected, vec!["ams01-edge-01"]);
    assert_eq!(live.report.unreachable, vec!["ams01-edge-02"]);

    let verify = StoreVerifier::new(&live.store);
    verify.assert_count(kinds::DEVICE, 2).unwrap();
    verify.assert_count(kinds::PREFIX, 1).unwrap();
    verify
        .assert_field(kinds::DEVICE, "ams01-edge-01", "primary_ip", "10.1.0.1")
        .unwrap();

    let outcome = commands::sync_store(&config, &live.store, &SyncOptions::default()).unwrap();
    assert!(outcome.is_clean());
    assert_eq!(outcome.target.len(), live.store.len());
}

#[tokio::test]
async fn test_collect_missing_inventory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = CollectInputs {
        inventory: dir.path().join("missing.json"),
        facts: dir.path().to_path_buf(),
        topology: None,
    };
    assert!(commands::run_collect(&NetsyncConfig::default(), &inputs)
        .await
        .is_err());
}
