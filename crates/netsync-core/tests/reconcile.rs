//! End-to-end reconciliation tests over the canonical ams01 topology.

use netsync_core::{
    apply, check_data_consistency, diff, loader, sync, ApplyAction, RefValue, SnapshotStore,
    SyncError, SyncFlags, Value,
};
use netsync_test::{
    cable_fixtures, device_fixtures, interface_fixtures, ip_fixtures, site_fixtures,
    Ams01Topology, RecordingHooks, StoreVerifier,
};
use pretty_assertions::assert_eq;

fn network() -> SnapshotStore {
    Ams01Topology::new().build("network").unwrap()
}

fn inventory() -> SnapshotStore {
    Ams01Topology::new().with_handles().build("inventory").unwrap()
}

#[test]
fn test_duplicate_insert_fails_for_every_kind() {
    let fixtures = [
        site_fixtures::status_active(),
        site_fixtures::site("ams01"),
        device_fixtures::device("edge-01", "ams01"),
        interface_fixtures::interface("edge-01", "eth0"),
        ip_fixtures::ip_address("edge-01", "eth0", "10.0.0.1/24"),
        ip_fixtures::prefix("ams01", "10.0.0.0/24"),
        ip_fixtures::vlan("ams01", 10, "users"),
        cable_fixtures::cable("edge-01", "eth0", "edge-02", "eth0"),
    ];

    let mut store = SnapshotStore::network("dup");
    for fixture in fixtures {
        fixture.clone().insert(&mut store).unwrap();
        let err = fixture.insert(&mut store).unwrap_err();
        assert!(matches!(err, SyncError::DuplicateIdentity { .. }));
    }
    assert_eq!(store.len(), 8);
}

#[test]
fn test_identical_copy_diffs_empty() {
    let a = network();
    let b = network();
    let diff = diff(&a, &b, SyncFlags::default()).unwrap();

    assert!(diff.is_empty());
    for group in &diff.groups {
        assert!(group.created.is_empty(), "{} created", group.kind);
        assert!(group.deleted.is_empty(), "{} deleted", group.kind);
        assert!(group.modified.is_empty(), "{} modified", group.kind);
    }
    assert_eq!(diff.summary().no_change, a.len());
}

#[test]
fn test_sync_into_empty_target_converges() {
    let source = network();
    let mut target = SnapshotStore::network("inventory");
    let mut hooks = RecordingHooks::new();

    let (first, report) = sync(&source, &mut target, &mut hooks, SyncFlags::default()).unwrap();
    assert_eq!(first.summary().create, source.len());
    assert_eq!(report.created.succeeded, source.len());
    assert!(report.is_clean());
    assert!(report.unresolved.is_empty());

    let again = diff(&source, &target, SyncFlags::default()).unwrap();
    assert!(again.is_empty());

    let report = apply(&first, &source, &mut target, &mut hooks, SyncFlags::default()).unwrap();
    assert_eq!(report.created.skipped, source.len());
    assert_eq!(report.succeeded(), 0);

    let verifier = StoreVerifier::new(&target);
    verifier
        .assert_child("device", "ams01-edge-01", "interface", "ams01-edge-01__Ethernet1/2")
        .unwrap();
    verifier
        .assert_child(
            "interface",
            "ams01-edge-01__Ethernet1/1",
            "ip_address",
            "ams01-edge-01__Ethernet1/1__10.1.0.1/24",
        )
        .unwrap();
}

#[test]
fn test_parent_created_before_child() {
    let source = network();
    let mut target = SnapshotStore::network("inventory");
    let mut hooks = RecordingHooks::new();
    sync(&source, &mut target, &mut hooks, SyncFlags::default()).unwrap();

    let pos = |kind: &str, uid: &str| hooks.position(ApplyAction::Create, kind, uid).unwrap();

    assert!(pos("site", "ams01") < pos("vlan", "ams01__100"));
    assert!(pos("site", "ams01") < pos("device", "ams01-edge-01"));
    assert!(pos("device", "ams01-edge-01") < pos("interface", "ams01-edge-01__Ethernet1/1"));
    assert!(
        pos("interface", "ams01-edge-01__Ethernet1/1")
            < pos("ip_address", "ams01-edge-01__Ethernet1/1__10.1.0.1/24")
    );
    assert!(
        pos("interface", "ams01-edge-02__Ethernet1/1")
            < pos("cable", "ams01-edge-01__Ethernet1/1__ams01-edge-02__Ethernet1/1")
    );
}

#[test]
fn test_references_resolve_to_target_handles() {
    let source = network();
    let mut target = SnapshotStore::network("inventory");
    let mut hooks = RecordingHooks::new();
    sync(&source, &mut target, &mut hooks, SyncFlags::default()).unwrap();

    let trunk = hooks
        .calls()
        .iter()
        .find(|c| c.kind == "interface" && c.identity == "ams01-edge-01__Ethernet1/2")
        .and_then(|c| c.request.clone())
        .unwrap();
    let vlan_handle = target.get_by_uid("vlan", "ams01__100").unwrap().handle().cloned();
    let device_handle = target.get_by_uid("device", "ams01-edge-01").unwrap().handle().cloned();

    assert_eq!(
        trunk.refs.get("tagged_vlans"),
        Some(&RefValue::Many(vlan_handle.into_iter().collect()))
    );
    assert_eq!(trunk.refs.get("device"), device_handle.map(RefValue::One).as_ref());

    let address = hooks
        .calls()
        .iter()
        .find(|c| c.kind == "ip_address")
        .and_then(|c| c.request.clone())
        .unwrap();
    let intf_handle = target
        .get_by_uid("interface", "ams01-edge-01__Ethernet1/1")
        .unwrap()
        .handle()
        .cloned();
    assert_eq!(address.refs.get("interface"), intf_handle.map(RefValue::One).as_ref());
}

#[test]
fn test_missing_foreign_key_target_is_tolerated() {
    let mut source = SnapshotStore::network("network");
    device_fixtures::device("edge-09", "zrh01").insert(&mut source).unwrap();
    site_fixtures::site("ams01").insert(&mut source).unwrap();

    let mut target = SnapshotStore::network("inventory");
    let mut hooks = RecordingHooks::new();
    let (_, report) = sync(&source, &mut target, &mut hooks, SyncFlags::default()).unwrap();

    assert!(report.is_clean());
    assert_eq!(report.created.succeeded, 2);
    assert_eq!(report.unresolved.len(), 1);
    assert_eq!(report.unresolved[0].field, "site");

    let request = hooks
        .calls()
        .iter()
        .find(|c| c.kind == "device")
        .and_then(|c| c.request.clone())
        .unwrap();
    assert!(!request.refs.contains_key("site"));
    StoreVerifier::new(&target)
        .assert_exists("device", "edge-09")
        .unwrap();
}

#[test]
fn test_description_change_is_modified_and_applied() {
    let mut source = network();
    let mut target = inventory();
    let eth = "ams01-edge-01__Ethernet1/1";

    let mut blank = netsync_core::Fields::new();
    blank.insert("description".to_string(), Value::from(""));
    let id = netsync_core::Identity::parse(eth);
    source.update("interface", &id, &blank).unwrap();
    let mut old = netsync_core::Fields::new();
    old.insert("description".to_string(), Value::from("old"));
    target.update("interface", &id, &old).unwrap();

    let diff = diff(&source, &target, SyncFlags::default()).unwrap();
    assert_eq!(diff.summary().update, 1);
    let group = diff.group("interface").unwrap();
    assert_eq!(group.modified.len(), 1);
    assert_eq!(group.modified[0].identity.unique_id(), eth);
    assert_eq!(
        group.modified[0].changed_fields().collect::<Vec<_>>(),
        vec!["description"]
    );

    let mut hooks = RecordingHooks::new();
    let report = apply(&diff, &source, &mut target, &mut hooks, SyncFlags::default()).unwrap();
    assert_eq!(report.updated.succeeded, 1);

    let update = hooks.calls()[0].request.clone().unwrap();
    assert_eq!(update.attrs.get("description"), Some(&Value::from("")));
    StoreVerifier::new(&target)
        .assert_field("interface", eth, "description", "")
        .unwrap();
}

#[test]
fn test_interface_missing_from_source_is_deleted() {
    let mut source = network();
    let mut target = inventory();
    let eth2 = netsync_core::Identity::parse("ams01-edge-01__Ethernet1/2");
    source.remove("interface", &eth2).unwrap();

    let diff = diff(&source, &target, SyncFlags::default()).unwrap();
    assert_eq!(diff.summary().delete, 1);
    assert_eq!(diff.group("interface").unwrap().deleted, vec![eth2.clone()]);

    let mut hooks = RecordingHooks::new();
    let report = apply(&diff, &source, &mut target, &mut hooks, SyncFlags::default()).unwrap();
    assert_eq!(report.deleted.succeeded, 1);
    assert_eq!(
        hooks.calls_for(ApplyAction::Delete),
        vec!["interface:ams01-edge-01__Ethernet1/2".to_string()]
    );

    let verifier = StoreVerifier::new(&target);
    verifier.assert_absent("interface", "ams01-edge-01__Ethernet1/2").unwrap();
    verifier.assert_exists("device", "ams01-edge-01").unwrap();
    verifier
        .assert_not_child("device", "ams01-edge-01", "interface", "ams01-edge-01__Ethernet1/2")
        .unwrap();
}

#[test]
fn test_device_delete_takes_children_first() {
    let source = SnapshotStore::network("network");
    let mut target = inventory();
    let mut hooks = RecordingHooks::new();
    sync(&source, &mut target, &mut hooks, SyncFlags::default()).unwrap();

    let pos = |kind: &str, uid: &str| hooks.position(ApplyAction::Delete, kind, uid).unwrap();
    assert!(
        pos("ip_address", "ams01-edge-01__Ethernet1/1__10.1.0.1/24")
            < pos("interface", "ams01-edge-01__Ethernet1/1")
    );
    assert!(pos("interface", "ams01-edge-01__Ethernet1/1") < pos("device", "ams01-edge-01"));
    assert!(pos("vlan", "ams01__100") < pos("site", "ams01"));
    assert!(target.is_empty());
}

#[test]
fn test_hook_failure_is_isolated() {
    let source = network();
    let mut target = SnapshotStore::network("inventory");
    let mut hooks = RecordingHooks::new().fail_on(ApplyAction::Create, "device", "ams01-edge-02");

    let (_, report) = sync(&source, &mut target, &mut hooks, SyncFlags::default()).unwrap();
    assert_eq!(report.failed(), 1);
    assert_eq!(report.failures[0].identity, "ams01-edge-02");
    assert!(report.failures[0].error.contains("create hook failed"));
    assert!(!report.aborted);

    // The device's interface is still created; its device reference is unresolved.
    StoreVerifier::new(&target)
        .assert_exists("interface", "ams01-edge-02__Ethernet1/1")
        .unwrap();
    assert!(report
        .unresolved
        .iter()
        .any(|u| u.identity == "ams01-edge-02__Ethernet1/1" && u.field == "device"));
}

#[test]
fn test_validator_drops_cable_on_virtual_interface() {
    let mut store = network();
    cable_fixtures::cable("ams01-edge-01", "Loopback0", "ams01-edge-02", "Ethernet1/9")
        .insert(&mut store)
        .unwrap();
    assert_eq!(store.count("cable"), 2);

    let report = check_data_consistency(&mut store).unwrap();
    assert_eq!(report.removed_cables.len(), 1);

    let verifier = StoreVerifier::new(&store);
    verifier.assert_count("cable", 1).unwrap();
    verifier
        .assert_absent(
            "cable",
            "ams01-edge-01__Loopback0__ams01-edge-02__Ethernet1/9",
        )
        .unwrap();
}

#[test]
fn test_file_round_trip() {
    let store = inventory();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("inventory.json");
    std::fs::write(&path, loader::to_json_string(&store).unwrap()).unwrap();

    let mut reloaded = SnapshotStore::network("reloaded");
    let report = loader::load_json_file(&mut reloaded, &path).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.loaded, store.len());

    assert!(diff(&store, &reloaded, SyncFlags::default()).unwrap().is_empty());
    let handle = reloaded
        .get_by_uid("device", "ams01-edge-01")
        .unwrap()
        .handle()
        .cloned()
        .unwrap();
    assert_eq!(
        reloaded.get_by_handle("device", &handle).unwrap().unique_id(),
        "ams01-edge-01"
    );
}
