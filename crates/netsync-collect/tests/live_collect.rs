//! Live loader tests against scripted collectors.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use netsync_collect::{
    CablingStrategy, CollectError, CollectResult, CollectSettings, CollectionPlan, DeviceCollector,
    DeviceFacts, FileCollector, ImportSettings, InterfaceFacts, InventoryDevice, LiveLoader,
    Neighbor, VlanFacts,
};
use netsync_core::{diff, kinds, sync, ApplyAction, SnapshotStore, SyncFlags};
use netsync_test::{RecordingHooks, StoreVerifier};
use pretty_assertions::assert_eq;

enum Script {
    Facts(DeviceFacts),
    Unreachable,
    Fail,
    Hang,
}

/// Collector that replays a fixed script per device and tracks concurrency.
struct ScriptedCollector {
    scripts: HashMap<String, Script>,
    delay: Duration,
    delays: HashMap<String, Duration>,
    running: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedCollector {
    fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            delay: Duration::ZERO,
            delays: HashMap::new(),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn with(mut self, device: &str, script: Script) -> Self {
        self.scripts.insert(device.to_string(), script);
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn with_device_delay(mut self, device: &str, delay: Duration) -> Self {
        self.delays.insert(device.to_string(), delay);
        self
    }
}

#[async_trait]
impl DeviceCollector for ScriptedCollector {
    async fn collect(&self, device: &InventoryDevice, _plan: &CollectionPlan) -> CollectResult<DeviceFacts> {
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let delay = self.delays.get(&device.name).copied().unwrap_or(self.delay);
        tokio::time::sleep(delay).await;

        let result = match self.scripts.get(&device.name) {
            Some(Script::Facts(facts)) => Ok(facts.clone()),
            Some(Script::Unreachable) | None => Ok(DeviceFacts::unreachable()),
            Some(Script::Fail) => Err(CollectError::invalid_facts(&device.name, "garbled output")),
            Some(Script::Hang) => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(DeviceFacts::default())
            }
        };
        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

fn edge_facts(peer: &str) -> DeviceFacts {
    let mut uplink = InterfaceFacts::new("Ethernet1/1");
    uplink.description = Some(format!("to {}", peer));
    uplink.addresses = vec!["10.1.0.1/24".to_string()];
    let mut trunk = InterfaceFacts::new("Ethernet1/2");
    trunk.mode = Some("trunk".to_string());
    trunk.tagged_vlans = vec![100, 999];

    DeviceFacts {
        interfaces: vec![uplink, trunk, InterfaceFacts::new("Loopback0")],
        vlans: vec![VlanFacts {
            vid: 100,
            name: Some("mgmt".to_string()),
        }],
        neighbors: vec![
            Neighbor {
                local_interface: "Ethernet1/1".to_string(),
                hostname: format!("{}.example.net", peer),
                port: "Ethernet1/1".to_string(),
            },
            Neighbor {
                local_interface: "Loopback0".to_string(),
                hostname: peer.to_string(),
                port: "Loopback0".to_string(),
            },
        ],
        ..DeviceFacts::default()
    }
}

fn inventory(names: &[&str]) -> Vec<InventoryDevice> {
    names
        .iter()
        .map(|name| InventoryDevice::new(*name, "ams01"))
        .collect()
}

fn lldp_settings() -> ImportSettings {
    ImportSettings {
        cabling: CablingStrategy::CliNeighborProtocol,
        ..ImportSettings::default()
    }
}

#[tokio::test]
async fn test_live_load_builds_validated_store() {
    let collector = ScriptedCollector::new()
        .with("edge-01", Script::Facts(edge_facts("edge-02")))
        .with("edge-02", Script::Facts(edge_facts("edge-01")));
    let loader = LiveLoader::new(lldp_settings(), CollectSettings::default(), Arc::new(collector));

    let load = loader.load(&inventory(&["edge-01", "edge-02"])).await.unwrap();
    let store = &load.store;
    let verify = StoreVerifier::new(store);

    assert_eq!(load.report.collected, vec!["edge-01", "edge-02"]);
    assert!(load.report.is_clean());
    verify.assert_count(kinds::DEVICE, 2).unwrap();
    verify.assert_count(kinds::INTERFACE, 6).unwrap();
    verify.assert_count(kinds::VLAN, 1).unwrap();
    verify.assert_child(kinds::DEVICE, "edge-01", kinds::INTERFACE, "edge-01__Ethernet1/2").unwrap();
    verify.assert_field(kinds::INTERFACE, "edge-01__Ethernet1/2", "mode", "TRUNK").unwrap();

    // both directions collapse into one cable per link; the loopback link is
    // removed by the consistency check
    assert_eq!(load.report.cables, 2);
    verify.assert_count(kinds::CABLE, 1).unwrap();
    verify
        .assert_exists(kinds::CABLE, "edge-01__Ethernet1/1__edge-02__Ethernet1/1")
        .unwrap();
    assert_eq!(load.report.validation.removed_cables.len(), 1);

    // vlan 999 is not defined in the site
    assert_eq!(load.report.validation.pruned_vlans, 2);
    let trunk = store.get_by_uid(kinds::INTERFACE, "edge-01__Ethernet1/2").unwrap();
    assert_eq!(trunk.get("tagged_vlans").text_items(), vec!["ams01__100"]);
    let vlan = store.get_by_uid(kinds::VLAN, "ams01__100").unwrap();
    assert_eq!(
        vlan.get(netsync_core::ASSOCIATIONS_FIELD).text_items(),
        vec!["edge-01", "edge-02"]
    );
}

#[tokio::test]
async fn test_device_failures_are_isolated() {
    let collector = ScriptedCollector::new()
        .with("edge-01", Script::Facts(edge_facts("edge-02")))
        .with("edge-02", Script::Fail)
        .with("edge-03", Script::Unreachable);
    let loader = LiveLoader::new(ImportSettings::default(), CollectSettings::default(), Arc::new(collector));

    let load = loader
        .load(&inventory(&["edge-01", "edge-02", "edge-03"]))
        .await
        .unwrap();

    assert_eq!(load.report.collected, vec!["edge-01"]);
    assert_eq!(load.report.unreachable, vec!["edge-03"]);
    assert_eq!(load.report.failed.len(), 1);
    assert_eq!(load.report.failed[0].device, "edge-02");
    assert!(load.report.failed[0].error.is_device_local());

    // devices from the inventory stay even when they contributed nothing
    let verify = StoreVerifier::new(&load.store);
    verify.assert_count(kinds::DEVICE, 3).unwrap();
    verify.assert_count(kinds::INTERFACE, 3).unwrap();
    verify.assert_count(kinds::CABLE, 0).unwrap();
}

#[tokio::test]
async fn test_device_timeout() {
    let collector = ScriptedCollector::new()
        .with("edge-01", Script::Facts(edge_facts("edge-02")))
        .with("edge-02", Script::Hang);
    let settings = CollectSettings {
        max_workers: 4,
        device_timeout_secs: 1,
    };
    let loader = LiveLoader::new(ImportSettings::default(), settings, Arc::new(collector));

    let load = loader.load(&inventory(&["edge-01", "edge-02"])).await.unwrap();
    assert_eq!(load.report.collected, vec!["edge-01"]);
    assert!(matches!(
        load.report.failed[0].error,
        CollectError::Timeout { secs: 1, .. }
    ));
}

#[tokio::test]
async fn test_worker_pool_is_bounded() {
    let names: Vec<String> = (1..=8).map(|i| format!("edge-{:02}", i)).collect();
    let mut collector = ScriptedCollector::new().with_delay(Duration::from_millis(20));
    for name in &names {
        collector = collector.with(name, Script::Facts(DeviceFacts::default()));
    }
    let collector = Arc::new(collector);
    let settings = CollectSettings {
        max_workers: 2,
        device_timeout_secs: 10,
    };
    let loader = LiveLoader::new(ImportSettings::default(), settings, collector.clone());

    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let load = loader.load(&inventory(&refs)).await.unwrap();

    assert_eq!(load.report.collected.len(), 8);
    assert!(collector.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn test_merge_order_follows_device_names() {
    let mut slow = edge_facts("edge-02");
    slow.vlans[0].name = Some("mgmt".to_string());
    let mut fast = edge_facts("edge-01");
    fast.vlans[0].name = Some("management".to_string());

    // edge-02 answers first, edge-01 is still merged first
    let collector = ScriptedCollector::new()
        .with("edge-01", Script::Facts(slow))
        .with("edge-02", Script::Facts(fast))
        .with_device_delay("edge-01", Duration::from_millis(100));
    let loader = LiveLoader::new(ImportSettings::default(), CollectSettings::default(), Arc::new(collector));

    let load = loader.load(&inventory(&["edge-02", "edge-01"])).await.unwrap();
    let store = &load.store;

    let vlan = store.get_by_uid(kinds::VLAN, "ams01__100").unwrap();
    assert_eq!(vlan.text("name"), Some("mgmt"));
    let devices: Vec<_> = store
        .get_all(kinds::INTERFACE)
        .filter_map(|r| r.text("device"))
        .collect();
    assert_eq!(
        devices,
        vec!["edge-01", "edge-01", "edge-01", "edge-02", "edge-02", "edge-02"]
    );
}

#[tokio::test]
async fn test_out_of_range_vlans_are_skipped() {
    let facts = DeviceFacts {
        vlans: [0, 4095, 200]
            .into_iter()
            .map(|vid| VlanFacts { vid, name: None })
            .collect(),
        ..DeviceFacts::default()
    };
    let collector = ScriptedCollector::new().with("edge-01", Script::Facts(facts));
    let loader = LiveLoader::new(ImportSettings::default(), CollectSettings::default(), Arc::new(collector));

    let load = loader.load(&inventory(&["edge-01"])).await.unwrap();

    assert_eq!(load.report.collected, vec!["edge-01"]);
    assert_eq!(load.report.skipped.len(), 2);
    assert!(load
        .report
        .skipped
        .iter()
        .all(|e| matches!(e, netsync_core::SyncError::InvalidField { field, .. } if field == "vid")));
    let verify = StoreVerifier::new(&load.store);
    verify.assert_count(kinds::VLAN, 1).unwrap();
    verify.assert_field(kinds::VLAN, "ams01__200", "name", "vlan-200").unwrap();
}

#[tokio::test]
async fn test_bad_top_level_is_fatal() {
    let settings = ImportSettings {
        top_level: vec!["rack".to_string()],
        ..ImportSettings::default()
    };
    let loader = LiveLoader::new(settings, CollectSettings::default(), Arc::new(ScriptedCollector::new()));

    let err = loader.load(&inventory(&["edge-01"])).await.unwrap_err();
    assert!(matches!(err, CollectError::Store(_)));
}

#[tokio::test]
async fn test_collected_store_syncs_into_empty_inventory() {
    let collector = ScriptedCollector::new()
        .with("edge-01", Script::Facts(edge_facts("edge-02")))
        .with("edge-02", Script::Facts(edge_facts("edge-01")));
    let loader = LiveLoader::new(lldp_settings(), CollectSettings::default(), Arc::new(collector));
    let network = loader.load(&inventory(&["edge-01", "edge-02"])).await.unwrap().store;

    let mut inventory = SnapshotStore::network("inventory");
    let mut hooks = RecordingHooks::new();
    let (_, report) = sync(&network, &mut inventory, &mut hooks, SyncFlags::default()).unwrap();

    assert_eq!(report.failed(), 0);
    assert_eq!(report.created.succeeded, network.len());
    assert!(hooks.calls_for(ApplyAction::Update).is_empty());
    assert!(diff(&network, &inventory, SyncFlags::default()).unwrap().is_empty());
}

#[test]
fn test_file_collector_drives_loader() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("edge-01.json"),
        serde_json::to_string(&edge_facts("edge-02")).unwrap(),
    )
    .unwrap();

    let loader = LiveLoader::new(
        ImportSettings::default(),
        CollectSettings::default(),
        Arc::new(FileCollector::new(dir.path())),
    );
    let load = tokio_test::block_on(loader.load(&inventory(&["edge-01", "edge-02"]))).unwrap();

    assert_eq!(load.report.collected, vec!["edge-01"]);
    assert_eq!(load.report.unreachable, vec!["edge-02"]);
    StoreVerifier::new(&load.store)
        .assert_field(kinds::INTERFACE, "edge-01__Ethernet1/1", "description", "to edge-02")
        .unwrap();
}
