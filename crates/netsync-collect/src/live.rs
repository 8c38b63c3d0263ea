//! Live network loader.
//!
//! Builds a snapshot store from an inventory by running one collector task
//! per device. Workers run concurrently up to `max_workers` and each one is
//! bounded by the per-device timeout. Facts are merged once every worker has
//! finished, in device name order, so the store does not depend on which
//! device answered first. A device that fails or times out only loses its
//! own contribution.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use netsync_core::{
    check_data_consistency, kinds, Fields, Identity, Registry, SnapshotStore, SyncError,
    ValidationReport,
};
use netsync_types::{IpInterface, VlanId};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::collector::{DeviceCollector, TopologySource};
use crate::error::{CollectError, CollectResult};
use crate::facts::{DeviceFacts, InterfaceFacts, InventoryDevice, TopologyLink};
use crate::records::{self, DEFAULT_STATUS};
use crate::settings::{CollectSettings, CollectionPlan, ImportSettings};

/// Name of the store produced by the live loader.
pub const NETWORK_STORE: &str = "network";

/// A device whose facts could not be merged.
#[derive(Debug)]
pub struct DeviceFailure {
    pub device: String,
    pub error: CollectError,
}

/// Outcome of a live load.
#[derive(Debug, Default)]
pub struct CollectReport {
    /// Devices whose facts were merged.
    pub collected: Vec<String>,
    /// Devices that could not be contacted.
    pub unreachable: Vec<String>,
    pub failed: Vec<DeviceFailure>,
    /// Individual records that were dropped while merging.
    pub skipped: Vec<SyncError>,
    pub cables: usize,
    pub validation: ValidationReport,
}

impl CollectReport {
    pub fn is_clean(&self) -> bool {
        self.unreachable.is_empty() && self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// A freshly collected store and how it was built.
#[derive(Debug)]
pub struct LiveLoad {
    pub store: SnapshotStore,
    pub report: CollectReport,
}

/// What merging one device's facts produced.
#[derive(Debug, Default)]
struct DeviceImport {
    links: Vec<TopologyLink>,
    skipped: Vec<SyncError>,
}

pub struct LiveLoader {
    import: ImportSettings,
    collect: CollectSettings,
    collector: Arc<dyn DeviceCollector>,
    topology: Option<Arc<dyn TopologySource>>,
}

impl LiveLoader {
    pub fn new(import: ImportSettings, collect: CollectSettings, collector: Arc<dyn DeviceCollector>) -> Self {
        Self {
            import,
            collect,
            collector,
            topology: None,
        }
    }

    /// Sets the link source used with the external topology cabling strategy.
    pub fn with_topology(mut self, topology: Arc<dyn TopologySource>) -> Self {
        self.topology = Some(topology);
        self
    }

    fn registry(&self) -> CollectResult<Registry> {
        let registry = Registry::network();
        if self.import.top_level.is_empty() {
            return Ok(registry);
        }
        Ok(registry.with_top_level(self.import.top_level.as_slice())?)
    }

    /// Collects every device of `devices` and returns the validated store.
    ///
    /// # Errors
    ///
    /// Only store-level failures (bad `top_level`, a broken topology source)
    /// abort the load; per-device failures land in the report.
    #[instrument(skip_all, fields(devices = devices.len()))]
    pub async fn load(&self, devices: &[InventoryDevice]) -> CollectResult<LiveLoad> {
        let mut store = SnapshotStore::new(NETWORK_STORE, Arc::new(self.registry()?));
        let mut report = CollectReport::default();

        store.get_or_add(kinds::STATUS, records::status_fields(DEFAULT_STATUS))?;
        let mut queued = Vec::with_capacity(devices.len());
        for device in devices {
            store.get_or_add(kinds::SITE, records::site_fields(&device.site))?;
            let (_, created) = store.get_or_add(kinds::DEVICE, records::device_fields(device))?;
            if created {
                queued.push(device.clone());
            } else {
                warn!(device = %device.name, "Duplicate inventory entry, ignoring");
                report
                    .skipped
                    .push(SyncError::duplicate(kinds::DEVICE, &device.name));
            }
        }

        let mut links = self.collect_devices(queued, &mut store, &mut report).await;

        let plan = self.import.plan();
        if plan.topology {
            match &self.topology {
                Some(source) => links.extend(source.links().await?),
                None => warn!("External topology cabling selected without a topology source"),
            }
        }

        report.cables = add_cables(&mut store, links)?;
        report.validation = check_data_consistency(&mut store)?;

        info!(
            collected = report.collected.len(),
            unreachable = report.unreachable.len(),
            failed = report.failed.len(),
            records = store.len(),
            "Live collection complete"
        );
        Ok(LiveLoad { store, report })
    }

    async fn collect_devices(
        &self,
        devices: Vec<InventoryDevice>,
        store: &mut SnapshotStore,
        report: &mut CollectReport,
    ) -> Vec<TopologyLink> {
        let semaphore = Arc::new(Semaphore::new(self.collect.max_workers.max(1)));
        let timeout = self.collect.device_timeout();
        let secs = self.collect.device_timeout_secs;
        let plan = self.import.plan();
        let mut tasks = JoinSet::new();

        for device in devices {
            let semaphore = Arc::clone(&semaphore);
            let collector = Arc::clone(&self.collector);

            tasks.spawn(async move {
                let result = collect_one(&device, collector, semaphore, plan, timeout, secs).await;
                (device, result)
            });
        }

        let mut finished = BTreeMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((device, result)) => {
                    finished.insert(device.name.clone(), (device, result));
                }
                Err(e) => {
                    warn!(error = %e, "Collection task aborted");
                    report.failed.push(DeviceFailure {
                        device: "<task>".to_string(),
                        error: CollectError::Task(e.to_string()),
                    });
                }
            }
        }

        let mut links = Vec::new();
        for (name, (device, result)) in finished {
            match result {
                Ok(facts) => {
                    let import = merge_device(store, &device, &facts, &self.import, &plan);
                    report.collected.push(name);
                    links.extend(import.links);
                    report.skipped.extend(import.skipped);
                }
                Err(CollectError::Unreachable { reason, .. }) => {
                    warn!(device = %name, reason = %reason, "Device unreachable");
                    report.unreachable.push(name);
                }
                Err(error) => {
                    warn!(device = %name, error = %error, "Collection failed");
                    report.failed.push(DeviceFailure { device: name, error });
                }
            }
        }
        links
    }
}

/// Runs one collector under a worker permit and the per-device timeout.
async fn collect_one(
    device: &InventoryDevice,
    collector: Arc<dyn DeviceCollector>,
    semaphore: Arc<Semaphore>,
    plan: CollectionPlan,
    timeout: Duration,
    secs: u64,
) -> CollectResult<DeviceFacts> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| CollectError::Task(e.to_string()))?;

    debug!(device = %device.name, "Collecting");
    let facts = tokio::time::timeout(timeout, collector.collect(device, &plan))
        .await
        .map_err(|_| CollectError::Timeout {
            device: device.name.clone(),
            secs,
        })??;
    if !facts.reachable {
        return Err(CollectError::unreachable(&device.name, "no response"));
    }
    Ok(facts)
}

/// Merges one device's facts into the store.
fn merge_device(
    store: &mut SnapshotStore,
    device: &InventoryDevice,
    facts: &DeviceFacts,
    settings: &ImportSettings,
    plan: &CollectionPlan,
) -> DeviceImport {
    let mut import = DeviceImport::default();

    if settings.vlans {
        for vlan in &facts.vlans {
            let vid = match VlanId::new(vlan.vid) {
                Ok(vid) => vid,
                Err(e) => {
                    warn!(device = %device.name, vid = vlan.vid, "Skipping invalid VLAN");
                    import.skipped.push(SyncError::InvalidField {
                        kind: kinds::VLAN.to_string(),
                        field: "vid".to_string(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };
            let fields = records::vlan_fields(&device.site, vid, vlan.name.as_deref());
            if let Err(e) = add_site_child(store, &device.site, kinds::VLAN, fields) {
                import.skipped.push(e);
            }
        }
    }

    let device_id = Identity::new([device.name.as_str()]);
    for intf in &facts.interfaces {
        if let Err(e) = merge_interface(store, device, &device_id, intf, settings) {
            warn!(device = %device.name, interface = %intf.name, error = %e, "Skipping interface");
            import.skipped.push(e);
            continue;
        }
        for address in &intf.addresses {
            if let Err(e) = merge_address(store, device, intf, address, settings) {
                warn!(device = %device.name, interface = %intf.name, error = %e, "Skipping address");
                import.skipped.push(e);
            }
        }
    }

    if plan.neighbors {
        import.links = facts
            .neighbors
            .iter()
            .map(|n| records::neighbor_link(&device.name, n, settings.fqdn.as_deref()))
            .collect();
    }
    import
}

/// Adds a site-contained record, returning its identity whether new or not.
fn add_site_child(
    store: &mut SnapshotStore,
    site: &str,
    kind: &str,
    fields: Fields,
) -> Result<Identity, SyncError> {
    let (record, created) = store.get_or_add(kind, fields)?;
    let id = record.identity().clone();
    if created {
        store.add_child(kinds::SITE, &Identity::new([site]), kind, &id)?;
    }
    Ok(id)
}

fn merge_interface(
    store: &mut SnapshotStore,
    device: &InventoryDevice,
    device_id: &Identity,
    intf: &InterfaceFacts,
    settings: &ImportSettings,
) -> Result<(), SyncError> {
    let status = records::interface_status(intf, settings);
    store.get_or_add(kinds::STATUS, records::status_fields(status))?;

    let id = store.insert(kinds::INTERFACE, records::interface_fields(device, intf, settings))?;
    store.add_child(kinds::DEVICE, device_id, kinds::INTERFACE, &id)
}

fn merge_address(
    store: &mut SnapshotStore,
    device: &InventoryDevice,
    intf: &InterfaceFacts,
    address: &str,
    settings: &ImportSettings,
) -> Result<(), SyncError> {
    let parsed: IpInterface = address.parse().map_err(|e: netsync_types::ParseError| SyncError::InvalidField {
        kind: kinds::IP_ADDRESS.to_string(),
        field: "address".to_string(),
        reason: e.to_string(),
    })?;

    let fields = records::ip_address_fields(&device.name, &intf.name, &parsed);
    let (record, _) = store.get_or_add(kinds::IP_ADDRESS, fields)?;
    let ip_id = record.identity().clone();
    let intf_id = records::interface_identity(&device.name, &intf.name);
    store.add_child(kinds::INTERFACE, &intf_id, kinds::IP_ADDRESS, &ip_id)?;

    if !settings.prefixes {
        return Ok(());
    }
    let Some(prefix) = records::derive_prefix(&parsed) else {
        return Ok(());
    };
    let vlan = records::svi_vlan(&device.site, &intf.name)
        .filter(|uid| store.get_by_uid(kinds::VLAN, uid).is_ok());
    let prefix_id = add_site_child(
        store,
        &device.site,
        kinds::PREFIX,
        records::prefix_fields(&device.site, &prefix, vlan.clone()),
    )?;

    // A prefix first seen on a routed port picks up the VLAN of a later SVI.
    if let Some(vlan) = vlan {
        if store.get(kinds::PREFIX, &prefix_id)?.get("vlan").is_null() {
            let mut changes = Fields::new();
            changes.insert("vlan".to_string(), vlan.into());
            store.update(kinds::PREFIX, &prefix_id, &changes)?;
        }
    }
    Ok(())
}

/// Adds one cable per distinct link; both directions collapse into one.
fn add_cables(store: &mut SnapshotStore, links: Vec<TopologyLink>) -> CollectResult<usize> {
    let mut added = 0;
    for link in links.into_iter().map(records::normalize_cable) {
        if link.a_device == link.b_device && link.a_interface == link.b_interface {
            debug!(device = %link.a_device, interface = %link.a_interface, "Ignoring self-link");
            continue;
        }
        let (_, created) = store.get_or_add(kinds::CABLE, records::cable_fields(&link))?;
        if created {
            added += 1;
        }
    }
    Ok(added)
}
