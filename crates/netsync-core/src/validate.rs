//! Consistency Validator, run on a freshly collected store before diffing.
//!
//! - Interface VLAN memberships are narrowed to VLANs of the device's site.
//!   Each VLAN's `associations` list is rebuilt from the surviving memberships.
//! - Cables touching a virtual interface are removed.

use std::collections::BTreeSet;

use netsync_types::InterfaceType;
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};
use crate::record::Record;
use crate::registry::kinds;
use crate::store::SnapshotStore;
use crate::value::{Fields, Identity, Value};

/// Derived field on VLAN records listing associated device slugs.
pub const ASSOCIATIONS_FIELD: &str = "associations";

/// What a validation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// VLAN references dropped from interfaces.
    pub pruned_vlans: usize,
    /// Cables removed, with the reason.
    pub removed_cables: Vec<SyncError>,
}

/// Prunes dangling VLAN memberships and invalid cables from `store`.
pub fn check_data_consistency(store: &mut SnapshotStore) -> SyncResult<ValidationReport> {
    let mut report = ValidationReport::default();
    check_interface_vlans(store, &mut report)?;
    check_cables(store, &mut report)?;

    info!(
        store = %store.name(),
        pruned_vlans = report.pruned_vlans,
        removed_cables = report.removed_cables.len(),
        "Consistency check complete"
    );
    Ok(report)
}

/// Adds `device` to the VLAN's association list, keeping it sorted and unique.
pub fn associate_device(store: &mut SnapshotStore, vlan: &Identity, device: &str) -> SyncResult<()> {
    let record = store.get(kinds::VLAN, vlan)?;
    let mut devices: BTreeSet<String> = record
        .get(ASSOCIATIONS_FIELD)
        .text_items()
        .into_iter()
        .map(str::to_string)
        .collect();
    if !devices.insert(device.to_string()) {
        return Ok(());
    }

    let mut changes = Fields::new();
    changes.insert(
        ASSOCIATIONS_FIELD.to_string(),
        Value::from(devices.into_iter().collect::<Vec<_>>()),
    );
    store.update(kinds::VLAN, vlan, &changes)
}

/// Returns the VLAN identity if it exists in `store` and belongs to `site`.
fn site_vlan(store: &SnapshotStore, site: Option<&str>, uid: &str) -> Option<Identity> {
    let vlan = store.get_by_uid(kinds::VLAN, uid).ok()?;
    let in_site = match site {
        Some(site) => vlan.text("site") == Some(site),
        None => true,
    };
    in_site.then(|| vlan.identity().clone())
}

/// Clears every VLAN's association list ahead of a rebuild.
fn clear_associations(store: &mut SnapshotStore) -> SyncResult<()> {
    let stale: Vec<Identity> = store
        .get_all(kinds::VLAN)
        .filter(|r| !r.get(ASSOCIATIONS_FIELD).is_null())
        .map(|r| r.identity().clone())
        .collect();

    let mut changes = Fields::new();
    changes.insert(ASSOCIATIONS_FIELD.to_string(), Value::Null);
    for vlan in stale {
        store.update(kinds::VLAN, &vlan, &changes)?;
    }
    Ok(())
}

fn check_interface_vlans(store: &mut SnapshotStore, report: &mut ValidationReport) -> SyncResult<()> {
    clear_associations(store)?;

    let interfaces: Vec<Identity> = store
        .get_all(kinds::INTERFACE)
        .map(|r| r.identity().clone())
        .collect();

    for id in interfaces {
        let record = store.get(kinds::INTERFACE, &id)?;
        let Some(device) = record.get("device").identity_part() else {
            continue;
        };
        let site = store
            .get_by_uid(kinds::DEVICE, &device)
            .ok()
            .and_then(|d| d.text("site"))
            .map(str::to_string);

        let mut kept = Vec::new();
        let mut tagged = Vec::new();
        for uid in record.get("tagged_vlans").text_items() {
            match site_vlan(store, site.as_deref(), uid) {
                Some(vlan) => {
                    tagged.push(uid.to_string());
                    kept.push(vlan);
                }
                None => {
                    debug!(interface = %id, vlan = uid, "Dropping VLAN not present in site");
                    report.pruned_vlans += 1;
                }
            }
        }

        let mut changes = Fields::new();
        if !record.get("tagged_vlans").is_null()
            && record.get("tagged_vlans").text_items().len() != tagged.len()
        {
            changes.insert("tagged_vlans".to_string(), Value::from(tagged));
        }

        if let Some(uid) = record.text("untagged_vlan") {
            match site_vlan(store, site.as_deref(), uid) {
                Some(vlan) => kept.push(vlan),
                None => {
                    debug!(interface = %id, vlan = uid, "Dropping untagged VLAN not present in site");
                    report.pruned_vlans += 1;
                    changes.insert("untagged_vlan".to_string(), Value::Null);
                }
            }
        }

        if !changes.is_empty() {
            store.update(kinds::INTERFACE, &id, &changes)?;
        }
        for vlan in kept {
            associate_device(store, &vlan, &device)?;
        }
    }
    Ok(())
}

/// Returns true if the interface is flagged or typed as virtual.
pub fn is_virtual_interface(record: &Record) -> bool {
    if let Some(flag) = record.get("is_virtual").as_bool() {
        return flag;
    }
    record
        .text("type")
        .map(|t| InterfaceType::from_type_str(t).is_virtual())
        .unwrap_or(false)
}

fn check_cables(store: &mut SnapshotStore, report: &mut ValidationReport) -> SyncResult<()> {
    let cables: Vec<Identity> = store
        .get_all(kinds::CABLE)
        .map(|r| r.identity().clone())
        .collect();

    for id in cables {
        let record = store.get(kinds::CABLE, &id)?;
        let mut reason = None;

        for (device_field, intf_field) in [
            ("termination_a_device", "termination_a"),
            ("termination_b_device", "termination_b"),
        ] {
            let (Some(device), Some(intf)) = (
                record.get(device_field).identity_part(),
                record.get(intf_field).identity_part(),
            ) else {
                continue;
            };
            if !store.contains(kinds::DEVICE, &Identity::new([device.as_str()])) {
                continue;
            }
            let intf_id = Identity::new([device.as_str(), intf.as_str()]);
            let Ok(interface) = store.get(kinds::INTERFACE, &intf_id) else {
                continue;
            };
            if is_virtual_interface(interface) {
                reason = Some(format!("{}:{} is a virtual interface", device, intf));
                break;
            }
        }

        if let Some(reason) = reason {
            let err = SyncError::invalid_relation(kinds::CABLE, &id, reason);
            warn!(cable = %id, error = %err, "Removing cable");
            store.remove(kinds::CABLE, &id)?;
            report.removed_cables.push(err);
        }
    }
    Ok(())
}
