//! Conversion of collected facts into snapshot record fields.

use std::cmp::Ordering;

use netsync_core::{Fields, Identity, Value};
use netsync_types::{InterfaceType, IpInterface, IpPrefix, VlanId};

use crate::facts::{InterfaceFacts, InventoryDevice, Neighbor, TopologyLink};
use crate::settings::{ImportSettings, ModePolicy};

/// Status given to records when nothing better is known.
pub const DEFAULT_STATUS: &str = "active";

fn fields<const N: usize>(pairs: [(&str, Value); N]) -> Fields {
    pairs
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// Title-cases a status slug for its display name.
fn status_name(slug: &str) -> String {
    let mut chars = slug.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn status_fields(slug: &str) -> Fields {
    fields([("slug", slug.into()), ("name", status_name(slug).into())])
}

pub fn site_fields(slug: &str) -> Fields {
    fields([("slug", slug.into())])
}

pub fn device_fields(device: &InventoryDevice) -> Fields {
    fields([
        ("slug", device.name.as_str().into()),
        ("site", device.site.as_str().into()),
        ("primary_ip", device.primary_ip.clone().into()),
    ])
}

/// Unique id of a VLAN record.
pub fn vlan_uid(site: &str, vid: u16) -> String {
    Identity::new([site.to_string(), vid.to_string()]).unique_id()
}

pub fn vlan_fields(site: &str, vid: VlanId, name: Option<&str>) -> Fields {
    let name = name
        .map(str::to_string)
        .unwrap_or_else(|| format!("vlan-{}", vid.as_u16()));
    fields([
        ("site", site.into()),
        ("vid", vid.as_u16().into()),
        ("name", name.into()),
        ("status", DEFAULT_STATUS.into()),
    ])
}

/// Normalizes a reported switchport mode.
///
/// An interface with tagged VLANs but no mode gets the policy's mode.
pub fn interface_mode(mode: Option<&str>, has_tagged: bool, policy: ModePolicy) -> &'static str {
    match mode.map(str::to_ascii_lowercase).as_deref() {
        Some("access") => "ACCESS",
        Some("trunk") | Some("tagged") => "TRUNK",
        Some("l3_sub_vlan") | Some("l3-sub-vlan") => "L3_SUB_VLAN",
        _ if has_tagged => policy.mode(),
        _ => "NONE",
    }
}

/// Classifies an interface by its reported type, falling back to its name.
pub fn interface_type(intf: &InterfaceFacts) -> InterfaceType {
    match intf.kind.as_deref() {
        Some(kind) => InterfaceType::from_type_str(kind),
        None => InterfaceType::from_name(&intf.name),
    }
}

/// Status slug recorded for an interface.
pub fn interface_status<'a>(intf: &'a InterfaceFacts, settings: &ImportSettings) -> &'a str {
    if settings.intf_status {
        intf.status.as_deref().unwrap_or(DEFAULT_STATUS)
    } else {
        DEFAULT_STATUS
    }
}

pub fn interface_fields(
    device: &InventoryDevice,
    intf: &InterfaceFacts,
    settings: &ImportSettings,
) -> Fields {
    let itype = interface_type(intf);
    let mut out = fields([
        ("device", device.name.as_str().into()),
        ("name", intf.name.as_str().into()),
        ("description", intf.description.clone().into()),
        ("status", interface_status(intf, settings).into()),
        ("type", itype.to_string().into()),
        ("is_virtual", itype.is_virtual().into()),
        ("is_lag", itype.is_lag().into()),
        ("parent", intf.lag.clone().into()),
    ]);

    if settings.vlans {
        let tagged: Vec<String> = intf
            .tagged_vlans
            .iter()
            .map(|vid| vlan_uid(&device.site, *vid))
            .collect();
        out.insert(
            "mode".to_string(),
            interface_mode(intf.mode.as_deref(), !tagged.is_empty(), settings.tagged_without_mode).into(),
        );
        if !tagged.is_empty() {
            out.insert("tagged_vlans".to_string(), tagged.into());
        }
        if let Some(vid) = intf.untagged_vlan {
            out.insert("untagged_vlan".to_string(), vlan_uid(&device.site, vid).into());
        }
    } else {
        out.insert("mode".to_string(), "NONE".into());
    }
    out
}

pub fn ip_address_fields(device: &str, interface: &str, address: &IpInterface) -> Fields {
    fields([
        ("device", device.into()),
        ("interface", interface.into()),
        ("address", address.to_string().into()),
        ("status", DEFAULT_STATUS.into()),
    ])
}

/// Network of a configured address, or `None` for host routes.
pub fn derive_prefix(address: &IpInterface) -> Option<IpPrefix> {
    let prefix = address.network();
    (!prefix.is_host_route()).then_some(prefix)
}

/// Prefix record fields; an SVI's VLAN is attached when it exists in the site.
pub fn prefix_fields(site: &str, prefix: &IpPrefix, vlan: Option<String>) -> Fields {
    fields([
        ("site", site.into()),
        ("prefix", prefix.to_string().into()),
        ("status", DEFAULT_STATUS.into()),
        ("vlan", vlan.into()),
    ])
}

/// VLAN carried by an SVI name, as a unique id within `site`.
pub fn svi_vlan(site: &str, interface: &str) -> Option<String> {
    VlanId::from_interface_name(interface).map(|vid| vlan_uid(site, vid.as_u16()))
}

/// Strips the domain suffix from a neighbor hostname.
///
/// Without a configured suffix, everything after the first dot is dropped.
pub fn strip_fqdn<'a>(hostname: &'a str, fqdn: Option<&str>) -> &'a str {
    match fqdn {
        Some(suffix) => {
            let suffix = suffix.trim_start_matches('.');
            hostname
                .strip_suffix(suffix)
                .and_then(|h| h.strip_suffix('.'))
                .unwrap_or(hostname)
        }
        None => hostname.split('.').next().unwrap_or(hostname),
    }
}

/// Builds a link from a neighbor entry seen on `device`.
pub fn neighbor_link(device: &str, neighbor: &Neighbor, fqdn: Option<&str>) -> TopologyLink {
    TopologyLink {
        a_device: device.to_string(),
        a_interface: neighbor.local_interface.clone(),
        b_device: strip_fqdn(&neighbor.hostname, fqdn).to_string(),
        b_interface: neighbor.port.clone(),
    }
}

/// Orders the endpoints so both directions of a link produce one cable.
pub fn normalize_cable(link: TopologyLink) -> TopologyLink {
    let a = (&link.a_device, &link.a_interface);
    let b = (&link.b_device, &link.b_interface);
    match a.cmp(&b) {
        Ordering::Greater => TopologyLink {
            a_device: link.b_device,
            a_interface: link.b_interface,
            b_device: link.a_device,
            b_interface: link.a_interface,
        },
        _ => link,
    }
}

pub fn cable_fields(link: &TopologyLink) -> Fields {
    fields([
        ("termination_a_device", link.a_device.as_str().into()),
        ("termination_a", link.a_interface.as_str().into()),
        ("termination_b_device", link.b_device.as_str().into()),
        ("termination_b", link.b_interface.as_str().into()),
    ])
}

/// Identity of the interface record `device`/`name`.
pub fn interface_identity(device: &str, name: &str) -> Identity {
    Identity::new([device, name])
}
