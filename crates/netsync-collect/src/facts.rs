//! Device inventory and the facts a collector reports per device.
//!
//! These are the output shapes of external collectors (CLI scrapers,
//! NAPALM-style drivers, topology exporters). All of them decode from JSON.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CollectError, CollectResult};

/// One device of the collection inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryDevice {
    pub name: String,
    pub site: String,
    #[serde(default)]
    pub primary_ip: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
}

impl InventoryDevice {
    pub fn new(name: impl Into<String>, site: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            site: site.into(),
            primary_ip: None,
            platform: None,
        }
    }

    pub fn with_primary_ip(mut self, ip: impl Into<String>) -> Self {
        self.primary_ip = Some(ip.into());
        self
    }
}

/// Reads a JSON array of [`InventoryDevice`].
pub fn load_inventory(path: impl AsRef<Path>) -> CollectResult<Vec<InventoryDevice>> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| CollectError::io(path, e))?;
    serde_json::from_str(&text).map_err(|source| CollectError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// An interface as reported by a device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterfaceFacts {
    pub name: String,
    pub description: Option<String>,
    /// Switchport mode as reported (`access`, `trunk`, ...).
    pub mode: Option<String>,
    pub tagged_vlans: Vec<u16>,
    pub untagged_vlan: Option<u16>,
    /// Operational status slug (`active`, `failed`, ...).
    pub status: Option<String>,
    /// Type string; the interface name is used when absent.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Parent LAG of a member port.
    pub lag: Option<String>,
    /// Configured addresses in CIDR form.
    pub addresses: Vec<String>,
}

impl InterfaceFacts {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A VLAN configured on a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanFacts {
    pub vid: u16,
    #[serde(default)]
    pub name: Option<String>,
}

/// One neighbor seen on a local interface (LLDP/CDP).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Neighbor {
    pub local_interface: String,
    pub hostname: String,
    pub port: String,
}

/// A link exported by an external topology tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyLink {
    pub a_device: String,
    pub a_interface: String,
    pub b_device: String,
    pub b_interface: String,
}

/// Everything a collector learned about one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceFacts {
    /// False when the device could not be contacted.
    pub reachable: bool,
    pub interfaces: Vec<InterfaceFacts>,
    pub vlans: Vec<VlanFacts>,
    pub neighbors: Vec<Neighbor>,
}

impl Default for DeviceFacts {
    fn default() -> Self {
        Self {
            reachable: true,
            interfaces: Vec::new(),
            vlans: Vec::new(),
            neighbors: Vec::new(),
        }
    }
}

impl DeviceFacts {
    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::default()
        }
    }
}
