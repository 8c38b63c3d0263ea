//! Test fixtures for common inventory records
//!
//! Provides record builders and reusable topologies

use netsync_core::{Fields, Handle, Identity, SnapshotStore, SyncResult, Value, HANDLE_FIELD};

/// Field mapping for one record, ready to insert into a store
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFixture {
    /// Kind name (e.g., "device", "interface")
    pub kind: String,
    /// Raw field values, including identity fields
    pub fields: Fields,
}

impl RecordFixture {
    /// Create an empty fixture of a kind
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            fields: Fields::new(),
        }
    }

    /// Set a field
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Set the native handle
    pub fn with_handle(self, handle: &str) -> Self {
        self.with_field(HANDLE_FIELD, handle)
    }

    /// Set a list field from unique ids
    pub fn with_list<I, S>(self, field: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<String> = items.into_iter().map(Into::into).collect();
        self.with_field(field, items)
    }

    /// Insert into `store`, returning the identity
    pub fn insert(self, store: &mut SnapshotStore) -> SyncResult<Identity> {
        store.insert(&self.kind, self.fields)
    }

    /// Insert into `store` as a child of an existing record
    pub fn insert_under(
        self,
        store: &mut SnapshotStore,
        parent_kind: &str,
        parent: &Identity,
    ) -> SyncResult<Identity> {
        let kind = self.kind.clone();
        let id = self.insert(store)?;
        store.add_child(parent_kind, parent, &kind, &id)?;
        Ok(id)
    }
}

/// Common site and status fixtures
pub mod site_fixtures {
    use super::*;

    pub fn site(slug: &str) -> RecordFixture {
        RecordFixture::new("site").with_field("slug", slug)
    }

    pub fn status(slug: &str, name: &str) -> RecordFixture {
        RecordFixture::new("status")
            .with_field("slug", slug)
            .with_field("name", name)
    }

    /// The default operational status
    pub fn status_active() -> RecordFixture {
        status("active", "Active")
    }
}

/// Common device fixtures
pub mod device_fixtures {
    use super::*;

    pub fn device(slug: &str, site: &str) -> RecordFixture {
        RecordFixture::new("device")
            .with_field("slug", slug)
            .with_field("site", site)
    }

    pub fn device_with_ip(slug: &str, site: &str, primary_ip: &str) -> RecordFixture {
        device(slug, site).with_field("primary_ip", primary_ip)
    }
}

/// Common interface fixtures
pub mod interface_fixtures {
    use super::*;

    /// Physical interface with active status
    pub fn interface(device: &str, name: &str) -> RecordFixture {
        RecordFixture::new("interface")
            .with_field("device", device)
            .with_field("name", name)
            .with_field("status", "active")
            .with_field("mode", "NONE")
            .with_field("is_virtual", false)
    }

    pub fn interface_with_description(device: &str, name: &str, description: &str) -> RecordFixture {
        interface(device, name).with_field("description", description)
    }

    /// Trunk port carrying the given VLAN unique ids
    pub fn trunk(device: &str, name: &str, vlans: &[&str]) -> RecordFixture {
        interface(device, name)
            .with_field("mode", "TRUNK")
            .with_list("tagged_vlans", vlans.iter().copied())
    }

    /// Loopback or SVI
    pub fn virtual_interface(device: &str, name: &str) -> RecordFixture {
        interface(device, name)
            .with_field("is_virtual", true)
            .with_field("type", "virtual")
    }
}

/// Common VLAN, prefix and address fixtures
pub mod ip_fixtures {
    use super::*;

    pub fn vlan(site: &str, vid: u16, name: &str) -> RecordFixture {
        RecordFixture::new("vlan")
            .with_field("site", site)
            .with_field("vid", vid)
            .with_field("name", name)
            .with_field("status", "active")
    }

    pub fn prefix(site: &str, prefix: &str) -> RecordFixture {
        RecordFixture::new("prefix")
            .with_field("site", site)
            .with_field("prefix", prefix)
            .with_field("status", "active")
    }

    pub fn ip_address(device: &str, interface: &str, address: &str) -> RecordFixture {
        RecordFixture::new("ip_address")
            .with_field("device", device)
            .with_field("interface", interface)
            .with_field("address", address)
            .with_field("status", "active")
    }
}

/// Common cabling fixtures
pub mod cable_fixtures {
    use super::*;

    pub fn cable(a_device: &str, a_intf: &str, b_device: &str, b_intf: &str) -> RecordFixture {
        RecordFixture::new("cable")
            .with_field("termination_a_device", a_device)
            .with_field("termination_a", a_intf)
            .with_field("termination_b_device", b_device)
            .with_field("termination_b", b_intf)
    }
}

/// Canonical site `ams01` with two edge devices
///
/// - status `active`
/// - site `ams01` with VLAN 100 and prefix 10.1.0.0/24
/// - `ams01-edge-01` with `Ethernet1/1` (10.1.0.1/24), `Ethernet1/2` (trunk, VLAN 100)
///   and `Loopback0`
/// - `ams01-edge-02` with `Ethernet1/1`
/// - a cable between the two `Ethernet1/1` ports
///
/// With `handles` set, every record gets a native handle derived from its
/// unique id, as a loaded system of record would.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ams01Topology {
    pub handles: bool,
}

impl Ams01Topology {
    pub const SITE: &'static str = "ams01";
    pub const EDGE_01: &'static str = "ams01-edge-01";
    pub const EDGE_02: &'static str = "ams01-edge-02";

    pub fn new() -> Self {
        Self { handles: false }
    }

    pub fn with_handles(mut self) -> Self {
        self.handles = true;
        self
    }

    /// Build the topology into a fresh store
    pub fn build(&self, name: &str) -> SyncResult<SnapshotStore> {
        use cable_fixtures::*;
        use device_fixtures::*;
        use interface_fixtures::*;
        use ip_fixtures::*;
        use site_fixtures::*;

        let mut store = SnapshotStore::network(name);
        self.add(&mut store, status_active())?;
        let site = self.add(&mut store, site(Self::SITE))?;
        let vlan = self.add(&mut store, vlan(Self::SITE, 100, "mgmt"))?;
        store.add_child("site", &site, "vlan", &vlan)?;
        let prefix = self.add(&mut store, prefix(Self::SITE, "10.1.0.0/24"))?;
        store.add_child("site", &site, "prefix", &prefix)?;

        let edge_01 = self.add(&mut store, device_with_ip(Self::EDGE_01, Self::SITE, "10.1.0.1"))?;
        let eth1 = self.add(&mut store, interface(Self::EDGE_01, "Ethernet1/1"))?;
        let eth2 = self.add(&mut store, trunk(Self::EDGE_01, "Ethernet1/2", &["ams01__100"]))?;
        let lo0 = self.add(&mut store, virtual_interface(Self::EDGE_01, "Loopback0"))?;
        for intf in [&eth1, &eth2, &lo0] {
            store.add_child("device", &edge_01, "interface", intf)?;
        }
        let addr = self.add(&mut store, ip_address(Self::EDGE_01, "Ethernet1/1", "10.1.0.1/24"))?;
        store.add_child("interface", &eth1, "ip_address", &addr)?;

        let edge_02 = self.add(&mut store, device_with_ip(Self::EDGE_02, Self::SITE, "10.1.0.2"))?;
        let peer = self.add(&mut store, interface(Self::EDGE_02, "Ethernet1/1"))?;
        store.add_child("device", &edge_02, "interface", &peer)?;

        self.add(
            &mut store,
            cable(Self::EDGE_01, "Ethernet1/1", Self::EDGE_02, "Ethernet1/1"),
        )?;
        Ok(store)
    }

    fn add(&self, store: &mut SnapshotStore, fixture: RecordFixture) -> SyncResult<Identity> {
        let kind = fixture.kind.clone();
        let id = fixture.insert(store)?;
        if self.handles {
            let handle = Handle::new(format!("{}:{}", kind, id));
            store.set_handle(&kind, &id, Some(handle))?;
        }
        Ok(id)
    }
}

impl Default for Ams01Topology {
    fn default() -> Self {
        Self::new()
    }
}
