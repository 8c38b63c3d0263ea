//! Live network loader for netsync.
//!
//! Turns an inventory of devices into a validated [`SnapshotStore`] by
//! running a [`DeviceCollector`] against each device on a bounded worker
//! pool.
//!
//! # Flow
//!
//! 1. Sites and devices are seeded from the inventory
//! 2. Each device is collected concurrently, up to `max_workers`
//! 3. VLANs, interfaces, addresses and prefixes are merged per device, in
//!    device name order
//! 4. Cables are built from neighbor tables or an external topology source
//! 5. The store goes through [`check_data_consistency`]
//!
//! [`SnapshotStore`]: netsync_core::SnapshotStore
//! [`check_data_consistency`]: netsync_core::check_data_consistency

mod collector;
mod error;
mod facts;
mod live;
pub mod records;
mod settings;

pub use collector::{DeviceCollector, FileCollector, FileTopology, TopologySource};
pub use error::{CollectError, CollectResult};
pub use facts::{
    load_inventory, DeviceFacts, InterfaceFacts, InventoryDevice, Neighbor, TopologyLink, VlanFacts,
};
pub use live::{CollectReport, DeviceFailure, LiveLoad, LiveLoader, NETWORK_STORE};
pub use settings::{CablingStrategy, CollectSettings, CollectionPlan, ImportSettings, ModePolicy};
