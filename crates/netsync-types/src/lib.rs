//! Network primitives shared by the netsync crates.
//!
//! This crate provides type-safe representations of the values that show up
//! in inventory records and in facts collected from devices:
//!
//! - [`VlanId`]: IEEE 802.1Q VLAN identifiers
//! - [`IpInterface`]: an address together with its prefix length, as configured on an interface
//! - [`IpPrefix`]: a masked network in CIDR notation
//! - [`InterfaceType`]: physical / virtual / LAG classification of an interface

mod interface;
mod ip;
mod vlan;

pub use interface::InterfaceType;
pub use ip::{IpInterface, IpPrefix};
pub use vlan::VlanId;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("invalid IP prefix format: {0}")]
    InvalidIpPrefix(String),

    #[error("invalid VLAN ID: {0} (must be 1-4094)")]
    InvalidVlanId(String),

    #[error("invalid interface type: {0}")]
    InvalidInterfaceType(String),
}
