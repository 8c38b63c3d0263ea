//! Interface classification.
//!
//! Cabling and LAG handling only care whether an interface is a physical
//! port, an aggregate, or something purely logical. Device facts report a
//! type string when they can; otherwise the interface name is used.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Class of a device interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceType {
    /// Front-panel or management port that can carry a cable.
    #[default]
    Physical,
    /// Link aggregation group (port-channel, bundle, bond).
    Lag,
    /// Logical interface: loopback, SVI, tunnel, sub-interface.
    Virtual,
}

const LAG_PREFIXES: &[&str] = &["port-channel", "portchannel", "po", "ae", "bond", "bundle-ether"];
const VIRTUAL_PREFIXES: &[&str] = &["loopback", "lo", "vlan", "tunnel", "tu", "nve", "vxlan", "irb", "bvi", "null"];

impl InterfaceType {
    pub const fn is_virtual(&self) -> bool {
        matches!(self, InterfaceType::Virtual)
    }

    pub const fn is_lag(&self) -> bool {
        matches!(self, InterfaceType::Lag)
    }

    /// Guesses the interface class from its name.
    ///
    /// Sub-interfaces (`Ethernet1/1.100`) are virtual regardless of their parent.
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        if lower.contains('.') {
            return InterfaceType::Virtual;
        }

        let alpha: String = lower
            .chars()
            .take_while(|c| c.is_ascii_alphabetic() || *c == '-')
            .collect();

        if LAG_PREFIXES.iter().any(|p| alpha == *p) {
            InterfaceType::Lag
        } else if VIRTUAL_PREFIXES.iter().any(|p| alpha == *p) {
            InterfaceType::Virtual
        } else {
            InterfaceType::Physical
        }
    }

    /// Interprets a type string reported by an inventory or a device.
    ///
    /// Well-known names map to their class; anything else (`1000base-t`,
    /// `100gbase-x-qsfp28`, ...) is a physical media type.
    pub fn from_type_str(s: &str) -> Self {
        s.parse().unwrap_or(InterfaceType::Physical)
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InterfaceType::Physical => "physical",
            InterfaceType::Lag => "lag",
            InterfaceType::Virtual => "virtual",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for InterfaceType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "physical" | "phy" => Ok(InterfaceType::Physical),
            "lag" => Ok(InterfaceType::Lag),
            "virtual" | "bridge" | "loopback" | "tunnel" => Ok(InterfaceType::Virtual),
            _ => Err(ParseError::InvalidInterfaceType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_name() {
        assert_eq!(InterfaceType::from_name("Ethernet1/1"), InterfaceType::Physical);
        assert_eq!(InterfaceType::from_name("GigabitEthernet0/0/1"), InterfaceType::Physical);
        assert_eq!(InterfaceType::from_name("xe-0/0/1"), InterfaceType::Physical);
        assert_eq!(InterfaceType::from_name("Port-Channel10"), InterfaceType::Lag);
        assert_eq!(InterfaceType::from_name("ae0"), InterfaceType::Lag);
        assert_eq!(InterfaceType::from_name("Loopback0"), InterfaceType::Virtual);
        assert_eq!(InterfaceType::from_name("Vlan100"), InterfaceType::Virtual);
        assert_eq!(InterfaceType::from_name("Ethernet1/1.100"), InterfaceType::Virtual);
    }

    #[test]
    fn test_from_type_str() {
        assert_eq!(InterfaceType::from_type_str("lag"), InterfaceType::Lag);
        assert_eq!(InterfaceType::from_type_str("virtual"), InterfaceType::Virtual);
        assert_eq!(InterfaceType::from_type_str("1000base-t"), InterfaceType::Physical);
    }

    #[test]
    fn test_parse_rejects_media_type() {
        assert!("10gbase-x-sfpp".parse::<InterfaceType>().is_err());
    }

    #[test]
    fn test_display_round_trips() {
        for ty in [InterfaceType::Physical, InterfaceType::Lag, InterfaceType::Virtual] {
            assert_eq!(ty.to_string().parse::<InterfaceType>().unwrap(), ty);
        }
    }
}
