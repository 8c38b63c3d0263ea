//! VLAN ID type with validation.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// IEEE 802.1Q VLAN identifier (1-4094).
///
/// # Examples
///
/// ```
/// use netsync_types::VlanId;
///
/// let vlan = VlanId::new(100).unwrap();
/// assert_eq!(vlan.as_u16(), 100);
///
/// assert!(VlanId::new(0).is_err());
/// assert!(VlanId::new(4095).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct VlanId(u16);

impl VlanId {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 4094;

    /// Creates a new VLAN ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the VLAN ID is not in the valid range (1-4094).
    pub fn new(id: u16) -> Result<Self, ParseError> {
        if (Self::MIN..=Self::MAX).contains(&id) {
            Ok(VlanId(id))
        } else {
            Err(ParseError::InvalidVlanId(id.to_string()))
        }
    }

    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// Extracts the VLAN carried by an SVI name such as `Vlan100` or `vlan.100`.
    ///
    /// Returns `None` for any interface that is not a VLAN interface.
    pub fn from_interface_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        let rest = lower.strip_prefix("vlan")?;
        let digits = rest.trim_start_matches(['.', '-', ' ']);
        digits.parse::<u16>().ok().and_then(|id| VlanId::new(id).ok())
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VlanId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let id: u16 = trimmed
            .parse()
            .map_err(|_| ParseError::InvalidVlanId(trimmed.to_string()))?;
        VlanId::new(id)
    }
}

impl TryFrom<u16> for VlanId {
    type Error = ParseError;

    fn try_from(id: u16) -> Result<Self, Self::Error> {
        VlanId::new(id)
    }
}

impl From<VlanId> for u16 {
    fn from(vlan: VlanId) -> u16 {
        vlan.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_range() {
        assert!(VlanId::new(1).is_ok());
        assert!(VlanId::new(4094).is_ok());
        assert!(VlanId::new(0).is_err());
        assert!(VlanId::new(4095).is_err());
    }

    #[test]
    fn test_parse_reports_input() {
        assert_eq!(
            "abc".parse::<VlanId>(),
            Err(ParseError::InvalidVlanId("abc".to_string()))
        );
        assert_eq!(" 42 ".parse::<VlanId>().unwrap().as_u16(), 42);
    }

    #[test]
    fn test_from_interface_name() {
        assert_eq!(VlanId::from_interface_name("Vlan100"), VlanId::new(100).ok());
        assert_eq!(VlanId::from_interface_name("vlan.20"), VlanId::new(20).ok());
        assert_eq!(VlanId::from_interface_name("Ethernet1/1"), None);
        assert_eq!(VlanId::from_interface_name("Vlan9999"), None);
    }

    #[test]
    fn test_ordering() {
        let v10 = VlanId::new(10).unwrap();
        let v20 = VlanId::new(20).unwrap();
        assert!(v10 < v20);
        assert_eq!(u16::from(v20), 20);
    }
}
