//! IP interface and prefix types with safe parsing.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

fn max_len(address: &IpAddr) -> u8 {
    match address {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn mask(address: IpAddr, prefix_len: u8) -> IpAddr {
    match address {
        IpAddr::V4(v4) => {
            let bits = u32::from(v4);
            let masked = match prefix_len {
                0 => 0,
                len => bits & (u32::MAX << (32 - u32::from(len))),
            };
            IpAddr::V4(Ipv4Addr::from(masked))
        }
        IpAddr::V6(v6) => {
            let bits = u128::from(v6);
            let masked = match prefix_len {
                0 => 0,
                len => bits & (u128::MAX << (128 - u32::from(len))),
            };
            IpAddr::V6(Ipv6Addr::from(masked))
        }
    }
}

fn split_cidr(s: &str) -> Result<(IpAddr, u8), ParseError> {
    let (addr_str, len_str) = s
        .trim()
        .rsplit_once('/')
        .ok_or_else(|| ParseError::InvalidIpPrefix(s.to_string()))?;

    let address: IpAddr = addr_str
        .parse()
        .map_err(|_| ParseError::InvalidIpAddress(addr_str.to_string()))?;
    let prefix_len: u8 = len_str
        .parse()
        .map_err(|_| ParseError::InvalidIpPrefix(s.to_string()))?;

    if prefix_len > max_len(&address) {
        return Err(ParseError::InvalidIpPrefix(format!(
            "prefix length {} exceeds maximum {} for {}",
            prefix_len,
            max_len(&address),
            address
        )));
    }

    Ok((address, prefix_len))
}

/// An address as configured on an interface, e.g. `10.1.1.1/24`.
///
/// Unlike [`IpPrefix`] the host bits are preserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpInterface {
    address: IpAddr,
    prefix_len: u8,
}

impl IpInterface {
    /// Creates an interface address.
    ///
    /// # Errors
    ///
    /// Returns an error if the prefix length exceeds the address family width.
    pub fn new(address: IpAddr, prefix_len: u8) -> Result<Self, ParseError> {
        if prefix_len > max_len(&address) {
            return Err(ParseError::InvalidIpPrefix(format!("{}/{}", address, prefix_len)));
        }
        Ok(Self {
            address,
            prefix_len,
        })
    }

    pub const fn address(&self) -> IpAddr {
        self.address
    }

    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Returns the network this address lives in.
    pub fn network(&self) -> IpPrefix {
        IpPrefix {
            network: mask(self.address, self.prefix_len),
            prefix_len: self.prefix_len,
        }
    }
}

impl fmt::Display for IpInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for IpInterface {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, prefix_len) = split_cidr(s)?;
        Ok(Self {
            address,
            prefix_len,
        })
    }
}

impl TryFrom<String> for IpInterface {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IpInterface> for String {
    fn from(intf: IpInterface) -> String {
        intf.to_string()
    }
}

/// An IP network in CIDR notation (e.g., 10.0.0.0/24 or 2001:db8::/32).
///
/// Host bits are always cleared, so `10.0.0.7/24` parses to `10.0.0.0/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpPrefix {
    network: IpAddr,
    prefix_len: u8,
}

impl IpPrefix {
    pub const fn network(&self) -> IpAddr {
        self.network
    }

    pub const fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub const fn is_ipv4(&self) -> bool {
        self.network.is_ipv4()
    }

    /// Returns true if this prefix holds a single address (/32 for IPv4, /128 for IPv6).
    pub fn is_host_route(&self) -> bool {
        self.prefix_len == max_len(&self.network)
    }
}

impl fmt::Display for IpPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.network, self.prefix_len)
    }
}

impl FromStr for IpPrefix {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, prefix_len) = split_cidr(s)?;
        Ok(Self {
            network: mask(address, prefix_len),
            prefix_len,
        })
    }
}

impl TryFrom<String> for IpPrefix {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IpPrefix> for String {
    fn from(prefix: IpPrefix) -> String {
        prefix.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_interface_keeps_host_bits() {
        let intf: IpInterface = "10.1.1.7/24".parse().unwrap();
        assert_eq!(intf.to_string(), "10.1.1.7/24");
        assert_eq!(intf.network().to_string(), "10.1.1.0/24");
    }

    #[test]
    fn test_prefix_masks_host_bits() {
        let prefix: IpPrefix = "192.168.10.77/16".parse().unwrap();
        assert_eq!(prefix.to_string(), "192.168.0.0/16");

        let v6: IpPrefix = "2001:db8:1::5/48".parse().unwrap();
        assert_eq!(v6.to_string(), "2001:db8:1::/48");
        assert!(!v6.is_ipv4());
    }

    #[test]
    fn test_host_route() {
        let host: IpInterface = "10.0.0.1/32".parse().unwrap();
        assert!(host.network().is_host_route());

        let host_v6: IpInterface = "2001:db8::1/128".parse().unwrap();
        assert!(host_v6.network().is_host_route());

        let lan: IpInterface = "10.0.0.1/31".parse().unwrap();
        assert!(!lan.network().is_host_route());
    }

    #[test]
    fn test_zero_length() {
        let default: IpPrefix = "10.2.3.4/0".parse().unwrap();
        assert_eq!(default.to_string(), "0.0.0.0/0");
    }

    #[test]
    fn test_invalid() {
        assert!("10.0.0.0/33".parse::<IpPrefix>().is_err());
        assert!("2001:db8::/129".parse::<IpInterface>().is_err());
        assert!("10.0.0.1".parse::<IpInterface>().is_err());
        assert!(matches!(
            "10.0.0.300/24".parse::<IpInterface>(),
            Err(ParseError::InvalidIpAddress(_))
        ));
    }
}
