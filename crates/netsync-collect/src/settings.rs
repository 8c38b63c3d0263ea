//! Import and collection settings.
//!
//! Both structs deserialize from the `[import]` and `[collect]` tables of
//! the daemon config; every field has a default.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where cabling information comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CablingStrategy {
    /// Do not import cables.
    #[default]
    None,
    /// Neighbor tables (LLDP/CDP) reported by each device.
    CliNeighborProtocol,
    /// Links exported by an external topology tool.
    ExternalTopologyTool,
}

impl fmt::Display for CablingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CablingStrategy::None => "none",
            CablingStrategy::CliNeighborProtocol => "cli-neighbor-protocol",
            CablingStrategy::ExternalTopologyTool => "external-topology-tool",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for CablingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "no" => Ok(CablingStrategy::None),
            "cli-neighbor-protocol" | "lldp" | "cdp" => Ok(CablingStrategy::CliNeighborProtocol),
            "external-topology-tool" => Ok(CablingStrategy::ExternalTopologyTool),
            other => Err(format!("unknown cabling strategy '{}'", other)),
        }
    }
}

/// Mode given to an interface that carries tagged VLANs but reports no mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModePolicy {
    #[default]
    L3SubVlan,
    Access,
    None,
}

impl ModePolicy {
    pub fn mode(&self) -> &'static str {
        match self {
            ModePolicy::L3SubVlan => "L3_SUB_VLAN",
            ModePolicy::Access => "ACCESS",
            ModePolicy::None => "NONE",
        }
    }
}

/// What to import from the live network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    pub cabling: CablingStrategy,
    pub vlans: bool,
    pub prefixes: bool,
    /// Use the collected interface status instead of `active`.
    pub intf_status: bool,
    /// Kinds loaded and diffed first; empty keeps the registry default.
    pub top_level: Vec<String>,
    pub tagged_without_mode: ModePolicy,
    /// Domain suffix stripped from neighbor hostnames.
    pub fqdn: Option<String>,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            cabling: CablingStrategy::None,
            vlans: true,
            prefixes: true,
            intf_status: true,
            top_level: Vec::new(),
            tagged_without_mode: ModePolicy::L3SubVlan,
            fqdn: None,
        }
    }
}

impl ImportSettings {
    /// Derives what each device collector must gather.
    pub fn plan(&self) -> CollectionPlan {
        CollectionPlan {
            vlans: self.vlans,
            neighbors: self.cabling == CablingStrategy::CliNeighborProtocol,
            topology: self.cabling == CablingStrategy::ExternalTopologyTool,
        }
    }
}

/// Worker pool sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectSettings {
    pub max_workers: usize,
    pub device_timeout_secs: u64,
}

impl Default for CollectSettings {
    fn default() -> Self {
        Self {
            max_workers: 10,
            device_timeout_secs: 60,
        }
    }
}

impl CollectSettings {
    pub fn device_timeout(&self) -> Duration {
        Duration::from_secs(self.device_timeout_secs)
    }
}

/// Per-device collection work derived from [`ImportSettings`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionPlan {
    pub vlans: bool,
    /// Gather neighbor tables for cabling.
    pub neighbors: bool,
    /// Fetch links from the external topology source.
    pub topology: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_plan_follows_cabling_strategy() {
        let mut settings = ImportSettings::default();
        assert_eq!(
            settings.plan(),
            CollectionPlan {
                vlans: true,
                neighbors: false,
                topology: false
            }
        );

        settings.cabling = CablingStrategy::CliNeighborProtocol;
        settings.vlans = false;
        let plan = settings.plan();
        assert!(plan.neighbors && !plan.topology && !plan.vlans);

        settings.cabling = CablingStrategy::ExternalTopologyTool;
        assert!(settings.plan().topology);
    }

    #[test]
    fn test_cabling_strategy_parse() {
        assert_eq!("lldp".parse::<CablingStrategy>(), Ok(CablingStrategy::CliNeighborProtocol));
        assert_eq!("none".parse::<CablingStrategy>(), Ok(CablingStrategy::None));
        assert!("batfish".parse::<CablingStrategy>().is_err());
        assert_eq!(
            CablingStrategy::ExternalTopologyTool.to_string(),
            "external-topology-tool"
        );
    }

    #[test]
    fn test_mode_policy_values() {
        assert_eq!(ModePolicy::default().mode(), "L3_SUB_VLAN");
        assert_eq!(ModePolicy::Access.mode(), "ACCESS");
    }
}
