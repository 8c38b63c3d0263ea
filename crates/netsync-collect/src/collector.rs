//! Collector traits and the file-backed implementations.

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use crate::error::{CollectError, CollectResult};
use crate::facts::{DeviceFacts, InventoryDevice, TopologyLink};
use crate::settings::CollectionPlan;

/// Gathers facts from one device.
///
/// A device that cannot be contacted should return
/// [`DeviceFacts::unreachable`] rather than an error; errors are reserved for
/// devices that answered with something unusable.
#[async_trait]
pub trait DeviceCollector: Send + Sync {
    async fn collect(&self, device: &InventoryDevice, plan: &CollectionPlan) -> CollectResult<DeviceFacts>;
}

/// Supplies links from an external topology tool.
#[async_trait]
pub trait TopologySource: Send + Sync {
    async fn links(&self) -> CollectResult<Vec<TopologyLink>>;
}

/// Reads `<dir>/<device>.json` for each device.
///
/// A missing file means the device is unreachable. Parts of the facts not
/// requested by the plan are dropped.
#[derive(Debug, Clone)]
pub struct FileCollector {
    dir: PathBuf,
}

impl FileCollector {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Facts file of `device`; names that would leave `dir` are refused.
    fn path_for(&self, device: &str) -> CollectResult<PathBuf> {
        let mut components = Path::new(device).components();
        let plain = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !plain || device.contains(|c: char| c == '/' || c == '\\') {
            return Err(CollectError::invalid_facts(device, "device name is not a plain file name"));
        }
        Ok(self.dir.join(format!("{}.json", device)))
    }
}

#[async_trait]
impl DeviceCollector for FileCollector {
    async fn collect(&self, device: &InventoryDevice, plan: &CollectionPlan) -> CollectResult<DeviceFacts> {
        let path = self.path_for(&device.name)?;
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(device = %device.name, path = %path.display(), "No facts file");
                return Ok(DeviceFacts::unreachable());
            }
            Err(e) => return Err(CollectError::io(path, e)),
        };

        let mut facts: DeviceFacts = serde_json::from_str(&text)
            .map_err(|e| CollectError::invalid_facts(&device.name, e.to_string()))?;
        if !plan.vlans {
            facts.vlans.clear();
        }
        if !plan.neighbors {
            facts.neighbors.clear();
        }
        Ok(facts)
    }
}

/// Reads a JSON array of [`TopologyLink`] from one file.
#[derive(Debug, Clone)]
pub struct FileTopology {
    path: PathBuf,
}

impl FileTopology {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TopologySource for FileTopology {
    async fn links(&self) -> CollectResult<Vec<TopologyLink>> {
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| CollectError::io(&self.path, e))?;
        serde_json::from_str(&text).map_err(|source| CollectError::Json {
            path: self.path.clone(),
            source,
        })
    }
}
