//! Configuration file support for netsync
//!
//! Loads and validates netsync configuration from TOML files.
//! Default location: /etc/netsync/netsync.toml

use crate::error::{NetsyncError, Result};
use netsync_collect::{CollectSettings, ImportSettings};
use netsync_core::{Registry, SyncFlags};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "/etc/netsync/netsync.toml";

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Diff and apply behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Keep applying after a failed record
    #[serde(default = "default_continue_on_failure")]
    pub continue_on_failure: bool,

    /// Never delete target records missing from the source
    #[serde(default)]
    pub skip_unmatched_dst: bool,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level; `RUST_LOG` takes precedence
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of text
    #[serde(default)]
    pub json: bool,
}

/// Complete netsync configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetsyncConfig {
    #[serde(default)]
    pub sync: SyncConfig,

    /// What to import from the live network
    #[serde(default)]
    pub import: ImportSettings,

    /// Collection worker pool
    #[serde(default)]
    pub collect: CollectSettings,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_continue_on_failure() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            continue_on_failure: default_continue_on_failure(),
            skip_unmatched_dst: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl SyncConfig {
    pub fn flags(&self) -> SyncFlags {
        SyncFlags::new()
            .with_continue_on_failure(self.continue_on_failure)
            .with_skip_unmatched_dst(self.skip_unmatched_dst)
    }
}

impl NetsyncConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => {
                let config = toml::from_str(&content).map_err(|e| {
                    NetsyncError::config(format!(
                        "Failed to parse config file {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                eprintln!(
                    "netsync: Config file {} not found, using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(NetsyncError::Io(e)),
        }
    }

    /// Load from default location or defaults
    pub fn load() -> Result<Self> {
        Self::load_or_default(DEFAULT_CONFIG_PATH)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| NetsyncError::config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Per-device collection timeout
    pub fn device_timeout(&self) -> Duration {
        self.collect.device_timeout()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.collect.max_workers == 0 {
            return Err(NetsyncError::config("max_workers must be > 0"));
        }

        if self.collect.device_timeout_secs == 0 {
            return Err(NetsyncError::config("device_timeout_secs must be > 0"));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(NetsyncError::config(format!(
                "logging level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }

        if !self.import.top_level.is_empty() {
            Registry::network()
                .with_top_level(self.import.top_level.as_slice())
                .map_err(|e| NetsyncError::config(format!("import.top_level: {}", e)))?;
        }

        Ok(())
    }
}
