//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config_file::LoggingConfig;
use crate::error::{NetsyncError, Result};

/// Builds the level filter; `RUST_LOG` overrides the configured level.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level.to_ascii_lowercase()))
}

/// Initializes the global tracing subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let builder = FmtSubscriber::builder()
        .with_env_filter(env_filter(config))
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = if config.json {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.compact().finish())
    };
    installed.map_err(|e| NetsyncError::config(format!("Failed to set tracing subscriber: {}", e)))
}
