//! Tracing subscriber setup.

use anyhow::{anyhow, Context, Result};
use berth_config::{LogConfig, LogFormat};
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` when set, otherwise the configured level
pub fn filter(level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(level).with_context(|| format!("invalid log level '{}'", level)),
    }
}

/// Install the global subscriber
pub fn init(config: &LogConfig) -> Result<()> {
    let filter = filter(&config.level)?;
    let installed = match config.format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(false)
            .try_init(),
    };
    installed.map_err(|e| anyhow!("failed to install log subscriber: {}", e))
}
