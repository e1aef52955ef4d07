//! Configuration for berth nodes
//!
//! This crate handles parsing and validation of the node's TOML config file
//! and layers it with `BERTH_*` environment variables and command line
//! flags before resolving it into the concrete settings the node runs with.

pub mod app;
pub mod file;
pub mod merge;

// Re-export main types
pub use app::{AppConfig, IdentityConfig, LogConfig, ServerConfig, StoreConfig};
pub use file::{BerthToml, IdentitySection, LogFormat, LogSection, ServerSection, StoreBackend, StoreSection};
pub use merge::{ConfigLayering, ConfigLoader, ConfigSource};

use berth_core::error::BerthError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, BerthError>;
