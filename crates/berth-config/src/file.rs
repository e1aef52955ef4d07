//! berth config file parsing and validation

use berth_core::error::BerthError;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::ConfigResult;

/// Complete node configuration file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BerthToml {
    pub identity: IdentitySection,
    pub server: ServerSection,
    pub store: StoreSection,
    pub log: LogSection,
}

/// `[identity]`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IdentitySection {
    /// PEM file holding the node's Ed25519 private key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_file: Option<Utf8PathBuf>,
}

/// `[server]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub host: String,
    /// Kept wider than `u16` so out of range values are reported by validation
    pub port: u32,
    /// Base URL clients reach this node at; defaults to `http://{host}:{port}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 3000,
            public_url: None,
        }
    }
}

/// `[store]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreSection {
    pub backend: StoreBackend,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<Utf8PathBuf>,
    /// Staging area for uploads; defaults to `{data_dir}/tmp`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<Utf8PathBuf>,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Filesystem,
            data_dir: default_data_dir(),
            temp_dir: None,
        }
    }
}

/// Storage backend for ledgers and blobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Filesystem,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "filesystem" | "fs" => Ok(StoreBackend::Filesystem),
            other => Err(format!("unknown store backend '{}', expected 'memory' or 'filesystem'", other)),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Memory => f.write_str("memory"),
            StoreBackend::Filesystem => f.write_str("filesystem"),
        }
    }
}

/// `[log]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogSection {
    /// Default filter directive, e.g. `info` or `berth_service=debug`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}', expected 'text' or 'json'", other)),
        }
    }
}

/// `~/.berth`, or `./.berth` without a usable home directory
fn default_data_dir() -> Option<Utf8PathBuf> {
    let home = dirs::home_dir()
        .and_then(|home| Utf8PathBuf::try_from(home).ok())
        .unwrap_or_default();
    Some(home.join(".berth"))
}

/// Parse a config file's contents
pub fn parse_berth_toml(content: &str) -> ConfigResult<BerthToml> {
    let config: BerthToml = toml::from_str(content).map_err(|e| {
        let (line, column) = e
            .span()
            .map(|span| line_col(content, span.start))
            .unwrap_or((0, 0));
        BerthError::TomlParse {
            message: e.message().to_string(),
            line,
            column,
        }
    })?;

    validate_config(&config)?;
    Ok(config)
}

/// Serialize a configuration back to TOML
pub fn serialize_berth_toml(config: &BerthToml) -> ConfigResult<String> {
    toml::to_string_pretty(config).map_err(|e| BerthError::ConfigValidation {
        field: "config".to_string(),
        reason: format!("TOML serialization error: {}", e),
    })
}

/// Load and parse a config file
pub async fn load_from_file(path: &Utf8Path) -> ConfigResult<BerthToml> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| BerthError::io(format!("Failed to read config file {}", path), e))?;

    parse_berth_toml(&content).map_err(|e| match e {
        BerthError::TomlParse {
            message,
            line,
            column,
        } => BerthError::TomlParse {
            message: format!("in {}: {}", path, message),
            line,
            column,
        },
        other => other,
    })
}

/// Validate a fully layered configuration
pub fn validate_config(config: &BerthToml) -> ConfigResult<()> {
    let invalid = |field: &str, reason: String| BerthError::ConfigValidation {
        field: field.to_string(),
        reason,
    };

    if config.server.host.trim().is_empty() {
        return Err(invalid("server.host", "a listen host is required".to_string()));
    }

    if !(1..=65535).contains(&config.server.port) {
        return Err(invalid(
            "server.port",
            format!("{} is outside 1..=65535", config.server.port),
        ));
    }

    if let Some(public_url) = &config.server.public_url {
        let url = Url::parse(public_url).map_err(|e| invalid("server.public_url", format!("'{}': {}", public_url, e)))?;
        if url.cannot_be_a_base() {
            return Err(invalid("server.public_url", format!("'{}' cannot be a base URL", public_url)));
        }
    }

    if config.store.backend == StoreBackend::Filesystem && config.store.data_dir.is_none() {
        return Err(invalid(
            "store.data_dir",
            "a data directory is required for the filesystem backend".to_string(),
        ));
    }

    if config.log.level.trim().is_empty() {
        return Err(invalid("log.level", "a log level is required".to_string()));
    }

    Ok(())
}

/// 1-based line and column of a byte offset
fn line_col(content: &str, offset: usize) -> (usize, usize) {
    let before = &content[..offset.min(content.len())];
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map(|l| l.chars().count()).unwrap_or(0) + 1;
    (line, column)
}
