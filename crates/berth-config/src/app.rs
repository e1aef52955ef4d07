//! Resolved node settings.
//!
//! `AppConfig` is what the node is assembled from: every default applied,
//! URLs parsed and store directories laid out.

use berth_core::error::BerthError;
use camino::Utf8PathBuf;
use url::Url;

use crate::file::{self, BerthToml, LogFormat, StoreBackend};
use crate::ConfigResult;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub identity: IdentityConfig,
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentityConfig {
    pub key_file: Utf8PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub public_url: Url,
}

/// Where ledgers and blobs live
#[derive(Debug, Clone, PartialEq)]
pub enum StoreConfig {
    Memory,
    Filesystem {
        data_dir: Utf8PathBuf,
        temp_dir: Utf8PathBuf,
        blobs_dir: Utf8PathBuf,
        /// Upload staging area, under the temp dir
        blobs_tmp_dir: Utf8PathBuf,
        allocations_dir: Utf8PathBuf,
        acceptances_dir: Utf8PathBuf,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl AppConfig {
    /// Validate a layered configuration and resolve it
    pub fn resolve(config: &BerthToml) -> ConfigResult<Self> {
        file::validate_config(config)?;

        let key_file = config
            .identity
            .key_file
            .clone()
            .ok_or_else(|| BerthError::ConfigValidation {
                field: "identity.key_file".to_string(),
                reason: "a PEM key file is required; create one with `berth identity generate`".to_string(),
            })?;

        let port = u16::try_from(config.server.port).map_err(|_| BerthError::ConfigValidation {
            field: "server.port".to_string(),
            reason: format!("{} is outside 1..=65535", config.server.port),
        })?;

        let public_url = match &config.server.public_url {
            Some(url) => url.clone(),
            None => format!("http://{}:{}", config.server.host, port),
        };
        let public_url = Url::parse(&public_url).map_err(|e| BerthError::ConfigValidation {
            field: "server.public_url".to_string(),
            reason: format!("'{}': {}", public_url, e),
        })?;

        let store = match config.store.backend {
            StoreBackend::Memory => StoreConfig::Memory,
            StoreBackend::Filesystem => {
                let data_dir = config
                    .store
                    .data_dir
                    .clone()
                    .ok_or_else(|| BerthError::ConfigValidation {
                        field: "store.data_dir".to_string(),
                        reason: "a data directory is required for the filesystem backend".to_string(),
                    })?;
                let temp_dir = config
                    .store
                    .temp_dir
                    .clone()
                    .unwrap_or_else(|| data_dir.join("tmp"));
                StoreConfig::Filesystem {
                    blobs_dir: data_dir.join("blobs"),
                    blobs_tmp_dir: temp_dir.join("storage"),
                    allocations_dir: data_dir.join("allocation"),
                    acceptances_dir: data_dir.join("acceptance"),
                    data_dir,
                    temp_dir,
                }
            },
        };

        Ok(Self {
            identity: IdentityConfig { key_file },
            server: ServerConfig {
                host: config.server.host.clone(),
                port,
                public_url,
            },
            store,
            log: LogConfig {
                level: config.log.level.clone(),
                format: config.log.format,
            },
        })
    }

    /// `host:port` to bind
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::parse_berth_toml;

    #[test]
    fn test_resolve_filesystem_layout() {
        let config = parse_berth_toml(
            r#"
[identity]
key_file = "node.pem"

[server]
host = "127.0.0.1"
port = 4000

[store]
data_dir = "/data"
"#,
        )
        .unwrap();

        let app = AppConfig::resolve(&config).unwrap();
        assert_eq!(app.identity.key_file, Utf8PathBuf::from("node.pem"));
        assert_eq!(app.server.public_url.as_str(), "http://127.0.0.1:4000/");
        assert_eq!(app.listen_address(), "127.0.0.1:4000");

        match app.store {
            StoreConfig::Filesystem {
                blobs_dir,
                blobs_tmp_dir,
                allocations_dir,
                acceptances_dir,
                temp_dir,
                ..
            } => {
                assert_eq!(blobs_dir, "/data/blobs");
                assert_eq!(temp_dir, "/data/tmp");
                assert_eq!(blobs_tmp_dir, "/data/tmp/storage");
                assert_eq!(allocations_dir, "/data/allocation");
                assert_eq!(acceptances_dir, "/data/acceptance");
            },
            other => panic!("expected filesystem store, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_memory_with_public_url() {
        let config = parse_berth_toml(
            r#"
[identity]
key_file = "node.pem"

[server]
public_url = "https://node.example.com/prefix"

[store]
backend = "memory"
"#,
        )
        .unwrap();

        let app = AppConfig::resolve(&config).unwrap();
        assert_eq!(app.store, StoreConfig::Memory);
        assert_eq!(app.server.public_url.as_str(), "https://node.example.com/prefix");
    }

    #[test]
    fn test_key_file_required() {
        let config = parse_berth_toml("[store]\nbackend = \"memory\"\n").unwrap();
        match AppConfig::resolve(&config).unwrap_err() {
            BerthError::ConfigValidation { field, .. } => assert_eq!(field, "identity.key_file"),
            other => panic!("unexpected error {:?}", other),
        }
    }
}
