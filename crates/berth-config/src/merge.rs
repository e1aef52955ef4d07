//! Configuration file discovery, environment overrides and flag overrides

use berth_core::error::BerthError;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::HashMap;
use tracing::{debug, info};

use crate::file::{self, BerthToml};
use crate::ConfigResult;

/// File name looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "berth-config.toml";

/// Prefix of environment variables that override config keys
pub const ENV_PREFIX: &str = "BERTH_";

/// Environment variables and the config keys they override
const ENV_KEYS: &[(&str, &str)] = &[
    ("BERTH_IDENTITY_KEY_FILE", "identity.key_file"),
    ("BERTH_SERVER_HOST", "server.host"),
    ("BERTH_SERVER_PORT", "server.port"),
    ("BERTH_SERVER_PUBLIC_URL", "server.public_url"),
    ("BERTH_STORE_BACKEND", "store.backend"),
    ("BERTH_STORE_DATA_DIR", "store.data_dir"),
    ("BERTH_STORE_TEMP_DIR", "store.temp_dir"),
    ("BERTH_LOG_LEVEL", "log.level"),
    ("BERTH_LOG_FORMAT", "log.format"),
];

/// Where the file layer of a configuration came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Path given on the command line
    Explicit(Utf8PathBuf),
    /// `$XDG_CONFIG_HOME/berth/config.toml` or platform equivalent
    User(Utf8PathBuf),
    /// `./berth-config.toml`
    Local(Utf8PathBuf),
    /// No file; built-in defaults only
    Defaults,
}

/// Finds and loads the config file layer
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
    /// Per-user config directory, if the platform has one
    user_config_dir: Option<Utf8PathBuf>,
}

impl ConfigLoader {
    /// Create a loader looking in `cwd` and the platform config directory
    pub fn new(cwd: Utf8PathBuf) -> Self {
        let user_config_dir = dirs::config_dir().and_then(|dir| Utf8PathBuf::try_from(dir).ok());
        Self { cwd, user_config_dir }
    }

    /// Override the per-user config directory
    pub fn with_user_config_dir(mut self, dir: Option<Utf8PathBuf>) -> Self {
        self.user_config_dir = dir;
        self
    }

    /// Load the file layer: an explicit path must exist, otherwise the user
    /// config file, then `./berth-config.toml`, then defaults
    pub async fn load(&self, explicit: Option<&Utf8Path>) -> ConfigResult<(BerthToml, ConfigSource)> {
        if let Some(path) = explicit {
            let path = self.cwd.join(path);
            if !path.is_file() {
                return Err(BerthError::ConfigValidation {
                    field: "config".to_string(),
                    reason: format!("config file {} does not exist", path),
                });
            }
            let config = file::load_from_file(&path).await?;
            return Ok((config, ConfigSource::Explicit(path)));
        }

        if let Some(path) = self.user_config_path() {
            if path.is_file() {
                info!("loading config automatically from {}", path);
                let config = file::load_from_file(&path).await?;
                return Ok((config, ConfigSource::User(path)));
            }
            debug!("no user config file at {}", path);
        }

        let local = self.cwd.join(LOCAL_CONFIG_FILE);
        if local.is_file() {
            let config = file::load_from_file(&local).await?;
            return Ok((config, ConfigSource::Local(local)));
        }

        Ok((BerthToml::default(), ConfigSource::Defaults))
    }

    /// `{config dir}/berth/config.toml`
    pub fn user_config_path(&self) -> Option<Utf8PathBuf> {
        self.user_config_dir
            .as_ref()
            .map(|dir| dir.join("berth").join("config.toml"))
    }
}

/// Applies environment and command line layers on top of the file layer
pub struct ConfigLayering;

impl ConfigLayering {
    /// Layer overrides onto `config` (env first, flags last) and validate the result
    pub fn merge_configs(
        config: BerthToml,
        env_overrides: &HashMap<String, String>,
        cli_overrides: &HashMap<String, String>,
    ) -> ConfigResult<BerthToml> {
        let mut merged = config;
        Self::apply_env_overrides(&mut merged, env_overrides)?;
        Self::apply_cli_overrides(&mut merged, cli_overrides)?;
        file::validate_config(&merged)?;
        Ok(merged)
    }

    /// Apply `BERTH_*` variables; unknown ones are ignored
    pub fn apply_env_overrides(config: &mut BerthToml, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        for (var, key) in ENV_KEYS {
            if let Some(value) = overrides.get(*var) {
                set_key(config, key, value).map_err(|reason| BerthError::ConfigValidation {
                    field: key.to_string(),
                    reason: format!("{} (from {})", reason, var),
                })?;
            }
        }
        Ok(())
    }

    /// Apply flag overrides keyed by dotted config key, e.g. `server.port`
    pub fn apply_cli_overrides(config: &mut BerthToml, overrides: &HashMap<String, String>) -> ConfigResult<()> {
        let mut keys: Vec<_> = overrides.keys().collect();
        keys.sort();
        for key in keys {
            set_key(config, key, &overrides[key]).map_err(|reason| BerthError::ConfigValidation {
                field: key.clone(),
                reason,
            })?;
        }
        Ok(())
    }

    /// Collect `BERTH_*` variables from the process environment
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with(ENV_PREFIX))
            .collect()
    }
}

fn set_key(config: &mut BerthToml, key: &str, value: &str) -> Result<(), String> {
    match key {
        "identity.key_file" => config.identity.key_file = Some(Utf8PathBuf::from(value)),
        "server.host" => config.server.host = value.to_string(),
        "server.port" => {
            config.server.port = value
                .parse()
                .map_err(|e| format!("invalid port '{}': {}", value, e))?;
        },
        "server.public_url" => config.server.public_url = Some(value.to_string()),
        "store.backend" => config.store.backend = value.parse()?,
        "store.data_dir" => config.store.data_dir = Some(Utf8PathBuf::from(value)),
        "store.temp_dir" => config.store.temp_dir = Some(Utf8PathBuf::from(value)),
        "log.level" => config.log.level = value.to_string(),
        "log.format" => config.log.format = value.parse()?,
        other => return Err(format!("unknown configuration key '{}'", other)),
    }
    Ok(())
}
