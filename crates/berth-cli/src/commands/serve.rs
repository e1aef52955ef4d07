//! `berth serve`: load configuration, compose the node and run it.

use anyhow::{Context, Result};
use berth_config::{AppConfig, ConfigLayering, ConfigLoader};
use berth_server::{router, serve, shutdown_signal, AppState};
use camino::Utf8PathBuf;
use clap::Args;
use std::collections::HashMap;
use tokio::net::TcpListener;
use tracing::info;

use super::CommandContext;
use crate::{logging, node};

/// Flags override the config file and `BERTH_*` environment variables
#[derive(Args, Debug, Default, Clone)]
pub struct ServeArgs {
    /// Config file; defaults to the user config dir, then ./berth-config.toml
    #[arg(long, short, value_name = "FILE", env = "BERTH_CONFIG")]
    pub config: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long, short)]
    pub port: Option<u16>,

    /// URL clients reach this node at
    #[arg(long, value_name = "URL")]
    pub public_url: Option<String>,

    /// PEM encoded Ed25519 node key
    #[arg(long, value_name = "FILE")]
    pub key_file: Option<String>,

    /// `memory` or `filesystem`
    #[arg(long)]
    pub backend: Option<String>,

    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<String>,

    #[arg(long, value_name = "DIR")]
    pub temp_dir: Option<String>,

    #[arg(long)]
    pub log_level: Option<String>,

    /// `text` or `json`
    #[arg(long)]
    pub log_format: Option<String>,
}

impl ServeArgs {
    /// Flags given on the command line, keyed by dotted config key
    pub fn overrides(&self) -> HashMap<String, String> {
        let flags = [
            ("server.host", self.host.clone()),
            ("server.port", self.port.map(|p| p.to_string())),
            ("server.public_url", self.public_url.clone()),
            ("identity.key_file", self.key_file.clone()),
            ("store.backend", self.backend.clone()),
            ("store.data_dir", self.data_dir.clone()),
            ("store.temp_dir", self.temp_dir.clone()),
            ("log.level", self.log_level.clone()),
            ("log.format", self.log_format.clone()),
        ];
        flags
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
            .collect()
    }
}

/// Layer defaults, file, environment and flags into resolved settings
pub async fn load_config(
    args: &ServeArgs,
    loader: &ConfigLoader,
    env: &HashMap<String, String>,
) -> Result<AppConfig> {
    let explicit = args.config.as_deref().map(Utf8PathBuf::from);
    let (file, source) = loader.load(explicit.as_deref()).await?;
    let merged = ConfigLayering::merge_configs(file, env, &args.overrides())?;
    let config = AppConfig::resolve(&merged)?;
    info!(source = ?source, "configuration loaded");
    Ok(config)
}

pub async fn execute(args: ServeArgs, ctx: &CommandContext) -> Result<()> {
    let loader = ConfigLoader::new(ctx.cwd.clone());
    let env = ConfigLayering::collect_env_overrides();
    let config = load_config(&args, &loader, &env).await?;
    logging::init(&config.log)?;

    let service = node::compose(&config).await?;
    let did = service.signer().did().clone();
    let app = router(AppState::new(service));

    let address = config.listen_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {}", address))?;

    ctx.output.step("berth", &format!("v{}", env!("CARGO_PKG_VERSION")));
    ctx.output.step("id", did.as_str());
    ctx.output.step("listening", &address);
    ctx.output.step("public", config.server.public_url.as_str());

    serve(listener, app, shutdown_signal()).await?;
    Ok(())
}
