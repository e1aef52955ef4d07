//! Command implementations and dispatch logic.

use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use tracing::info;

pub mod identity;
pub mod serve;


use crate::output::OutputHandler;
use crate::Commands;

/// Shared context for all commands
pub struct CommandContext {
    pub cwd: Utf8PathBuf,
    pub output: OutputHandler,
}

impl CommandContext {
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get current directory")?;
        let cwd = Utf8PathBuf::try_from(cwd).context("Current directory is not valid UTF-8")?;
        Ok(Self {
            cwd,
            output: OutputHandler::new(),
        })
    }
}

/// Dispatch a command to its handler
pub async fn dispatch_command(command: Commands, ctx: &CommandContext) -> Result<()> {
    match command {
        Commands::Serve(args) => serve::execute(args, ctx).await,
        Commands::Identity { command } => identity::execute(command, ctx).await,
        Commands::Version => {
            info!("Showing version information");
            show_version(ctx);
            Ok(())
        },
    }
}

fn show_version(ctx: &CommandContext) {
    ctx.output.info(&format!("berth v{}", env!("CARGO_PKG_VERSION")));
    ctx.output.info(&format!("Built: {}", env!("BUILD_DATE")));
    ctx.output.info(&format!("Rust: {}", env!("RUSTC_VERSION")));
    ctx.output.info(&format!("Repository: {}", berth_server::REPOSITORY));
}
