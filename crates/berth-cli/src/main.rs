//! # berth-cli
//!
//! The `berth` storage node binary.
//!
//! Parses the command line, installs the panic hook and dispatches to the
//! command handlers. Logging is set up by each command once it knows the
//! configured level and format.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::error;

mod commands;
mod logging;
mod node;
mod output;

use commands::identity::IdentityCommand;
use commands::serve::ServeArgs;
use commands::CommandContext;

/// Storage node for content-addressed blobs
#[derive(Parser, Debug)]
#[command(name = "berth", version, about = "Storage node for content-addressed blobs")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the node's HTTP server
    Serve(ServeArgs),
    /// Manage the node identity
    Identity {
        #[command(subcommand)]
        command: IdentityCommand,
    },
    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_panic_handler();

    let ctx = match CommandContext::new() {
        Ok(ctx) => ctx,
        Err(err) => {
            eprintln!("error: {:#}", err);
            return ExitCode::FAILURE;
        },
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            ctx.output.error(&format!("Failed to create async runtime: {}", err));
            return ExitCode::FAILURE;
        },
    };

    match runtime.block_on(commands::dispatch_command(cli.command, &ctx)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", output::errors::ErrorFormatter::new().format_anyhow(&err));
            ExitCode::FAILURE
        },
    }
}

fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|panic_info| {
        error!("berth encountered an unexpected error: {}", panic_info);
        eprintln!("berth crashed! This is a bug.");
        eprintln!("Please report this at: {}/issues", env!("CARGO_PKG_REPOSITORY"));
        eprintln!("Error: {}", panic_info);
    }));
}
