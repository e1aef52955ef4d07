//! `berth identity`: create and inspect node keys.

use anyhow::{bail, Context, Result};
use berth_ucan::Signer;
use camino::Utf8Path;
use clap::Subcommand;
use tracing::info;

use super::CommandContext;

#[derive(Subcommand, Debug)]
pub enum IdentityCommand {
    /// Generate a new Ed25519 key and write it as PEM
    Generate {
        /// Key file to write
        #[arg(long, short, value_name = "FILE")]
        out: String,
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the DID of an existing key file
    Show {
        #[arg(long, value_name = "FILE", env = "BERTH_IDENTITY_KEY_FILE")]
        key_file: String,
    },
}

pub async fn execute(command: IdentityCommand, ctx: &CommandContext) -> Result<()> {
    match command {
        IdentityCommand::Generate { out, force } => {
            let path = ctx.cwd.join(out);
            let signer = generate(&path, force)?;
            ctx.output.success(&format!("Wrote {}", path));
            ctx.output.step("id", signer.did().as_str());
            Ok(())
        },
        IdentityCommand::Show { key_file } => {
            let path = ctx.cwd.join(key_file);
            let signer = Signer::load(&path).with_context(|| format!("loading {}", path))?;
            println!("{}", signer.did());
            Ok(())
        },
    }
}

/// Create a key at `path`, refusing to clobber one unless `force` is set
pub fn generate(path: &Utf8Path, force: bool) -> Result<Signer> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to replace it", path);
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent))?;
    }

    let signer = Signer::generate()?;
    signer.save(path)?;
    info!(did = %signer.did(), path = %path, "generated node identity");
    Ok(signer)
}
