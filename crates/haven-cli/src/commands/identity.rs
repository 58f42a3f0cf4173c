//! `haven identity`: create or inspect an identity file.

use anyhow::Context;
use clap::{Args, Subcommand};
use haven_identity::Identity;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct IdentityArgs {
    #[command(subcommand)]
    pub action: IdentityAction,
}

#[derive(Subcommand, Debug)]
pub enum IdentityAction {
    /// Generate a new identity and write it to a file.
    New {
        /// Output file for the identity export.
        #[arg(short, long, default_value = "identity.json")]
        out: PathBuf,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Print the DID and public key of an identity file.
    Show {
        /// Identity export file.
        #[arg(short, long, default_value = "identity.json")]
        file: PathBuf,
    },
}

pub fn run(args: &IdentityArgs) -> anyhow::Result<()> {
    match &args.action {
        IdentityAction::New { out, force } => {
            if out.exists() && !force {
                anyhow::bail!("{} already exists; pass --force to overwrite", out.display());
            }
            let identity = Identity::generate()?;
            identity
                .save_to_file(out)
                .with_context(|| format!("writing identity file {}", out.display()))?;
            println!("Identity created:");
            print_identity(&identity);
            println!("  File:        {}", out.display());
        }
        IdentityAction::Show { file } => {
            let identity = load_identity(file)?;
            println!("Identity:");
            print_identity(&identity);
        }
    }
    Ok(())
}

fn print_identity(identity: &Identity) {
    println!("  DID:         {}", identity.identifier());
    println!("  Public key:  {}", identity.public_key().to_hex());
}

pub fn load_identity(path: &Path) -> anyhow::Result<Identity> {
    Identity::load_from_file(path).with_context(|| format!("loading identity file {}", path.display()))
}
