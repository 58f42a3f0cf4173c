//! Haven CLI: offline tooling for identities and credentials.
//!
//! Subcommands: identity, issue, verify, score.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Haven: self-sovereign identity tools.
#[derive(Parser, Debug)]
#[command(name = "haven", version, about, long_about = None)]
struct Cli {
    /// Log level for diagnostics on stderr.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create or inspect an identity file.
    Identity(commands::identity::IdentityArgs),
    /// Sign a credential with an identity file and print the bundle.
    Issue(commands::issue::IssueArgs),
    /// Check a credential bundle's signature and expiration.
    Verify(commands::verify::VerifyArgs),
    /// Compute the trust score of a set of credential bundles.
    Score(commands::score::ScoreArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Identity(args) => commands::identity::run(args),
        Commands::Issue(args) => commands::issue::run(args),
        Commands::Verify(args) => commands::verify::run(args).await,
        Commands::Score(args) => commands::score::run(args),
    }
}
