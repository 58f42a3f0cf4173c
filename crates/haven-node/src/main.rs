//! Haven issuer node: entry point.
//!
//! Starts the issuer node with configuration from a TOML file or defaults.

mod config;
mod node;
mod storage;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::{HavenConfig, LogFormat};
use node::HavenNode;

/// Haven issuer node
#[derive(Parser, Debug)]
#[command(name = "haven-node", version, about = "Haven issuer node")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "haven.toml")]
    config: PathBuf,

    /// Override the issuer identity file.
    #[arg(long)]
    identity_file: Option<PathBuf>,

    /// Override the issuer display name.
    #[arg(long)]
    name: Option<String>,

    /// Override the anchoring batch threshold.
    #[arg(long)]
    batch_threshold: Option<usize>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(config: &HavenConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Handle --init flag
    if args.init {
        let config = HavenConfig::default();
        config.save(&args.config)?;
        println!("wrote default config to {}", args.config.display());
        return Ok(());
    }

    let mut config = HavenConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(path) = args.identity_file {
        config.issuer.identity_file = path;
    }
    if let Some(name) = args.name {
        config.issuer.name = name;
    }
    if let Some(threshold) = args.batch_threshold {
        config.anchor.batch_threshold = threshold;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_tracing(&config);
    tracing::info!("Haven issuer node v{}", env!("CARGO_PKG_VERSION"));

    let mut node = HavenNode::new(config)?;
    node.start();

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!("received shutdown signal");
    };

    tokio::select! {
        result = node.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "node loop error");
            }
        }
        _ = shutdown => {
            tracing::info!("initiating graceful shutdown");
        }
    }

    node.shutdown().await?;
    tracing::info!(
        unanchored = node.queue().pending_len(),
        block_height = node.ledger().block_height(),
        "Haven node exited cleanly"
    );
    Ok(())
}
