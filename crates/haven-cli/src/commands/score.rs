//! `haven score`: trust score of a set of credential bundles.

use anyhow::Context;
use chrono::Utc;
use clap::Args;
use haven_core::TrustPolicy;
use haven_identity::{verify_signed, Credential, ScoreBreakdown, SignedCredential, TrustScorer};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Credential bundles (inline JSON or paths to files).
    #[arg(required = true)]
    pub credentials: Vec<String>,

    /// Score bundles whose signature does not verify instead of skipping them.
    #[arg(long)]
    pub include_unverified: bool,

    /// Node config file whose `[trust]` table sets the scoring policy.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

/// The part of the node config file that scoring reads.
#[derive(Debug, Default, Deserialize)]
struct ScoringConfig {
    #[serde(default)]
    trust: TrustPolicy,
}

/// Policy from the `[trust]` table of `path`, or the default policy.
fn load_policy(path: Option<&Path>) -> anyhow::Result<TrustPolicy> {
    let Some(path) = path else {
        return Ok(TrustPolicy::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let config: ScoringConfig = toml::from_str(&contents)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    if config.trust.days_per_month == 0 {
        anyhow::bail!("trust.days_per_month must be at least 1");
    }
    Ok(config.trust)
}

pub fn run(args: &ScoreArgs) -> anyhow::Result<()> {
    let policy = load_policy(args.config.as_deref())?;
    let bundles = args
        .credentials
        .iter()
        .map(|arg| super::read_bundle(arg))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let (accepted, skipped) = select(bundles, args.include_unverified);
    for id in &skipped {
        println!("  skipped {} (signature does not verify)", id);
    }

    let breakdown = TrustScorer::new(policy).breakdown(&accepted, Utc::now());
    print_breakdown(&breakdown, accepted.len());
    Ok(())
}

/// Split bundles into credentials to score and IDs of rejected bundles.
fn select(bundles: Vec<SignedCredential>, include_unverified: bool) -> (Vec<Credential>, Vec<String>) {
    let mut accepted = Vec::new();
    let mut skipped = Vec::new();
    for bundle in bundles {
        let ok = include_unverified || verify_signed(&bundle).unwrap_or(false);
        if ok {
            accepted.push(bundle.credential);
        } else {
            skipped.push(bundle.credential.id);
        }
    }
    (accepted, skipped)
}

fn print_breakdown(breakdown: &ScoreBreakdown, count: usize) {
    println!("Trust score: {}", breakdown.total);
    println!("  Credentials:       {}", count);
    println!("  Base weight:       {:.2}", breakdown.base);
    println!("  Age bonus:         {:.2}", breakdown.age_bonus);
    println!(
        "  Issuer diversity:  {:.2} ({} issuers)",
        breakdown.diversity_bonus, breakdown.distinct_issuers
    );
}
