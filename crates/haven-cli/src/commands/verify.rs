//! `haven verify`: check a credential bundle offline.

use clap::Args;
use haven_credentials::{CredentialVerifier, VerificationResult};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Credential bundle JSON (inline or path to file).
    #[arg(short, long)]
    pub credential: String,
}

pub async fn run(args: &VerifyArgs) -> anyhow::Result<()> {
    let signed = super::read_bundle(&args.credential)?;
    let result = CredentialVerifier::offline().verify(&signed).await;
    print_result(&result);

    if !result.valid {
        anyhow::bail!("credential {} failed verification", result.summary.id);
    }
    Ok(())
}

fn print_result(result: &VerificationResult) {
    if result.valid {
        println!("Credential is VALID");
    } else {
        println!("Credential is INVALID");
    }
    println!("  ID:         {}", result.summary.id);
    println!("  Type:       {}", result.summary.credential_type);
    match &result.summary.issuer_name {
        Some(name) => println!("  Issuer:     {} ({})", name, result.summary.issuer),
        None => println!("  Issuer:     {}", result.summary.issuer),
    }
    println!("  Recipient:  {}", result.summary.recipient);
    println!("  Issued:     {}", result.summary.issued.to_rfc3339());
    println!();
    for check in &result.checks {
        println!("{}", check_line(check));
    }
}

fn check_line(check: &haven_credentials::VerificationCheck) -> String {
    let icon = if check.passed { "PASS" } else { "FAIL" };
    match &check.detail {
        Some(detail) => format!("  [{}] {}: {}", icon, check.name, detail),
        None => format!("  [{}] {}", icon, check.name),
    }
}
