//! `haven issue`: sign a credential offline and print the bundle.

use chrono::{TimeDelta, Utc};
use clap::Args;
use haven_identity::{Credential, Identity, SignedCredential};
use std::path::PathBuf;

use super::identity::load_identity;

#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Issuer identity file.
    #[arg(short, long, default_value = "identity.json")]
    pub identity: PathBuf,

    /// Subject DID to issue the credential to.
    #[arg(short, long)]
    pub subject: String,

    /// Semantic credential type, e.g. BirthCertificate.
    #[arg(short = 't', long = "type")]
    pub credential_type: String,

    /// Claims as a JSON object (inline or path to file).
    #[arg(short, long, default_value = "{}")]
    pub claims: String,

    /// Issuer display name.
    #[arg(short, long)]
    pub name: Option<String>,

    /// Expire the credential this many days from now.
    #[arg(long)]
    pub expires_in_days: Option<i64>,

    /// Write the bundle to a file instead of stdout.
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

pub fn run(args: &IssueArgs) -> anyhow::Result<()> {
    let identity = load_identity(&args.identity)?;
    let claims: serde_json::Value = serde_json::from_str(&super::read_json_arg(&args.claims)?)
        .map_err(|e| anyhow::anyhow!("invalid claims JSON: {}", e))?;

    let signed = build_bundle(&identity, args, claims)?;
    let json = serde_json::to_string_pretty(&signed)?;

    match &args.out {
        Some(path) => {
            std::fs::write(path, &json)?;
            println!("Credential issued!");
            println!("  ID:       {}", signed.credential.id);
            println!("  Issuer:   {}", signed.credential.issuer);
            println!("  Subject:  {}", signed.credential.subject());
            println!("  Bundle:   {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn build_bundle(
    identity: &Identity,
    args: &IssueArgs,
    claims: serde_json::Value,
) -> anyhow::Result<SignedCredential> {
    let mut credential = Credential::create(
        identity.identifier(),
        &args.subject,
        args.credential_type.as_str(),
        claims,
    )?;
    if let Some(name) = &args.name {
        credential = credential.with_issuer_name(name.clone());
    }
    if let Some(days) = args.expires_in_days {
        let expiration = TimeDelta::try_days(days)
            .and_then(|delta| Utc::now().checked_add_signed(delta))
            .ok_or_else(|| anyhow::anyhow!("--expires-in-days {} is out of range", days))?;
        credential = credential.with_expiration(expiration);
    }

    let signature = identity.sign(&credential)?;
    tracing::debug!(credential_id = %credential.id, "credential signed");
    Ok(SignedCredential {
        credential,
        signature: signature.to_hex(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_identity::verify_signed;

    fn args(expires_in_days: Option<i64>) -> IssueArgs {
        IssueArgs {
            identity: PathBuf::from("unused.json"),
            subject: "did:key:zRecipient".into(),
            credential_type: "SchoolEnrollment".into(),
            claims: "{}".into(),
            name: Some("Camp School".into()),
            expires_in_days,
            out: None,
        }
    }

    #[test]
    fn test_bundle_verifies() {
        let identity = Identity::generate().unwrap();
        let signed = build_bundle(&identity, &args(Some(30)), serde_json::json!({"grade": 4})).unwrap();
        assert!(verify_signed(&signed).unwrap());
        assert_eq!(signed.credential.issuer_name.as_deref(), Some("Camp School"));
        assert!(signed.credential.expiration_date.is_some());
    }

    #[test]
    fn test_bad_subject_rejected() {
        let identity = Identity::generate().unwrap();
        let mut bad = args(None);
        bad.subject = "alice".into();
        assert!(build_bundle(&identity, &bad, serde_json::json!({})).is_err());
    }

    #[test]
    fn test_out_of_range_expiry_is_error() {
        let identity = Identity::generate().unwrap();
        for days in [i64::MAX, i64::MIN, 1_000_000_000] {
            let err = build_bundle(&identity, &args(Some(days)), serde_json::json!({})).unwrap_err();
            assert!(err.to_string().contains("out of range"));
        }
    }
}
