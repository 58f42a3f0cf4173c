pub mod identity;
pub mod issue;
pub mod score;
pub mod verify;

use anyhow::Context;
use haven_identity::SignedCredential;
use std::path::Path;

/// Read JSON given either inline or as a path to a file.
pub fn read_json_arg(arg: &str) -> anyhow::Result<String> {
    if Path::new(arg).exists() {
        std::fs::read_to_string(arg).with_context(|| format!("reading {}", arg))
    } else {
        Ok(arg.to_string())
    }
}

pub fn read_bundle(arg: &str) -> anyhow::Result<SignedCredential> {
    let json = read_json_arg(arg)?;
    serde_json::from_str(&json).map_err(|e| anyhow::anyhow!("invalid credential bundle: {}", e))
}
