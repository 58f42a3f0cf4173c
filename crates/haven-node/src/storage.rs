//! Issuer identity persistence.

use anyhow::{Context, Result};
use haven_identity::Identity;
use std::path::Path;

/// Load the issuer identity from `path`, or generate one and write it there.
pub fn load_or_create_identity(path: &Path) -> Result<Identity> {
    if path.exists() {
        let identity = Identity::load_from_file(path)
            .with_context(|| format!("loading issuer identity {}", path.display()))?;
        tracing::info!(did = %identity.identifier(), path = %path.display(), "loaded issuer identity");
        return Ok(identity);
    }

    let identity = Identity::generate()?;
    identity
        .save_to_file(path)
        .with_context(|| format!("writing issuer identity {}", path.display()))?;
    tracing::info!(did = %identity.identifier(), path = %path.display(), "created issuer identity");
    Ok(identity)
}
