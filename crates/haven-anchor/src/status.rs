use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::AnchorError;
use crate::traits::LedgerClient;
use crate::types::{AnchorStatus, Fingerprint};

/// Read-only view of ledger anchor and revocation state.
///
/// Verifiers and wallets depend on this rather than on a full
/// [`LedgerClient`], since they never submit transactions.
#[async_trait]
pub trait AnchorStatusReader: Send + Sync {
    async fn anchor_status(&self, fingerprint: &Fingerprint) -> Result<AnchorStatus, AnchorError>;

    async fn revoked(&self, fingerprint: &Fingerprint) -> Result<bool, AnchorError>;
}

/// [`AnchorStatusReader`] backed by a ledger client, with every lookup
/// bounded by a timeout.
#[derive(Clone)]
pub struct LedgerStatusReader {
    ledger: Arc<dyn LedgerClient>,
    timeout: Duration,
}

impl LedgerStatusReader {
    pub fn new(ledger: Arc<dyn LedgerClient>, timeout: Duration) -> Self {
        Self { ledger, timeout }
    }
}

#[async_trait]
impl AnchorStatusReader for LedgerStatusReader {
    async fn anchor_status(&self, fingerprint: &Fingerprint) -> Result<AnchorStatus, AnchorError> {
        bounded("query_anchored", self.timeout, self.ledger.query_anchored(fingerprint)).await
    }

    async fn revoked(&self, fingerprint: &Fingerprint) -> Result<bool, AnchorError> {
        bounded("query_revoked", self.timeout, self.ledger.query_revoked(fingerprint)).await
    }
}

/// Run a ledger call under `tokio::time::timeout`, mapping expiry to
/// [`AnchorError::LedgerTimeout`].
pub(crate) async fn bounded<T, F>(operation: &str, limit: Duration, call: F) -> Result<T, AnchorError>
where
    F: Future<Output = Result<T, AnchorError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(AnchorError::LedgerTimeout(format!(
            "{} did not complete within {:?}",
            operation, limit
        ))),
    }
}
