use async_trait::async_trait;
use std::time::Duration;

use crate::error::AnchorError;
use crate::types::{AnchorStatus, Confirmation, Fingerprint, TransactionId};

/// Ledger client interface.
///
/// Each implementation bridges Haven to a concrete append-only ledger
/// (an EVM anchoring contract, a test chain, an in-memory ledger). It is the
/// only component that talks to the ledger node.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit a single fingerprint for anchoring.
    async fn submit_anchor(&self, fingerprint: &Fingerprint) -> Result<TransactionId, AnchorError>;

    /// Submit several fingerprints as one anchoring transaction.
    async fn submit_anchor_batch(
        &self,
        fingerprints: &[Fingerprint],
    ) -> Result<TransactionId, AnchorError>;

    /// Wait up to `timeout` for a submitted transaction to be confirmed.
    async fn await_confirmation(
        &self,
        tx: &TransactionId,
        timeout: Duration,
    ) -> Result<Confirmation, AnchorError>;

    /// Look up whether a fingerprint is anchored.
    async fn query_anchored(&self, fingerprint: &Fingerprint) -> Result<AnchorStatus, AnchorError>;

    /// Submit a revocation for a fingerprint.
    async fn submit_revoke(&self, fingerprint: &Fingerprint) -> Result<TransactionId, AnchorError>;

    /// Look up whether a fingerprint is revoked.
    async fn query_revoked(&self, fingerprint: &Fingerprint) -> Result<bool, AnchorError>;

    /// Return the unique identifier of this client (e.g. "ledger-memory").
    fn ledger_id(&self) -> &str;
}
