use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use haven_identity::Fingerprint;

/// Ledger transaction identifier, as returned by the ledger client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(String);

impl TransactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of waiting for a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confirmation {
    /// Included in a block.
    Confirmed { block_height: u64 },
    /// Not confirmed within the allotted time. The transaction may still land.
    TimedOut,
    /// Dropped or reverted by the ledger.
    Rejected { reason: String },
}

/// Read-only anchor lookup result.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnchorStatus {
    pub anchored: bool,
    /// When the fingerprint was anchored, if it is.
    pub timestamp: Option<DateTime<Utc>>,
}

/// Proof that a credential fingerprint was confirmed on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnchorRecord {
    pub fingerprint: Fingerprint,
    pub credential_id: String,
    pub transaction_id: TransactionId,
    pub block_height: u64,
    pub timestamp: DateTime<Utc>,
}

/// Proof that a revocation of a fingerprint was confirmed on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationRecord {
    pub fingerprint: Fingerprint,
    pub credential_id: String,
    pub transaction_id: TransactionId,
    pub block_height: u64,
    pub timestamp: DateTime<Utc>,
}
