use haven_core::CoreError;
use haven_identity::IdentityError;

/// Anchoring-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum AnchorError {
    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("ledger call timed out: {0}")]
    LedgerTimeout(String),

    #[error("ledger rejected transaction: {0}")]
    LedgerRejected(String),

    #[error("pending queue changed under an in-flight flush: {0}")]
    QueueFlushConflict(String),

    #[error("invalid anchor state: {0}")]
    InvalidState(#[from] CoreError),

    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),
}

impl AnchorError {
    /// Ledger faults that a later retry may resolve.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::LedgerUnavailable(_) | Self::LedgerTimeout(_) | Self::LedgerRejected(_)
        )
    }
}
