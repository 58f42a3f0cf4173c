use crate::anchor_state::AnchorState;

/// Core protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid anchor state transition from {from} to {to}")]
    InvalidStateTransition { from: AnchorState, to: AnchorState },

    #[error("invalid DID format: {0}")]
    InvalidDid(String),

    #[error("canonicalization failed: {0}")]
    Canonicalization(#[from] serde_json::Error),
}
