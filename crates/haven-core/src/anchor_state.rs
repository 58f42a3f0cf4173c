use std::fmt;

use crate::error::CoreError;

/// Ledger lifecycle of a credential fingerprint, as seen by one issuer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AnchorState {
    /// Waiting in the anchor queue for the next batch.
    Pending,
    /// Fingerprint confirmed on the ledger.
    Anchored,
    /// Revocation confirmed on the ledger. Final state.
    Revoked,
}

impl AnchorState {
    /// Whether this is a final (terminal) state.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Revoked)
    }
}

impl fmt::Display for AnchorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Anchored => write!(f, "Anchored"),
            Self::Revoked => write!(f, "Revoked"),
        }
    }
}

/// Events that move a fingerprint between anchor states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorEvent {
    /// The batch containing the fingerprint was confirmed.
    Confirm,
    /// A revocation transaction for the fingerprint was confirmed.
    Revoke,
}

/// Valid transitions:
/// - Pending → Anchored (Confirm)
/// - Pending → Revoked (Revoke)
/// - Anchored → Revoked (Revoke)
pub struct AnchorStateMachine;

impl AnchorStateMachine {
    /// Attempt a state transition based on an event.
    pub fn transition(current: AnchorState, event: AnchorEvent) -> Result<AnchorState, CoreError> {
        let new_state = match (current, event) {
            (AnchorState::Pending, AnchorEvent::Confirm) => AnchorState::Anchored,
            (AnchorState::Pending, AnchorEvent::Revoke) => AnchorState::Revoked,
            (AnchorState::Anchored, AnchorEvent::Revoke) => AnchorState::Revoked,
            _ => {
                let target = match event {
                    AnchorEvent::Confirm => AnchorState::Anchored,
                    AnchorEvent::Revoke => AnchorState::Revoked,
                };
                return Err(CoreError::InvalidStateTransition {
                    from: current,
                    to: target,
                });
            }
        };

        tracing::debug!(
            from = %current,
            to = %new_state,
            event = ?event,
            "anchor state transition"
        );

        Ok(new_state)
    }

    /// Check if a transition is valid without performing it.
    pub fn can_transition(current: AnchorState, event: AnchorEvent) -> bool {
        Self::transition(current, event).is_ok()
    }
}
