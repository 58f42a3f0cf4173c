use chrono::{DateTime, Duration, Utc};
use haven_anchor::{AnchorQueue, Enqueued, FlushOutcome, RevocationRecord};
use haven_core::{CredentialType, Did};
use haven_identity::{Credential, Identity, SignedCredential};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::CredentialError;

/// Public description of an issuer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerInfo {
    pub did: Did,
    pub name: String,
    /// Hex-encoded Ed25519 public key.
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuerStats {
    pub did: Did,
    pub pending_anchors: usize,
    pub flushing: bool,
}

/// Issues signed credentials and hands every issued credential to the
/// anchor queue.
pub struct IssuerService {
    identity: Identity,
    display_name: String,
    queue: Arc<AnchorQueue>,
}

impl IssuerService {
    pub fn new(identity: Identity, display_name: impl Into<String>, queue: Arc<AnchorQueue>) -> Self {
        Self {
            identity,
            display_name: display_name.into(),
            queue,
        }
    }

    pub fn did(&self) -> &Did {
        self.identity.identifier()
    }

    pub fn queue(&self) -> &Arc<AnchorQueue> {
        &self.queue
    }

    /// Issue a credential with no expiration.
    pub fn issue_credential(
        &self,
        subject_did: &str,
        credential_type: impl Into<CredentialType>,
        claims: serde_json::Value,
    ) -> Result<SignedCredential, CredentialError> {
        let credential = self.build(subject_did, credential_type, claims)?;
        self.sign_and_enqueue(credential)
    }

    /// Issue a credential with a specific expiration date.
    pub fn issue_with_expiration(
        &self,
        subject_did: &str,
        credential_type: impl Into<CredentialType>,
        claims: serde_json::Value,
        expiration: DateTime<Utc>,
    ) -> Result<SignedCredential, CredentialError> {
        let credential = self
            .build(subject_did, credential_type, claims)?
            .with_expiration(expiration);
        self.sign_and_enqueue(credential)
    }

    /// Issue a credential that expires `duration` from now. A duration that
    /// runs past the representable date range is rejected before signing.
    pub fn issue_with_expiry(
        &self,
        subject_did: &str,
        credential_type: impl Into<CredentialType>,
        claims: serde_json::Value,
        duration: Duration,
    ) -> Result<SignedCredential, CredentialError> {
        let expiration = Utc::now().checked_add_signed(duration).ok_or_else(|| {
            CredentialError::InvalidExpiration(format!("{} from now is out of range", duration))
        })?;
        self.issue_with_expiration(subject_did, credential_type, claims, expiration)
    }

    fn build(
        &self,
        subject_did: &str,
        credential_type: impl Into<CredentialType>,
        claims: serde_json::Value,
    ) -> Result<Credential, CredentialError> {
        let credential = Credential::create(self.did(), subject_did, credential_type, claims)?
            .with_issuer_name(self.display_name.clone());
        Ok(credential)
    }

    fn sign_and_enqueue(&self, credential: Credential) -> Result<SignedCredential, CredentialError> {
        let signature = self.identity.sign(&credential)?;

        match self.queue.enqueue(&credential)? {
            Enqueued::FlushTriggered(_) => {
                tracing::debug!(credential_id = %credential.id, "batch threshold reached; flush started");
            }
            Enqueued::Queued { pending } => {
                tracing::debug!(credential_id = %credential.id, pending, "queued for anchoring");
            }
            Enqueued::Duplicate => {}
        }

        tracing::info!(
            issuer = %self.did(),
            subject = %credential.subject(),
            credential_id = %credential.id,
            credential_type = credential.credential_type.get(1).map(String::as_str).unwrap_or(""),
            "credential issued"
        );

        Ok(SignedCredential {
            credential,
            signature: signature.to_hex(),
        })
    }

    pub fn get_info(&self) -> IssuerInfo {
        IssuerInfo {
            did: self.did().clone(),
            name: self.display_name.clone(),
            public_key: self.identity.public_key().to_hex(),
        }
    }

    /// Flush the anchor queue now instead of waiting for the threshold or timer.
    pub async fn anchor_now(&self) -> FlushOutcome {
        self.queue.flush().await
    }

    /// Revoke a credential this issuer issued.
    pub async fn revoke(&self, credential: &Credential) -> Result<RevocationRecord, CredentialError> {
        if &credential.issuer != self.did() {
            return Err(CredentialError::NotIssuer {
                credential_id: credential.id.clone(),
                issuer: self.did().to_string(),
            });
        }
        Ok(self.queue.revoke(credential).await?)
    }

    pub fn stats(&self) -> IssuerStats {
        IssuerStats {
            did: self.did().clone(),
            pending_anchors: self.queue.pending_len(),
            flushing: self.queue.is_flushing(),
        }
    }
}
