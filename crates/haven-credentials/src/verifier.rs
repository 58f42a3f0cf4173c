use chrono::{DateTime, SubsecRound, Utc};
use haven_anchor::{AnchorStatusReader, Fingerprint};
use haven_core::timestamp::iso_millis;
use haven_core::Did;
use haven_identity::{verify_signed, SignedCredential};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const CHECK_SIGNATURE: &str = "signature_valid";
pub const CHECK_NOT_EXPIRED: &str = "not_expired";
pub const CHECK_ANCHORED: &str = "anchored";
pub const CHECK_NOT_REVOKED: &str = "not_revoked";

/// Result of credential verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// Signature valid, not expired and, when a ledger was consulted, not
    /// revoked. Anchoring is reported but does not decide validity.
    pub valid: bool,
    pub checks: Vec<VerificationCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchored_at: Option<DateTime<Utc>>,
    pub summary: CredentialSummary,
}

impl VerificationResult {
    pub fn check(&self, name: &str) -> Option<&VerificationCheck> {
        self.checks.iter().find(|c| c.name == name)
    }
}

/// An individual verification check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationCheck {
    pub name: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl VerificationCheck {
    fn pass(name: &str) -> Self {
        Self {
            name: name.into(),
            passed: true,
            detail: None,
        }
    }

    fn fail(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            detail: Some(detail.into()),
        }
    }
}

/// Human-readable facts about the verified credential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSummary {
    pub id: String,
    pub credential_type: String,
    pub issuer: Did,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_name: Option<String>,
    pub recipient: Did,
    #[serde(with = "iso_millis")]
    pub issued: DateTime<Utc>,
}

/// Runs signature, expiration, anchoring and revocation as independent checks.
///
/// Without a status reader only the local checks run.
#[derive(Clone, Default)]
pub struct CredentialVerifier {
    status: Option<Arc<dyn AnchorStatusReader>>,
}

impl CredentialVerifier {
    pub fn new(status: Arc<dyn AnchorStatusReader>) -> Self {
        Self {
            status: Some(status),
        }
    }

    pub fn offline() -> Self {
        Self { status: None }
    }

    pub fn is_offline(&self) -> bool {
        self.status.is_none()
    }

    pub async fn verify(&self, signed: &SignedCredential) -> VerificationResult {
        self.verify_at(signed, Utc::now()).await
    }

    /// Verify as of `now`.
    pub async fn verify_at(&self, signed: &SignedCredential, now: DateTime<Utc>) -> VerificationResult {
        let credential = &signed.credential;
        let mut checks = Vec::with_capacity(4);

        let signature_ok = match verify_signed(signed) {
            Ok(true) => {
                checks.push(VerificationCheck::pass(CHECK_SIGNATURE));
                true
            }
            Ok(false) => {
                checks.push(VerificationCheck::fail(
                    CHECK_SIGNATURE,
                    "signature does not match credential contents",
                ));
                false
            }
            Err(e) => {
                checks.push(VerificationCheck::fail(CHECK_SIGNATURE, e.to_string()));
                false
            }
        };

        let not_expired = !credential.is_expired(now);
        checks.push(if not_expired {
            VerificationCheck::pass(CHECK_NOT_EXPIRED)
        } else {
            VerificationCheck::fail(CHECK_NOT_EXPIRED, "credential has expired")
        });

        let mut not_revoked = true;
        let mut anchored_at = None;
        if let Some(reader) = &self.status {
            match signed.fingerprint() {
                Ok(fingerprint) => {
                    let (anchor_check, at) = Self::anchor_check(reader.as_ref(), &fingerprint).await;
                    anchored_at = at;
                    checks.push(anchor_check);

                    let revoke_check = Self::revocation_check(reader.as_ref(), &fingerprint).await;
                    not_revoked = revoke_check.passed;
                    checks.push(revoke_check);
                }
                Err(e) => {
                    checks.push(VerificationCheck::fail(CHECK_ANCHORED, e.to_string()));
                    checks.push(VerificationCheck::fail(CHECK_NOT_REVOKED, e.to_string()));
                    not_revoked = false;
                }
            }
        }

        let valid = signature_ok && not_expired && not_revoked;
        tracing::debug!(credential_id = %credential.id, valid, "credential verified");

        VerificationResult {
            valid,
            checks,
            anchored_at,
            summary: CredentialSummary {
                id: credential.id.clone(),
                credential_type: credential
                    .semantic_type()
                    .map(|t| t.as_str().to_string())
                    .unwrap_or_default(),
                issuer: credential.issuer.clone(),
                issuer_name: credential.issuer_name.clone(),
                recipient: credential.subject().clone(),
                // Display only; keeps the result serializable.
                issued: credential.issuance_date.trunc_subsecs(3),
            },
        }
    }

    async fn anchor_check(
        reader: &dyn AnchorStatusReader,
        fingerprint: &Fingerprint,
    ) -> (VerificationCheck, Option<DateTime<Utc>>) {
        match reader.anchor_status(fingerprint).await {
            Ok(status) if status.anchored => (VerificationCheck::pass(CHECK_ANCHORED), status.timestamp),
            Ok(_) => (
                VerificationCheck::fail(CHECK_ANCHORED, "fingerprint not anchored yet"),
                None,
            ),
            Err(e) => (VerificationCheck::fail(CHECK_ANCHORED, e.to_string()), None),
        }
    }

    /// An unreachable ledger fails the check: revocation cannot be ruled out.
    async fn revocation_check(reader: &dyn AnchorStatusReader, fingerprint: &Fingerprint) -> VerificationCheck {
        match reader.revoked(fingerprint).await {
            Ok(false) => VerificationCheck::pass(CHECK_NOT_REVOKED),
            Ok(true) => VerificationCheck::fail(CHECK_NOT_REVOKED, "credential has been revoked"),
            Err(e) => {
                tracing::warn!(fingerprint = %fingerprint, error = %e, "revocation status unavailable");
                VerificationCheck::fail(CHECK_NOT_REVOKED, format!("revocation status unavailable: {}", e))
            }
        }
    }
}
