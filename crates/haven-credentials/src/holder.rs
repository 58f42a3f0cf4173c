use chrono::{DateTime, Utc};
use dashmap::DashMap;
use haven_anchor::AnchorStatusReader;
use haven_core::timestamp::{self, iso_millis};
use haven_core::{Did, TrustPolicy};
use haven_identity::{verify_signed, Credential, Identity, IdentityExport, SignedCredential, TrustScorer};
use serde::{Deserialize, Serialize};

use crate::error::CredentialError;

/// A credential held in a wallet, with what was learned when it arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredential {
    pub credential: Credential,
    pub signature: String,
    #[serde(with = "iso_millis")]
    pub received_at: DateTime<Utc>,
    /// Ledger status was checked and the credential was not revoked.
    pub blockchain_verified: bool,
    pub anchored: bool,
}

/// What a holder presents to a verifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareableBundle {
    pub did: Did,
    pub credentials: Vec<StoredCredential>,
    pub trust_score: u32,
    #[serde(with = "iso_millis")]
    pub shared_at: DateTime<Utc>,
}

/// Opaque persistence form of a wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletSnapshot {
    pub identity: IdentityExport,
    pub credentials: Vec<StoredCredential>,
    pub trust_score: u32,
    #[serde(with = "iso_millis")]
    pub created_at: DateTime<Utc>,
}

/// Holder wallet: the owner's identity plus the credentials issued to it.
///
/// Every change recomputes the trust score over the whole set.
pub struct Wallet {
    identity: Identity,
    /// Credential ID -> stored credential.
    credentials: DashMap<String, StoredCredential>,
    scorer: TrustScorer,
    created_at: DateTime<Utc>,
}

impl Wallet {
    pub fn new(identity: Identity, policy: TrustPolicy) -> Self {
        Self {
            identity,
            credentials: DashMap::new(),
            scorer: TrustScorer::new(policy),
            created_at: timestamp::now_millis(),
        }
    }

    /// Create a wallet with a freshly generated identity.
    pub fn create(policy: TrustPolicy) -> Result<Self, CredentialError> {
        Ok(Self::new(Identity::generate()?, policy))
    }

    pub fn did(&self) -> &Did {
        self.identity.identifier()
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Verify and store a received credential; returns the new trust score.
    ///
    /// The signature is always checked locally. With a status reader the
    /// ledger is also consulted: a revoked credential is rejected, and an
    /// unreachable ledger only marks the credential as unverified.
    pub async fn add_credential(
        &self,
        signed: SignedCredential,
        status: Option<&dyn AnchorStatusReader>,
    ) -> Result<u32, CredentialError> {
        let credential = &signed.credential;
        if credential.subject() != self.did() {
            return Err(CredentialError::SubjectMismatch {
                subject: credential.subject().to_string(),
                owner: self.did().to_string(),
            });
        }

        if !verify_signed(&signed)? {
            return Err(CredentialError::InvalidSignature(credential.id.clone()));
        }

        let now = Utc::now();
        if credential.is_expired(now) {
            return Err(CredentialError::Expired(credential.id.clone()));
        }

        let (blockchain_verified, anchored) = match status {
            Some(reader) => {
                let fingerprint = signed.fingerprint()?;
                match Self::ledger_check(reader, &fingerprint).await {
                    Ok((true, _)) => return Err(CredentialError::Revoked(credential.id.clone())),
                    Ok((false, anchored)) => (true, anchored),
                    Err(e) => {
                        tracing::warn!(credential_id = %credential.id, error = %e, "ledger check failed; storing unverified");
                        (false, false)
                    }
                }
            }
            None => (false, false),
        };

        let id = credential.id.clone();
        self.credentials.insert(
            id.clone(),
            StoredCredential {
                received_at: timestamp::now_millis(),
                blockchain_verified,
                anchored,
                credential: signed.credential,
                signature: signed.signature,
            },
        );
        tracing::debug!(credential_id = %id, blockchain_verified, anchored, "credential stored in wallet");

        Ok(self.trust_score())
    }

    async fn ledger_check(
        reader: &dyn AnchorStatusReader,
        fingerprint: &haven_anchor::Fingerprint,
    ) -> Result<(bool, bool), haven_anchor::AnchorError> {
        let revoked = reader.revoked(fingerprint).await?;
        let anchored = reader.anchor_status(fingerprint).await?.anchored;
        Ok((revoked, anchored))
    }

    /// Remove a credential by ID; returns the new trust score.
    pub fn remove_credential(&self, id: &str) -> u32 {
        if self.credentials.remove(id).is_some() {
            tracing::debug!(credential_id = %id, "credential removed from wallet");
        }
        self.trust_score()
    }

    pub fn get(&self, id: &str) -> Option<StoredCredential> {
        self.credentials.get(id).map(|e| e.clone())
    }

    /// All stored credentials, oldest first.
    pub fn credentials(&self) -> Vec<StoredCredential> {
        let mut all: Vec<StoredCredential> =
            self.credentials.iter().map(|e| e.value().clone()).collect();
        all.sort_by(|a, b| {
            a.received_at
                .cmp(&b.received_at)
                .then_with(|| a.credential.id.cmp(&b.credential.id))
        });
        all
    }

    pub fn count(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    /// Trust score of the current set, evaluated now.
    pub fn trust_score(&self) -> u32 {
        let held: Vec<Credential> = self
            .credentials
            .iter()
            .map(|e| e.credential.clone())
            .collect();
        self.scorer.score(&held, Utc::now())
    }

    pub fn prepare_shareable_bundle(&self) -> ShareableBundle {
        ShareableBundle {
            did: self.did().clone(),
            credentials: self.credentials(),
            trust_score: self.trust_score(),
            shared_at: timestamp::now_millis(),
        }
    }

    pub fn export(&self) -> WalletSnapshot {
        WalletSnapshot {
            identity: self.identity.export(),
            credentials: self.credentials(),
            trust_score: self.trust_score(),
            created_at: self.created_at,
        }
    }

    /// Restore a wallet. Stored credentials are taken as-is; the trust score
    /// is recomputed.
    pub fn import(snapshot: &WalletSnapshot, policy: TrustPolicy) -> Result<Self, CredentialError> {
        let identity = Identity::import(&snapshot.identity)?;
        let wallet = Self {
            identity,
            credentials: DashMap::new(),
            scorer: TrustScorer::new(policy),
            created_at: snapshot.created_at,
        };
        for stored in &snapshot.credentials {
            wallet
                .credentials
                .insert(stored.credential.id.clone(), stored.clone());
        }
        Ok(wallet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use haven_anchor::{AnchorQueue, InMemoryLedger, LedgerStatusReader};
    use haven_core::AnchorPolicy;
    use std::sync::Arc;

    use crate::issuer::IssuerService;

    struct Fixture {
        ledger: Arc<InMemoryLedger>,
        issuer: IssuerService,
        wallet: Wallet,
        reader: LedgerStatusReader,
    }

    fn fixture() -> Fixture {
        let ledger = Arc::new(InMemoryLedger::new());
        let policy = AnchorPolicy {
            batch_threshold: 100,
            ..AnchorPolicy::default()
        };
        let queue = Arc::new(AnchorQueue::new(ledger.clone(), policy));
        let reader = queue.status_reader();
        let issuer = IssuerService::new(Identity::generate().unwrap(), "Clinic", queue);
        let wallet = Wallet::create(TrustPolicy::default()).unwrap();
        Fixture {
            ledger,
            issuer,
            wallet,
            reader,
        }
    }

    fn issue(f: &Fixture, kind: &str) -> SignedCredential {
        f.issuer
            .issue_credential(f.wallet.did().uri(), kind, serde_json::json!({"k": kind}))
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_offline() {
        let f = fixture();
        let score = f.wallet.add_credential(issue(&f, "RefugeeRegistration"), None).await.unwrap();
        // 3 base + 0 age + 2 diversity
        assert_eq!(score, 5);
        let stored = &f.wallet.credentials()[0];
        assert!(!stored.blockchain_verified);
        assert!(!stored.anchored);
    }

    #[tokio::test]
    async fn test_add_with_anchor_check() {
        let f = fixture();
        let signed = issue(&f, "Passport");
        assert!(f.issuer.anchor_now().await.is_anchored());

        f.wallet.add_credential(signed.clone(), Some(&f.reader)).await.unwrap();
        let stored = f.wallet.get(&signed.credential.id).unwrap();
        assert!(stored.blockchain_verified);
        assert!(stored.anchored);
    }

    #[tokio::test]
    async fn test_revoked_rejected() {
        let f = fixture();
        let signed = issue(&f, "Passport");
        f.issuer.revoke(&signed.credential).await.unwrap();

        let result = f.wallet.add_credential(signed, Some(&f.reader)).await;
        assert!(matches!(result, Err(CredentialError::Revoked(_))));
        assert!(f.wallet.is_empty());
    }

    #[tokio::test]
    async fn test_ledger_unreachable_stores_unverified() {
        let f = fixture();
        f.ledger.set_offline(true);
        let signed = issue(&f, "HealthRecord");
        f.wallet.add_credential(signed.clone(), Some(&f.reader)).await.unwrap();
        let stored = f.wallet.get(&signed.credential.id).unwrap();
        assert!(!stored.blockchain_verified);
    }

    #[tokio::test]
    async fn test_tampered_rejected() {
        let f = fixture();
        let mut signed = issue(&f, "Passport");
        signed
            .credential
            .credential_subject
            .claims
            .insert("k".into(), "forged".into());
        let result = f.wallet.add_credential(signed, None).await;
        assert!(matches!(result, Err(CredentialError::InvalidSignature(_))));
    }

    #[tokio::test]
    async fn test_expired_rejected() {
        let f = fixture();
        let signed = f
            .issuer
            .issue_with_expiration(
                f.wallet.did().uri(),
                "HealthRecord",
                serde_json::json!({}),
                Utc::now() - Duration::hours(1),
            )
            .unwrap();
        let result = f.wallet.add_credential(signed, None).await;
        assert!(matches!(result, Err(CredentialError::Expired(_))));
    }

    #[tokio::test]
    async fn test_wrong_subject_rejected() {
        let f = fixture();
        let signed = f
            .issuer
            .issue_credential("did:key:zSomebodyNew", "Passport", serde_json::json!({}))
            .unwrap();
        let result = f.wallet.add_credential(signed, None).await;
        assert!(matches!(result, Err(CredentialError::SubjectMismatch { .. })));
    }

    #[tokio::test]
    async fn test_remove_updates_score() {
        let f = fixture();
        let a = issue(&f, "Passport");
        let b = issue(&f, "CommunityVouch");
        f.wallet.add_credential(a.clone(), None).await.unwrap();
        let both = f.wallet.add_credential(b, None).await.unwrap();
        assert_eq!(both, 30 + 2 + 2);

        let after = f.wallet.remove_credential(&a.credential.id);
        assert_eq!(after, 2 + 2);
        assert_eq!(f.wallet.remove_credential("urn:uuid:missing"), after);
    }

    #[tokio::test]
    async fn test_shareable_bundle() {
        let f = fixture();
        f.wallet.add_credential(issue(&f, "SchoolEnrollment"), None).await.unwrap();
        let bundle = f.wallet.prepare_shareable_bundle();
        assert_eq!(&bundle.did, f.wallet.did());
        assert_eq!(bundle.credentials.len(), 1);
        assert_eq!(bundle.trust_score, 7);

        let json = serde_json::to_value(&bundle).unwrap();
        assert!(json.get("trustScore").is_some());
        assert!(json.get("sharedAt").is_some());
        assert!(json["credentials"][0].get("receivedAt").is_some());
    }

    #[tokio::test]
    async fn test_export_import() {
        let f = fixture();
        f.wallet.add_credential(issue(&f, "BirthCertificate"), None).await.unwrap();
        let snapshot = f.wallet.export();
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: WalletSnapshot = serde_json::from_str(&json).unwrap();

        let restored = Wallet::import(&parsed, TrustPolicy::default()).unwrap();
        assert_eq!(restored.did(), f.wallet.did());
        assert_eq!(restored.count(), 1);
        assert_eq!(restored.trust_score(), f.wallet.trust_score());
    }
}
