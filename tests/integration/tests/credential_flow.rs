//! Integration test: issuer -> holder -> verifier across crates.

use std::sync::Arc;

use chrono::Duration;
use haven_anchor::LedgerClient;
use haven_credentials::{
    CredentialError, CredentialVerifier, ShareableBundle, CHECK_ANCHORED, CHECK_NOT_REVOKED,
    CHECK_SIGNATURE,
};
use haven_identity::{identifier_to_public_key, verify, Credential, Identity, SignedCredential};
use haven_integration_tests::{new_wallet, Stack};

// =========================================================================
// Identity and signature properties
// =========================================================================

#[test]
fn test_identifier_resolves_to_public_key() {
    for _ in 0..8 {
        let identity = Identity::generate().unwrap();
        let key = identifier_to_public_key(identity.identifier().uri()).unwrap();
        assert_eq!(&key, identity.public_key().as_bytes());
    }
}

#[test]
fn test_amara_birth_certificate() {
    let issuer = Identity::generate().unwrap();
    let credential = Credential::create(
        issuer.identifier(),
        "did:key:zRecipient",
        "BirthCertificate",
        serde_json::json!({"name": "Amara"}),
    )
    .unwrap();
    let signature = issuer.sign(&credential).unwrap().to_bytes();
    let public_key = issuer.public_key();

    assert!(verify(&credential, &signature, public_key.as_bytes()).unwrap());

    let mut mutated = credential.clone();
    mutated
        .credential_subject
        .claims
        .insert("name".into(), "Amira".into());
    assert!(!verify(&mutated, &signature, public_key.as_bytes()).unwrap());
}

#[test]
fn test_bundle_survives_json_transport() {
    let stack = Stack::new("Registry", 100);
    let signed = stack
        .issuer
        .issue_credential(
            "did:key:zRecipient",
            "NationalID",
            serde_json::json!({"given": "Amara", "family": "Okafor", "born": 1994}),
        )
        .unwrap();

    // Field order on the wire does not matter: the digest is over JCS bytes.
    let mut value = serde_json::to_value(&signed).unwrap();
    let subject = value["credential"]["credentialSubject"].take();
    let reordered = serde_json::json!({
        "signature": value["signature"].take(),
        "credential": {
            "credentialSubject": subject,
            "issuanceDate": value["credential"]["issuanceDate"].take(),
            "issuerName": value["credential"]["issuerName"].take(),
            "issuer": value["credential"]["issuer"].take(),
            "type": value["credential"]["type"].take(),
            "id": value["credential"]["id"].take(),
            "@context": value["credential"]["@context"].take(),
        }
    });
    let received: SignedCredential = serde_json::from_value(reordered).unwrap();

    assert_eq!(received.fingerprint().unwrap(), signed.fingerprint().unwrap());
    assert!(haven_identity::verify_signed(&received).unwrap());
}

// =========================================================================
// Full lifecycle: issue, anchor, hold, verify, revoke
// =========================================================================

#[tokio::test]
async fn test_issue_anchor_hold_verify_revoke() {
    let stack = Stack::new("Kakuma Field Office", 100);
    let wallet = new_wallet();
    let reader = stack.queue.status_reader();
    let verifier = CredentialVerifier::new(Arc::new(reader.clone()));

    let signed = stack
        .issuer
        .issue_credential(
            wallet.did().uri(),
            "RefugeeRegistration",
            serde_json::json!({"caseNumber": "KAK-2024-0042"}),
        )
        .unwrap();
    assert!(stack.issuer.anchor_now().await.is_anchored());

    let score = wallet.add_credential(signed.clone(), Some(&reader)).await.unwrap();
    assert_eq!(score, 3 + 2);
    let stored = wallet.get(&signed.credential.id).unwrap();
    assert!(stored.blockchain_verified);
    assert!(stored.anchored);

    // The holder shares a bundle; the verifier checks each credential in it.
    let json = serde_json::to_string(&wallet.prepare_shareable_bundle()).unwrap();
    let bundle: ShareableBundle = serde_json::from_str(&json).unwrap();
    assert_eq!(bundle.trust_score, 5);
    let shared = &bundle.credentials[0];
    let presented = SignedCredential {
        credential: shared.credential.clone(),
        signature: shared.signature.clone(),
    };
    let result = verifier.verify(&presented).await;
    assert!(result.valid);
    assert_eq!(result.summary.recipient, *wallet.did());

    stack.issuer.revoke(&signed.credential).await.unwrap();
    let fp = signed.fingerprint().unwrap();
    assert!(stack.ledger.query_revoked(&fp).await.unwrap());

    let after = verifier.verify(&presented).await;
    assert!(!after.valid);
    assert!(after.check(CHECK_SIGNATURE).unwrap().passed);
    assert!(after.check(CHECK_ANCHORED).unwrap().passed);
    assert!(!after.check(CHECK_NOT_REVOKED).unwrap().passed);

    // Re-adding the revoked credential is refused.
    let result = wallet.add_credential(signed, Some(&reader)).await;
    assert!(matches!(result, Err(CredentialError::Revoked(_))));
}

#[tokio::test]
async fn test_wallet_with_ledger_down_stores_unverified() {
    let stack = Stack::new("Clinic", 100);
    let wallet = new_wallet();
    let reader = stack.queue.status_reader();
    let signed = stack
        .issuer
        .issue_credential(wallet.did().uri(), "VaccinationRecord", serde_json::json!({}))
        .unwrap();

    stack.ledger.set_offline(true);
    let score = wallet.add_credential(signed.clone(), Some(&reader)).await.unwrap();
    assert_eq!(score, 5 + 2);
    assert!(!wallet.get(&signed.credential.id).unwrap().blockchain_verified);
}

#[tokio::test]
async fn test_expired_credential_fails_everywhere() {
    let stack = Stack::new("Clinic", 100);
    let wallet = new_wallet();
    let signed = stack
        .issuer
        .issue_with_expiry(
            wallet.did().uri(),
            "HealthRecord",
            serde_json::json!({}),
            Duration::milliseconds(-1),
        )
        .unwrap();

    let result = wallet.add_credential(signed.clone(), None).await;
    assert!(matches!(result, Err(CredentialError::Expired(_))));
    assert!(!CredentialVerifier::offline().verify(&signed).await.valid);
}

#[tokio::test]
async fn test_wallet_export_restores_holder() {
    let issuer_a = Stack::new("School", 100);
    let issuer_b = Stack::with_ledger(issuer_a.ledger.clone(), "Clinic", 100);
    let wallet = new_wallet();

    for (stack, kind) in [(&issuer_a, "SchoolEnrollment"), (&issuer_b, "HealthRecord")] {
        let signed = stack
            .issuer
            .issue_credential(wallet.did().uri(), kind, serde_json::json!({}))
            .unwrap();
        wallet.add_credential(signed, None).await.unwrap();
    }
    assert_eq!(wallet.trust_score(), 5 + 5 + 2 * 2);

    let json = serde_json::to_string(&wallet.export()).unwrap();
    let restored = haven_credentials::Wallet::import(
        &serde_json::from_str(&json).unwrap(),
        haven_core::TrustPolicy::default(),
    )
    .unwrap();
    assert_eq!(restored.did(), wallet.did());
    assert_eq!(restored.trust_score(), wallet.trust_score());
    assert_eq!(restored.credentials().len(), 2);
}
