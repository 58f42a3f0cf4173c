//! Integration test: trust scores over issued credentials.

use chrono::{Duration, Utc};
use haven_identity::{calculate_trust_score, Credential, Identity, TrustScorer};
use haven_integration_tests::{new_wallet, Stack};

fn credential(issuer: &Identity, kind: &str, age_days: i64) -> Credential {
    let mut c = Credential::create(
        issuer.identifier(),
        "did:key:zRecipient",
        kind,
        serde_json::json!({}),
    )
    .unwrap();
    c.issuance_date = Utc::now() - Duration::days(age_days);
    c
}

#[test]
fn test_empty_set_scores_zero() {
    assert_eq!(calculate_trust_score(&[], Utc::now()), 0);
}

#[test]
fn test_two_month_refugee_registration() {
    let issuer = Identity::generate().unwrap();
    let now = Utc::now();
    let c = credential(&issuer, "RefugeeRegistration", 60);
    // 3 base + 1.0 age + 2 diversity
    assert_eq!(calculate_trust_score(&[c], now), 6);
}

#[test]
fn test_adding_credentials_never_decreases_score() {
    let issuers: Vec<Identity> = (0..3).map(|_| Identity::generate().unwrap()).collect();
    let kinds = ["CommunityVouch", "Passport", "UnknownThing", "HealthRecord", "CommunityVouch"];
    let now = Utc::now();

    let mut set = Vec::new();
    let mut last = 0;
    for (i, kind) in kinds.iter().enumerate() {
        set.push(credential(&issuers[i % issuers.len()], kind, (i as i64) * 45));
        let score = calculate_trust_score(&set, now);
        assert!(score >= last, "score dropped from {} to {}", last, score);
        last = score;
    }
}

#[test]
fn test_score_is_deterministic() {
    let issuer = Identity::generate().unwrap();
    let set = vec![
        credential(&issuer, "Passport", 400),
        credential(&issuer, "SchoolEnrollment", 10),
    ];
    let now = Utc::now();
    let scorer = TrustScorer::default();
    assert_eq!(scorer.score(&set, now), scorer.score(&set, now));
    let breakdown = scorer.breakdown(&set, now);
    assert_eq!(breakdown.distinct_issuers, 1);
    // 30 + 5 base, 400/30 * 0.5 + 10/30 * 0.5 age, 2 diversity
    assert_eq!(breakdown.total, 44);
}

#[tokio::test]
async fn test_wallet_score_tracks_diversity() {
    let school = Stack::new("School", 100);
    let clinic = Stack::with_ledger(school.ledger.clone(), "Clinic", 100);
    let wallet = new_wallet();

    let vouch = school
        .issuer
        .issue_credential(wallet.did().uri(), "CommunityVouch", serde_json::json!({}))
        .unwrap();
    assert_eq!(wallet.add_credential(vouch, None).await.unwrap(), 2 + 2);

    let record = clinic
        .issuer
        .issue_credential(wallet.did().uri(), "HealthRecord", serde_json::json!({}))
        .unwrap();
    let record_id = record.credential.id.clone();
    assert_eq!(wallet.add_credential(record, None).await.unwrap(), 2 + 5 + 2 * 2);

    assert_eq!(wallet.remove_credential(&record_id), 2 + 2);
}
