use chrono::{DateTime, Utc};
use haven_core::TrustPolicy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::credentials::Credential;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Aggregate trust score of a credential set.
///
/// Per credential: base weight of its semantic type plus an age bonus of
/// `min(months * age_bonus_per_month, age_bonus_cap)`. On top of the sum:
/// `issuer_diversity_bonus * distinct issuers`. The total is rounded to the
/// nearest integer.
#[derive(Debug, Clone, Default)]
pub struct TrustScorer {
    policy: TrustPolicy,
}

/// Itemized score, before rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base: f64,
    pub age_bonus: f64,
    pub diversity_bonus: f64,
    pub distinct_issuers: usize,
    pub total: u32,
}

impl TrustScorer {
    pub fn new(policy: TrustPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &TrustPolicy {
        &self.policy
    }

    /// Score a set of credentials at evaluation time `now`.
    pub fn score<'a, I>(&self, credentials: I, now: DateTime<Utc>) -> u32
    where
        I: IntoIterator<Item = &'a Credential>,
    {
        self.breakdown(credentials, now).total
    }

    /// Same as [`score`](Self::score), with the individual components.
    pub fn breakdown<'a, I>(&self, credentials: I, now: DateTime<Utc>) -> ScoreBreakdown
    where
        I: IntoIterator<Item = &'a Credential>,
    {
        let mut base = 0.0;
        let mut age_bonus = 0.0;
        let mut issuers = BTreeSet::new();

        for credential in credentials {
            if let Some(semantic) = credential.semantic_type() {
                base += f64::from(self.policy.weight_of(semantic.as_str()));
            }
            age_bonus += self.age_bonus(credential, now);
            issuers.insert(credential.issuer.uri());
        }

        let diversity_bonus = self.policy.issuer_diversity_bonus.max(0.0) * issuers.len() as f64;
        let raw = base + age_bonus + diversity_bonus;
        let total = raw.round().max(0.0) as u32;

        ScoreBreakdown {
            base,
            age_bonus,
            diversity_bonus,
            distinct_issuers: issuers.len(),
            total,
        }
    }

    fn age_bonus(&self, credential: &Credential, now: DateTime<Utc>) -> f64 {
        let age_ms = (now - credential.issuance_date).num_milliseconds().max(0) as f64;
        let month_ms = f64::from(self.policy.days_per_month.max(1)) * MILLIS_PER_DAY;
        let months = age_ms / month_ms;
        (months * self.policy.age_bonus_per_month.max(0.0)).min(self.policy.age_bonus_cap.max(0.0))
    }
}

/// Score with the default policy.
pub fn calculate_trust_score(credentials: &[Credential], now: DateTime<Utc>) -> u32 {
    TrustScorer::default().score(credentials, now)
}
