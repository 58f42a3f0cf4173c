use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::types::CredentialType;

/// Batching and timing policy for ledger anchoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorPolicy {
    /// Pending-queue size that triggers a batch flush.
    #[serde(default = "default_batch_threshold")]
    pub batch_threshold: usize,
    /// Period of the background flush timer, in seconds.
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    /// Upper bound for a single submit call, in seconds.
    #[serde(default = "default_submit_timeout_secs")]
    pub submit_timeout_secs: u64,
    /// Upper bound for waiting on a transaction confirmation, in seconds.
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
}

/// Weights and bonuses used to derive a trust score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustPolicy {
    /// Base weight per semantic credential type. Types not listed weigh 0.
    #[serde(default = "default_weights")]
    pub weights: BTreeMap<String, u32>,
    /// Bonus added per month since issuance.
    #[serde(default = "default_age_bonus_per_month")]
    pub age_bonus_per_month: f64,
    /// Cap on the age bonus of a single credential.
    #[serde(default = "default_age_bonus_cap")]
    pub age_bonus_cap: f64,
    /// Length of a scoring month, in days.
    #[serde(default = "default_days_per_month")]
    pub days_per_month: u32,
    /// Bonus per distinct issuer across the set.
    #[serde(default = "default_issuer_diversity_bonus")]
    pub issuer_diversity_bonus: f64,
}

fn default_batch_threshold() -> usize {
    5
}
fn default_flush_interval_secs() -> u64 {
    60
}
fn default_submit_timeout_secs() -> u64 {
    30
}
fn default_confirmation_timeout_secs() -> u64 {
    120
}
fn default_weights() -> BTreeMap<String, u32> {
    CredentialType::KNOWN
        .iter()
        .map(|t| (t.as_str().to_string(), t.default_weight()))
        .collect()
}
fn default_age_bonus_per_month() -> f64 {
    0.5
}
fn default_age_bonus_cap() -> f64 {
    10.0
}
fn default_days_per_month() -> u32 {
    30
}
fn default_issuer_diversity_bonus() -> f64 {
    2.0
}

impl Default for AnchorPolicy {
    fn default() -> Self {
        Self {
            batch_threshold: default_batch_threshold(),
            flush_interval_secs: default_flush_interval_secs(),
            submit_timeout_secs: default_submit_timeout_secs(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
        }
    }
}

impl AnchorPolicy {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }
}

impl Default for TrustPolicy {
    fn default() -> Self {
        Self {
            weights: default_weights(),
            age_bonus_per_month: default_age_bonus_per_month(),
            age_bonus_cap: default_age_bonus_cap(),
            days_per_month: default_days_per_month(),
            issuer_diversity_bonus: default_issuer_diversity_bonus(),
        }
    }
}

impl TrustPolicy {
    /// Base weight for a semantic type name; unknown names weigh 0.
    pub fn weight_of(&self, type_name: &str) -> u32 {
        self.weights.get(type_name).copied().unwrap_or(0)
    }
}
