use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use haven_crypto::merkle_root;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::AnchorError;
use crate::traits::LedgerClient;
use crate::types::{AnchorStatus, Confirmation, Fingerprint, TransactionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxKind {
    Anchor,
    Revoke,
}

/// A submitted, not yet confirmed transaction.
#[derive(Debug, Clone)]
struct PendingTx {
    kind: TxKind,
    fingerprints: Vec<Fingerprint>,
}

/// One accepted submission, kept for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub transaction_id: TransactionId,
    pub fingerprints: Vec<Fingerprint>,
    /// SHA-256 Merkle root over the submitted fingerprints.
    pub batch_root: [u8; 32],
    pub revocation: bool,
}

/// In-memory append-only ledger.
///
/// Anchors and revocations take effect when a transaction is confirmed, like
/// a real chain. Fault injection hooks (failed submissions, rejected or held
/// confirmations, offline mode) make retry and concurrency paths testable
/// without a network.
pub struct InMemoryLedger {
    /// Fingerprint -> anchoring time. First confirmation wins.
    anchors: DashMap<Fingerprint, DateTime<Utc>>,
    revocations: DashMap<Fingerprint, DateTime<Utc>>,
    pending: DashMap<TransactionId, PendingTx>,
    submissions: Mutex<Vec<Submission>>,
    block_height: AtomicU64,
    fail_submissions: AtomicUsize,
    reject_confirmations: AtomicBool,
    offline: AtomicBool,
    /// `true` while confirmations are held back.
    hold: watch::Sender<bool>,
}

impl InMemoryLedger {
    /// Create an empty ledger at block height 0.
    pub fn new() -> Self {
        let (hold, _) = watch::channel(false);
        Self {
            anchors: DashMap::new(),
            revocations: DashMap::new(),
            pending: DashMap::new(),
            submissions: Mutex::new(Vec::new()),
            block_height: AtomicU64::new(0),
            fail_submissions: AtomicUsize::new(0),
            reject_confirmations: AtomicBool::new(false),
            offline: AtomicBool::new(false),
            hold,
        }
    }

    /// Make the next `n` submissions fail with `LedgerUnavailable`.
    pub fn fail_next_submissions(&self, n: usize) {
        self.fail_submissions.store(n, Ordering::SeqCst);
    }

    /// Reject every confirmation while set.
    pub fn set_reject_confirmations(&self, reject: bool) {
        self.reject_confirmations.store(reject, Ordering::SeqCst);
    }

    /// Fail every call with `LedgerUnavailable` while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Block confirmations until [`release_confirmations`](Self::release_confirmations).
    pub fn hold_confirmations(&self) {
        self.hold.send_replace(true);
    }

    pub fn release_confirmations(&self) {
        self.hold.send_replace(false);
    }

    /// Current block height.
    pub fn block_height(&self) -> u64 {
        self.block_height.load(Ordering::SeqCst)
    }

    /// Accepted submissions in submission order.
    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions
            .lock()
            .map(|log| log.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn submission_count(&self) -> usize {
        self.submissions().len()
    }

    /// Submitted transactions not yet confirmed or rejected.
    pub fn pending_transactions(&self) -> usize {
        self.pending.len()
    }

    fn check_online(&self) -> Result<(), AnchorError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AnchorError::LedgerUnavailable("ledger offline".into()));
        }
        Ok(())
    }

    fn submit(&self, kind: TxKind, fingerprints: &[Fingerprint]) -> Result<TransactionId, AnchorError> {
        self.check_online()?;

        let injected = self
            .fail_submissions
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(AnchorError::LedgerUnavailable(
                "injected submission failure".into(),
            ));
        }

        if fingerprints.is_empty() {
            return Err(AnchorError::LedgerRejected("empty transaction".into()));
        }

        let tx = TransactionId::new(format!("0x{}", Uuid::now_v7().simple()));
        let leaves: Vec<[u8; 32]> = fingerprints.iter().map(|fp| *fp.as_bytes()).collect();
        let submission = Submission {
            transaction_id: tx.clone(),
            fingerprints: fingerprints.to_vec(),
            batch_root: merkle_root(&leaves),
            revocation: kind == TxKind::Revoke,
        };

        self.pending.insert(
            tx.clone(),
            PendingTx {
                kind,
                fingerprints: fingerprints.to_vec(),
            },
        );
        match self.submissions.lock() {
            Ok(mut log) => log.push(submission),
            Err(poisoned) => poisoned.into_inner().push(submission),
        }

        tracing::debug!(tx = %tx, count = fingerprints.len(), kind = ?kind, "transaction submitted");
        Ok(tx)
    }

    fn apply(&self, tx: &PendingTx) -> u64 {
        let height = self.block_height.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        for fp in &tx.fingerprints {
            match tx.kind {
                TxKind::Anchor => {
                    self.anchors.entry(*fp).or_insert(now);
                }
                TxKind::Revoke => {
                    self.revocations.entry(*fp).or_insert(now);
                }
            }
        }
        height
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn submit_anchor(&self, fingerprint: &Fingerprint) -> Result<TransactionId, AnchorError> {
        self.submit(TxKind::Anchor, std::slice::from_ref(fingerprint))
    }

    async fn submit_anchor_batch(
        &self,
        fingerprints: &[Fingerprint],
    ) -> Result<TransactionId, AnchorError> {
        self.submit(TxKind::Anchor, fingerprints)
    }

    async fn await_confirmation(
        &self,
        tx: &TransactionId,
        timeout: Duration,
    ) -> Result<Confirmation, AnchorError> {
        self.check_online()?;
        if !self.pending.contains_key(tx) {
            return Err(AnchorError::LedgerUnavailable(format!(
                "unknown transaction: {}",
                tx
            )));
        }

        let mut hold = self.hold.subscribe();
        match tokio::time::timeout(timeout, hold.wait_for(|held| !*held)).await {
            Err(_) => return Ok(Confirmation::TimedOut),
            Ok(Err(_)) => {
                return Err(AnchorError::LedgerUnavailable("ledger shut down".into()));
            }
            Ok(Ok(_)) => {}
        }

        let Some((_, pending)) = self.pending.remove(tx) else {
            return Err(AnchorError::LedgerUnavailable(format!(
                "transaction already settled: {}",
                tx
            )));
        };

        if self.reject_confirmations.load(Ordering::SeqCst) {
            return Ok(Confirmation::Rejected {
                reason: "transaction reverted".into(),
            });
        }

        let block_height = self.apply(&pending);
        tracing::debug!(tx = %tx, block_height, "transaction confirmed");
        Ok(Confirmation::Confirmed { block_height })
    }

    async fn query_anchored(&self, fingerprint: &Fingerprint) -> Result<AnchorStatus, AnchorError> {
        self.check_online()?;
        Ok(match self.anchors.get(fingerprint) {
            Some(ts) => AnchorStatus {
                anchored: true,
                timestamp: Some(*ts),
            },
            None => AnchorStatus::default(),
        })
    }

    async fn submit_revoke(&self, fingerprint: &Fingerprint) -> Result<TransactionId, AnchorError> {
        self.submit(TxKind::Revoke, std::slice::from_ref(fingerprint))
    }

    async fn query_revoked(&self, fingerprint: &Fingerprint) -> Result<bool, AnchorError> {
        self.check_online()?;
        Ok(self.revocations.contains_key(fingerprint))
    }

    fn ledger_id(&self) -> &str {
        "ledger-memory"
    }
}
