//! Batching anchor queue.
//!
//! Issued credentials are appended to an ordered pending queue. A flush
//! snapshots the queue, submits the snapshot as one ledger transaction and,
//! once confirmed, removes exactly the snapshotted prefix. Anything enqueued
//! while the transaction was in flight stays pending for the next flush. On
//! any ledger fault the snapshot is simply left in place.
//!
//! The queue and its `flushing` flag share one mutex. The lock is never held
//! across an `.await`; the flag is owned by a [`FlightGuard`] that clears it
//! on drop, so a cancelled flush releases the queue like a failed one.

use chrono::Utc;
use haven_core::{AnchorEvent, AnchorPolicy, AnchorState, AnchorStateMachine};
use haven_identity::Credential;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::AnchorError;
use crate::status::{bounded, AnchorStatusReader, LedgerStatusReader};
use crate::traits::LedgerClient;
use crate::types::{AnchorRecord, AnchorStatus, Confirmation, Fingerprint, RevocationRecord, TransactionId};

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingEntry {
    fingerprint: Fingerprint,
    credential_id: String,
}

#[derive(Debug, Default)]
struct Settled {
    anchor: Option<AnchorRecord>,
    revocation: Option<RevocationRecord>,
}

#[derive(Debug, Default)]
struct QueueState {
    pending: Vec<PendingEntry>,
    flushing: bool,
    /// One entry per fingerprint anchored or revoked through this queue,
    /// kept for the queue's lifetime. Duplicate detection and
    /// `local_state` read it, so it grows with the number of credentials
    /// the issuer has settled.
    settled: HashMap<Fingerprint, Settled>,
}

impl Settled {
    fn state(&self) -> Option<AnchorState> {
        if self.revocation.is_some() {
            Some(AnchorState::Revoked)
        } else if self.anchor.is_some() {
            Some(AnchorState::Anchored)
        } else {
            None
        }
    }
}

impl QueueState {
    fn local_state(&self, fingerprint: &Fingerprint) -> Option<AnchorState> {
        if let Some(state) = self.settled.get(fingerprint).and_then(Settled::state) {
            return Some(state);
        }
        self.pending
            .iter()
            .any(|e| &e.fingerprint == fingerprint)
            .then_some(AnchorState::Pending)
    }
}

fn lock(state: &Mutex<QueueState>) -> MutexGuard<'_, QueueState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Holds the `flushing` flag for one flush; clears it when dropped.
struct FlightGuard {
    state: Arc<Mutex<QueueState>>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        lock(&self.state).flushing = false;
    }
}

/// Result of [`AnchorQueue::enqueue`].
#[derive(Debug)]
pub enum Enqueued {
    /// Appended; no flush started.
    Queued { pending: usize },
    /// Appended and the batch threshold was reached. The handle resolves
    /// to the outcome of the flush that was started.
    FlushTriggered(JoinHandle<FlushOutcome>),
    /// Fingerprint already pending or settled through this queue.
    Duplicate,
}

/// Result of one flush attempt. Ledger failures are reported here rather
/// than as errors; the batch stays queued for the next attempt.
#[derive(Debug)]
pub enum FlushOutcome {
    /// Nothing was pending.
    Idle,
    /// Another flush is in flight.
    AlreadyFlushing,
    /// The batch was confirmed.
    Anchored(Vec<AnchorRecord>),
    /// The batch could not be anchored and was retained.
    Failed { error: AnchorError, retained: usize },
}

impl FlushOutcome {
    pub fn is_anchored(&self) -> bool {
        matches!(self, Self::Anchored(_))
    }
}

/// Buffers issued credentials and anchors their fingerprints in batches.
pub struct AnchorQueue {
    ledger: Arc<dyn LedgerClient>,
    status: LedgerStatusReader,
    policy: AnchorPolicy,
    state: Arc<Mutex<QueueState>>,
}

impl AnchorQueue {
    pub fn new(ledger: Arc<dyn LedgerClient>, policy: AnchorPolicy) -> Self {
        let status = LedgerStatusReader::new(ledger.clone(), policy.submit_timeout());
        Self {
            ledger,
            status,
            policy,
            state: Arc::new(Mutex::new(QueueState::default())),
        }
    }

    pub fn policy(&self) -> &AnchorPolicy {
        &self.policy
    }

    /// Read-only ledger status view sharing this queue's ledger and timeout.
    pub fn status_reader(&self) -> LedgerStatusReader {
        self.status.clone()
    }

    /// Append a credential. Starts a background flush when the queue reaches
    /// the batch threshold and no flush is in flight. Outside a Tokio
    /// runtime the credential is only queued.
    pub fn enqueue(self: &Arc<Self>, credential: &Credential) -> Result<Enqueued, AnchorError> {
        let fingerprint = credential.fingerprint()?;
        let runtime = Handle::try_current().ok();

        let (pending, flight) = {
            let mut state = lock(&self.state);
            if state.local_state(&fingerprint).is_some() {
                tracing::debug!(credential_id = %credential.id, fingerprint = %fingerprint, "duplicate enqueue ignored");
                return Ok(Enqueued::Duplicate);
            }
            state.pending.push(PendingEntry {
                fingerprint,
                credential_id: credential.id.clone(),
            });
            let pending = state.pending.len();
            tracing::debug!(credential_id = %credential.id, fingerprint = %fingerprint, pending, "credential enqueued");

            let flight = if pending >= self.policy.batch_threshold && !state.flushing {
                if runtime.is_some() {
                    Some(self.begin_flight(&mut state))
                } else {
                    tracing::warn!(pending, "batch threshold reached outside a runtime; flush deferred");
                    None
                }
            } else {
                None
            };
            (pending, flight)
        };

        match (flight, runtime) {
            (Some((batch, guard)), Some(handle)) => {
                let queue = Arc::clone(self);
                let task = handle.spawn(async move { queue.run_flight(batch, guard).await });
                Ok(Enqueued::FlushTriggered(task))
            }
            _ => Ok(Enqueued::Queued { pending }),
        }
    }

    /// Anchor everything currently pending as one batch.
    pub async fn flush(&self) -> FlushOutcome {
        let flight = {
            let mut state = lock(&self.state);
            if state.flushing {
                return FlushOutcome::AlreadyFlushing;
            }
            if state.pending.is_empty() {
                return FlushOutcome::Idle;
            }
            self.begin_flight(&mut state)
        };
        let (batch, guard) = flight;
        self.run_flight(batch, guard).await
    }

    fn begin_flight(&self, state: &mut QueueState) -> (Vec<PendingEntry>, FlightGuard) {
        state.flushing = true;
        let guard = FlightGuard {
            state: Arc::clone(&self.state),
        };
        (state.pending.clone(), guard)
    }

    async fn run_flight(&self, batch: Vec<PendingEntry>, guard: FlightGuard) -> FlushOutcome {
        let fingerprints: Vec<Fingerprint> = batch.iter().map(|e| e.fingerprint).collect();
        tracing::info!(batch = batch.len(), ledger = self.ledger.ledger_id(), "submitting anchor batch");

        let outcome = match self.submit_and_confirm(&fingerprints).await {
            Ok((tx, block_height)) => match self.commit(&batch, &tx, block_height) {
                Ok(records) => {
                    tracing::info!(batch = records.len(), tx = %tx, block_height, "anchor batch confirmed");
                    FlushOutcome::Anchored(records)
                }
                Err(error) => {
                    tracing::error!(error = %error, batch = batch.len(), "anchor batch not drained");
                    FlushOutcome::Failed {
                        error,
                        retained: batch.len(),
                    }
                }
            },
            Err(error) => {
                tracing::warn!(error = %error, retained = batch.len(), "anchor batch failed; retained for retry");
                FlushOutcome::Failed {
                    error,
                    retained: batch.len(),
                }
            }
        };

        drop(guard);
        outcome
    }

    async fn submit_and_confirm(
        &self,
        fingerprints: &[Fingerprint],
    ) -> Result<(TransactionId, u64), AnchorError> {
        let submit = async {
            match fingerprints {
                [single] => self.ledger.submit_anchor(single).await,
                many => self.ledger.submit_anchor_batch(many).await,
            }
        };
        let tx = bounded("submit_anchor_batch", self.policy.submit_timeout(), submit).await?;
        let block_height = self.confirm(&tx).await?;
        Ok((tx, block_height))
    }

    async fn confirm(&self, tx: &TransactionId) -> Result<u64, AnchorError> {
        let limit = self.policy.confirmation_timeout();
        let confirmation = bounded(
            "await_confirmation",
            limit,
            self.ledger.await_confirmation(tx, limit),
        )
        .await?;
        match confirmation {
            Confirmation::Confirmed { block_height } => Ok(block_height),
            Confirmation::TimedOut => Err(AnchorError::LedgerTimeout(format!(
                "transaction {} not confirmed within {:?}",
                tx, limit
            ))),
            Confirmation::Rejected { reason } => Err(AnchorError::LedgerRejected(format!(
                "transaction {}: {}",
                tx, reason
            ))),
        }
    }

    /// Drain the confirmed snapshot, which must still be a prefix of the
    /// pending queue.
    fn commit(
        &self,
        batch: &[PendingEntry],
        tx: &TransactionId,
        block_height: u64,
    ) -> Result<Vec<AnchorRecord>, AnchorError> {
        let mut state = lock(&self.state);
        if !state.pending.starts_with(batch) {
            return Err(AnchorError::QueueFlushConflict(format!(
                "snapshot of {} entries is no longer a prefix of {} pending",
                batch.len(),
                state.pending.len()
            )));
        }
        state.pending.drain(..batch.len());

        let timestamp = Utc::now();
        let mut records = Vec::with_capacity(batch.len());
        for entry in batch {
            let record = AnchorRecord {
                fingerprint: entry.fingerprint,
                credential_id: entry.credential_id.clone(),
                transaction_id: tx.clone(),
                block_height,
                timestamp,
            };
            let settled = state.settled.entry(entry.fingerprint).or_default();
            let current = settled.state().unwrap_or(AnchorState::Pending);
            match AnchorStateMachine::transition(current, AnchorEvent::Confirm) {
                Ok(next) => {
                    tracing::debug!(credential_id = %entry.credential_id, fingerprint = %entry.fingerprint, state = %next, "credential anchored");
                    settled.anchor = Some(record.clone());
                }
                // Revoked while the batch was in flight. The ledger now holds
                // the anchor too, but the revocation stays the local state.
                Err(_) if current == AnchorState::Revoked => {
                    tracing::debug!(credential_id = %entry.credential_id, fingerprint = %entry.fingerprint, "revoked credential anchored");
                    settled.anchor.get_or_insert_with(|| record.clone());
                }
                Err(error) => {
                    tracing::warn!(error = %error, credential_id = %entry.credential_id, "anchor already recorded; keeping the first");
                }
            }
            records.push(record);
        }
        Ok(records)
    }

    /// Revoke a credential with a dedicated, unbatched ledger transaction.
    pub async fn revoke(&self, credential: &Credential) -> Result<RevocationRecord, AnchorError> {
        let fingerprint = credential.fingerprint()?;
        let current = self.local_state(&fingerprint).unwrap_or(AnchorState::Pending);
        AnchorStateMachine::transition(current, AnchorEvent::Revoke)?;

        let tx = bounded(
            "submit_revoke",
            self.policy.submit_timeout(),
            self.ledger.submit_revoke(&fingerprint),
        )
        .await?;
        let block_height = self.confirm(&tx).await?;

        let record = RevocationRecord {
            fingerprint,
            credential_id: credential.id.clone(),
            transaction_id: tx,
            block_height,
            timestamp: Utc::now(),
        };
        lock(&self.state)
            .settled
            .entry(fingerprint)
            .or_default()
            .revocation = Some(record.clone());

        tracing::info!(credential_id = %credential.id, fingerprint = %fingerprint, block_height, "credential revoked");
        Ok(record)
    }

    /// Ledger lookup; never consults the local queue.
    pub async fn is_anchored(&self, credential: &Credential) -> Result<AnchorStatus, AnchorError> {
        let fingerprint = credential.fingerprint()?;
        self.status.anchor_status(&fingerprint).await
    }

    /// Ledger lookup; never consults the local queue.
    pub async fn is_revoked(&self, credential: &Credential) -> Result<bool, AnchorError> {
        let fingerprint = credential.fingerprint()?;
        self.status.revoked(&fingerprint).await
    }

    /// Periodically flush so pending credentials are anchored even when the
    /// batch threshold is never reached. Stops when `shutdown` turns `true`
    /// or its sender is dropped.
    pub fn spawn_flush_timer(
        self: &Arc<Self>,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match queue.flush().await {
                            FlushOutcome::Anchored(records) => {
                                tracing::debug!(batch = records.len(), "timer flush anchored batch");
                            }
                            FlushOutcome::Failed { error, retained } => {
                                tracing::debug!(error = %error, retained, "timer flush failed");
                            }
                            FlushOutcome::Idle | FlushOutcome::AlreadyFlushing => {}
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            tracing::debug!("flush timer stopped");
                            break;
                        }
                    }
                }
            }
        })
    }

    /// Pending / Anchored / Revoked as seen by this queue, or `None` if the
    /// fingerprint never passed through it.
    pub fn local_state(&self, fingerprint: &Fingerprint) -> Option<AnchorState> {
        lock(&self.state).local_state(fingerprint)
    }

    pub fn anchor_record(&self, fingerprint: &Fingerprint) -> Option<AnchorRecord> {
        lock(&self.state)
            .settled
            .get(fingerprint)
            .and_then(|s| s.anchor.clone())
    }

    pub fn revocation_record(&self, fingerprint: &Fingerprint) -> Option<RevocationRecord> {
        lock(&self.state)
            .settled
            .get(fingerprint)
            .and_then(|s| s.revocation.clone())
    }

    pub fn pending_len(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// Pending fingerprints in enqueue order.
    pub fn pending_fingerprints(&self) -> Vec<Fingerprint> {
        lock(&self.state)
            .pending
            .iter()
            .map(|e| e.fingerprint)
            .collect()
    }

    pub fn is_flushing(&self) -> bool {
        lock(&self.state).flushing
    }
}
