//! The Haven issuer node.
//!
//! Owns the ledger adapter, the anchor queue and the issuer service, and
//! drives the periodic flush timer.

use anyhow::Result;
use haven_anchor::{AnchorQueue, FlushOutcome, InMemoryLedger, LedgerClient};
use haven_credentials::IssuerService;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::HavenConfig;
use crate::storage;

/// How often the node logs its anchoring status.
const STATUS_INTERVAL: Duration = Duration::from_secs(300);

pub struct HavenNode {
    config: HavenConfig,
    ledger: Arc<InMemoryLedger>,
    queue: Arc<AnchorQueue>,
    issuer: Arc<IssuerService>,
    shutdown_tx: watch::Sender<bool>,
    flush_timer: Option<JoinHandle<()>>,
}

impl HavenNode {
    /// Build the node: load or create the issuer identity, then wire the
    /// ledger, queue and issuer together.
    pub fn new(config: HavenConfig) -> Result<Self> {
        config.validate()?;
        let identity = storage::load_or_create_identity(&config.issuer.identity_file)?;

        let ledger = Arc::new(InMemoryLedger::new());
        let queue = Arc::new(AnchorQueue::new(ledger.clone(), config.anchor.clone()));
        let issuer = Arc::new(IssuerService::new(
            identity,
            config.issuer.name.clone(),
            queue.clone(),
        ));
        let (shutdown_tx, _) = watch::channel(false);

        tracing::info!(
            did = %issuer.did(),
            name = %config.issuer.name,
            ledger = ledger.ledger_id(),
            "Haven issuer node created"
        );

        Ok(Self {
            config,
            ledger,
            queue,
            issuer,
            shutdown_tx,
            flush_timer: None,
        })
    }

    pub fn issuer(&self) -> &Arc<IssuerService> {
        &self.issuer
    }

    pub fn queue(&self) -> &Arc<AnchorQueue> {
        &self.queue
    }

    pub fn ledger(&self) -> &Arc<InMemoryLedger> {
        &self.ledger
    }

    /// Start the periodic flush timer.
    pub fn start(&mut self) {
        if self.flush_timer.is_some() {
            return;
        }
        let interval = self.config.anchor.flush_interval();
        self.flush_timer = Some(
            self.queue
                .spawn_flush_timer(interval, self.shutdown_tx.subscribe()),
        );
        tracing::info!(
            interval_secs = interval.as_secs(),
            batch_threshold = self.config.anchor.batch_threshold,
            "anchor flush timer started"
        );
    }

    /// Log anchoring status until shutdown is signalled.
    pub async fn run(&self) -> Result<()> {
        let mut shutdown = self.shutdown_tx.subscribe();
        if *shutdown.borrow() {
            return Ok(());
        }
        let mut ticker = tokio::time::interval(STATUS_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let stats = self.issuer.stats();
                    tracing::info!(
                        pending_anchors = stats.pending_anchors,
                        flushing = stats.flushing,
                        block_height = self.ledger.block_height(),
                        "node status"
                    );
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Stop the timer and make one last bounded attempt to anchor whatever
    /// is still pending.
    pub async fn shutdown(&mut self) -> Result<FlushOutcome> {
        self.shutdown_tx.send_replace(true);
        if let Some(timer) = self.flush_timer.take() {
            if let Err(e) = timer.await {
                tracing::warn!(error = %e, "flush timer task ended abnormally");
            }
        }

        let limit = self.config.anchor.submit_timeout() + self.config.anchor.confirmation_timeout();
        let outcome = match tokio::time::timeout(limit, self.queue.flush()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(pending = self.queue.pending_len(), "final flush timed out");
                return Ok(FlushOutcome::Failed {
                    error: haven_anchor::AnchorError::LedgerTimeout(format!(
                        "final flush did not complete within {:?}",
                        limit
                    )),
                    retained: self.queue.pending_len(),
                });
            }
        };

        match &outcome {
            FlushOutcome::Anchored(records) => {
                tracing::info!(batch = records.len(), "final flush anchored pending credentials")
            }
            FlushOutcome::Failed { error, retained } => {
                tracing::warn!(error = %error, retained, "final flush failed; credentials left unanchored")
            }
            FlushOutcome::Idle | FlushOutcome::AlreadyFlushing => {}
        }
        Ok(outcome)
    }
}
