//! Fixtures shared by the cross-crate integration tests.

use std::sync::Arc;

use haven_anchor::{AnchorQueue, InMemoryLedger};
use haven_core::{AnchorPolicy, TrustPolicy};
use haven_credentials::{IssuerService, Wallet};
use haven_identity::Identity;

/// An issuer wired to an in-memory ledger.
pub struct Stack {
    pub ledger: Arc<InMemoryLedger>,
    pub queue: Arc<AnchorQueue>,
    pub issuer: IssuerService,
}

impl Stack {
    pub fn new(name: &str, batch_threshold: usize) -> Self {
        Self::with_ledger(Arc::new(InMemoryLedger::new()), name, batch_threshold)
    }

    /// A second issuer sharing an existing ledger.
    pub fn with_ledger(ledger: Arc<InMemoryLedger>, name: &str, batch_threshold: usize) -> Self {
        let policy = AnchorPolicy {
            batch_threshold,
            ..AnchorPolicy::default()
        };
        let queue = Arc::new(AnchorQueue::new(ledger.clone(), policy));
        let identity = Identity::generate().expect("entropy available in tests");
        let issuer = IssuerService::new(identity, name, queue.clone());
        Self {
            ledger,
            queue,
            issuer,
        }
    }
}

pub fn new_wallet() -> Wallet {
    Wallet::create(TrustPolicy::default()).expect("entropy available in tests")
}
