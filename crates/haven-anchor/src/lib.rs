//! Haven Anchoring Layer
//!
//! Batches credential fingerprints into ledger transactions, tracks anchor
//! and revocation state, and abstracts the ledger behind [`LedgerClient`] so
//! that concrete chains plug in as adapters.

pub mod adapters;
pub mod error;
pub mod queue;
pub mod status;
pub mod traits;
pub mod types;

pub use adapters::memory::{InMemoryLedger, Submission};
pub use error::AnchorError;
pub use queue::{AnchorQueue, Enqueued, FlushOutcome};
pub use status::{AnchorStatusReader, LedgerStatusReader};
pub use traits::LedgerClient;
pub use types::{AnchorRecord, AnchorStatus, Confirmation, Fingerprint, RevocationRecord, TransactionId};
