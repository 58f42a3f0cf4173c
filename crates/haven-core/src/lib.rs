//! Haven core: fundamental types, canonical serialization and policy
//! configuration shared by every Haven crate.

pub mod anchor_state;
pub mod canonical;
pub mod config;
pub mod error;
pub mod timestamp;
pub mod types;

pub use anchor_state::{AnchorEvent, AnchorState, AnchorStateMachine};
pub use canonical::{CanonicalBytes, SIGNATURE_FIELDS};
pub use config::{AnchorPolicy, TrustPolicy};
pub use error::CoreError;
pub use types::{CredentialType, Did, DID_KEY_PREFIX, VC_CONTEXT_V1, VC_TYPE_MARKER};
