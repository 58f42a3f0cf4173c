//! Haven credential services: issuer, holder wallet and verifier.

pub mod error;
pub mod holder;
pub mod issuer;
pub mod verifier;

pub use error::CredentialError;
pub use holder::{ShareableBundle, StoredCredential, Wallet, WalletSnapshot};
pub use issuer::{IssuerInfo, IssuerService, IssuerStats};
pub use verifier::{
    CredentialSummary, CredentialVerifier, VerificationCheck, VerificationResult, CHECK_ANCHORED,
    CHECK_NOT_EXPIRED, CHECK_NOT_REVOKED, CHECK_SIGNATURE,
};
