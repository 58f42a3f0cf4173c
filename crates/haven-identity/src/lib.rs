pub mod credentials;
pub mod did;
pub mod error;
pub mod signature;
pub mod trust_score;

pub use credentials::{Credential, CredentialSubject, Fingerprint, SignedCredential};
pub use did::{
    identifier_for, identifier_to_public_key, is_valid_identifier, Identity, IdentityExport,
    ED25519_MULTICODEC,
};
pub use error::IdentityError;
pub use signature::{sign, sign_hex, verify, verify_hex, verify_signed};
pub use trust_score::{calculate_trust_score, ScoreBreakdown, TrustScorer};
