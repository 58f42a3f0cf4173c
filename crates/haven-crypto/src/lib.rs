pub mod error;
pub mod hashing;
pub mod keys;
pub mod signing;

pub use error::CryptoError;
pub use hashing::{merkle_root, sha256, Digest};
pub use keys::{KeyPair, PublicKey, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH};
pub use signing::{sign, verify, Signature, SIGNATURE_LENGTH};
