//! Credential signing and verification.
//!
//! The signed message is the SHA-256 digest of the credential's canonical
//! bytes. A well-formed signature that does not match is reported as `false`;
//! errors are reserved for inputs that cannot be parsed as key or signature
//! material.

use haven_crypto::{sha256, Digest, KeyPair, PublicKey, Signature};

use crate::credentials::{Credential, SignedCredential};
use crate::did::identifier_to_public_key;
use crate::error::IdentityError;

fn digest(credential: &Credential) -> Result<Digest, IdentityError> {
    let canonical = credential.canonicalize()?;
    Ok(sha256(canonical.as_bytes()))
}

pub(crate) fn sign_with(credential: &Credential, keypair: &KeyPair) -> Result<Signature, IdentityError> {
    let message = digest(credential)?;
    Ok(haven_crypto::sign(&message, keypair))
}

/// Sign a credential with a raw 32-byte Ed25519 private key.
pub fn sign(credential: &Credential, private_key: &[u8]) -> Result<Signature, IdentityError> {
    let keypair =
        KeyPair::from_bytes(private_key).map_err(|e| IdentityError::SigningError(e.to_string()))?;
    sign_with(credential, &keypair)
}

/// Verify a credential signature against a raw 32-byte public key.
pub fn verify(
    credential: &Credential,
    signature: &[u8],
    public_key: &[u8],
) -> Result<bool, IdentityError> {
    let signature =
        Signature::from_bytes(signature).map_err(|e| IdentityError::MalformedSignature(e.to_string()))?;
    let public_key =
        PublicKey::from_bytes(public_key).map_err(|e| IdentityError::MalformedKey(e.to_string()))?;
    let message = digest(credential)?;
    Ok(haven_crypto::verify(&message, &signature, &public_key).is_ok())
}

/// [`sign`] with a hex-encoded private key, returning lowercase hex.
pub fn sign_hex(credential: &Credential, private_key_hex: &str) -> Result<String, IdentityError> {
    let keypair =
        KeyPair::from_hex(private_key_hex).map_err(|e| IdentityError::SigningError(e.to_string()))?;
    Ok(sign_with(credential, &keypair)?.to_hex())
}

/// [`verify`] with hex-encoded signature and public key.
pub fn verify_hex(
    credential: &Credential,
    signature_hex: &str,
    public_key_hex: &str,
) -> Result<bool, IdentityError> {
    let signature = hex::decode(signature_hex)
        .map_err(|e| IdentityError::MalformedSignature(format!("invalid hex: {}", e)))?;
    let public_key = hex::decode(public_key_hex)
        .map_err(|e| IdentityError::MalformedKey(format!("invalid hex: {}", e)))?;
    verify(credential, &signature, &public_key)
}

/// Verify a transmitted bundle, resolving the key from the issuer's DID.
pub fn verify_signed(signed: &SignedCredential) -> Result<bool, IdentityError> {
    let public_key = identifier_to_public_key(signed.credential.issuer.uri())?;
    let signature = hex::decode(&signed.signature)
        .map_err(|e| IdentityError::MalformedSignature(format!("invalid hex: {}", e)))?;
    verify(&signed.credential, &signature, &public_key)
}
