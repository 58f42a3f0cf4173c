//! Self-certifying `did:key` identities.
//!
//! The identifier is `did:key:z` followed by the base58btc encoding of the
//! Ed25519 multicodec tag (`0xed 0x01`) and the 32-byte public key, so the key
//! can always be recovered from the identifier alone.

use haven_core::{Did, DID_KEY_PREFIX};
use haven_crypto::{CryptoError, KeyPair, PublicKey, Signature, PUBLIC_KEY_LENGTH};
use serde::{Deserialize, Serialize};
use std::path::Path;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::credentials::Credential;
use crate::error::IdentityError;

/// Multicodec tag of an Ed25519 public key (varint `0xed`).
pub const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];

/// An Ed25519 key pair together with its `did:key` identifier.
#[derive(Debug)]
pub struct Identity {
    identifier: Did,
    keypair: KeyPair,
}

impl Identity {
    /// Generate a fresh identity from OS entropy.
    pub fn generate() -> Result<Self, IdentityError> {
        let keypair = KeyPair::generate().map_err(|e| match e {
            CryptoError::EntropyUnavailable(msg) => IdentityError::EntropyUnavailable(msg),
            other => IdentityError::EntropyUnavailable(other.to_string()),
        })?;
        let identity = Self::from_keypair(keypair)?;
        tracing::info!(did = %identity.identifier, "identity generated");
        Ok(identity)
    }

    /// Rebuild an identity from persisted 32-byte private key material.
    pub fn from_private_key(private_key: &[u8]) -> Result<Self, IdentityError> {
        let keypair =
            KeyPair::from_bytes(private_key).map_err(|e| IdentityError::MalformedKey(e.to_string()))?;
        Self::from_keypair(keypair)
    }

    fn from_keypair(keypair: KeyPair) -> Result<Self, IdentityError> {
        let identifier = identifier_for(&keypair.public_key())?;
        Ok(Self {
            identifier,
            keypair,
        })
    }

    /// The `did:key` identifier.
    pub fn identifier(&self) -> &Did {
        &self.identifier
    }

    pub fn public_key(&self) -> PublicKey {
        self.keypair.public_key()
    }

    pub fn keypair(&self) -> &KeyPair {
        &self.keypair
    }

    /// Sign a credential with this identity's private key.
    pub fn sign(&self, credential: &Credential) -> Result<Signature, IdentityError> {
        crate::signature::sign_with(credential, &self.keypair)
    }

    /// Export to the opaque persistence form (hex-encoded keys).
    pub fn export(&self) -> IdentityExport {
        let mut secret = self.keypair.secret_bytes();
        let export = IdentityExport {
            did: self.identifier.to_string(),
            public_key: self.public_key().to_hex(),
            private_key: hex::encode(secret),
        };
        secret.zeroize();
        export
    }

    /// Restore from the persistence form. The stored identifier and public
    /// key must match the ones derived from the private key.
    pub fn import(export: &IdentityExport) -> Result<Self, IdentityError> {
        let keypair = KeyPair::from_hex(&export.private_key)
            .map_err(|e| IdentityError::MalformedKey(e.to_string()))?;
        let identity = Self::from_keypair(keypair)?;

        if identity.identifier.uri() != export.did {
            return Err(IdentityError::ExportMismatch(format!(
                "stored DID {} does not match key-derived DID {}",
                export.did, identity.identifier
            )));
        }
        if !identity.public_key().to_hex().eq_ignore_ascii_case(&export.public_key) {
            return Err(IdentityError::ExportMismatch(
                "stored public key does not match private key".into(),
            ));
        }
        Ok(identity)
    }

    /// Read an identity export file written by [`Identity::save_to_file`].
    pub fn load_from_file(path: &Path) -> Result<Self, IdentityError> {
        let contents = std::fs::read_to_string(path).map_err(|e| file_error(path, e))?;
        let export: IdentityExport = serde_json::from_str(&contents)?;
        Self::import(&export)
    }

    /// Write the export as JSON, creating parent directories. On Unix the
    /// file is readable by its owner only.
    pub fn save_to_file(&self, path: &Path) -> Result<(), IdentityError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| file_error(path, e))?;
        }
        let contents = serde_json::to_string_pretty(&self.export())?;
        std::fs::write(path, contents).map_err(|e| file_error(path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .map_err(|e| file_error(path, e))?;
        }
        Ok(())
    }
}

fn file_error(path: &Path, source: std::io::Error) -> IdentityError {
    IdentityError::File {
        path: path.display().to_string(),
        source,
    }
}

/// Persisted form of an [`Identity`]. Secret material is wiped on drop.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct IdentityExport {
    pub did: String,
    pub public_key: String,
    pub private_key: String,
}

impl std::fmt::Debug for IdentityExport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityExport")
            .field("did", &self.did)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Derive the `did:key` identifier of a public key.
pub fn identifier_for(public_key: &PublicKey) -> Result<Did, IdentityError> {
    let mut tagged = Vec::with_capacity(ED25519_MULTICODEC.len() + PUBLIC_KEY_LENGTH);
    tagged.extend_from_slice(&ED25519_MULTICODEC);
    tagged.extend_from_slice(public_key.as_bytes());
    let encoded = bs58::encode(tagged).into_string();
    Did::from_multibase_payload(&encoded).map_err(|e| IdentityError::MalformedIdentifier(e.to_string()))
}

/// Recover the raw 32-byte public key embedded in a `did:key` identifier.
pub fn identifier_to_public_key(identifier: &str) -> Result<[u8; PUBLIC_KEY_LENGTH], IdentityError> {
    let payload = identifier.strip_prefix(DID_KEY_PREFIX).ok_or_else(|| {
        IdentityError::MalformedIdentifier(format!("missing '{}' prefix: {}", DID_KEY_PREFIX, identifier))
    })?;

    let decoded = bs58::decode(payload)
        .into_vec()
        .map_err(|e| IdentityError::MalformedIdentifier(format!("invalid base58: {}", e)))?;

    let key = decoded.strip_prefix(&ED25519_MULTICODEC[..]).ok_or_else(|| {
        IdentityError::MalformedIdentifier("missing Ed25519 multicodec tag".into())
    })?;

    key.try_into().map_err(|_| {
        IdentityError::MalformedIdentifier(format!(
            "expected {} key bytes, got {}",
            PUBLIC_KEY_LENGTH,
            key.len()
        ))
    })
}

/// Syntactic pre-check; does not check the multicodec tag or key length.
pub fn is_valid_identifier(identifier: &str) -> bool {
    Did::is_valid(identifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("haven-identity-{}", uuid::Uuid::now_v7()))
            .join(name)
    }

    #[test]
    fn test_generate_roundtrip() {
        for _ in 0..16 {
            let identity = Identity::generate().unwrap();
            let recovered = identifier_to_public_key(identity.identifier().uri()).unwrap();
            assert_eq!(&recovered, identity.public_key().as_bytes());
        }
    }

    #[test]
    fn test_identifier_shape() {
        let identity = Identity::generate().unwrap();
        let uri = identity.identifier().uri();
        assert!(uri.starts_with("did:key:z6Mk"));
        assert!(is_valid_identifier(uri));
    }

    #[test]
    fn test_deterministic_identifier() {
        let a = Identity::from_private_key(&[9u8; 32]).unwrap();
        let b = Identity::from_private_key(&[9u8; 32]).unwrap();
        assert_eq!(a.identifier(), b.identifier());
        assert_eq!(
            identifier_to_public_key(a.identifier().uri()).unwrap(),
            *a.public_key().as_bytes()
        );
    }

    #[test]
    fn test_malformed_prefix() {
        let err = identifier_to_public_key("did:web:example.com").unwrap_err();
        assert!(matches!(err, IdentityError::MalformedIdentifier(_)));
    }

    #[test]
    fn test_malformed_base58() {
        let err = identifier_to_public_key("did:key:z0OIl").unwrap_err();
        assert!(matches!(err, IdentityError::MalformedIdentifier(_)));
    }

    #[test]
    fn test_wrong_tag() {
        let mut tagged = vec![0xe7, 0x01];
        tagged.extend_from_slice(&[1u8; 32]);
        let did = format!("did:key:z{}", bs58::encode(tagged).into_string());
        assert!(matches!(
            identifier_to_public_key(&did),
            Err(IdentityError::MalformedIdentifier(_))
        ));
    }

    #[test]
    fn test_wrong_length() {
        let mut tagged = ED25519_MULTICODEC.to_vec();
        tagged.extend_from_slice(&[1u8; 31]);
        let did = format!("did:key:z{}", bs58::encode(tagged).into_string());
        assert!(matches!(
            identifier_to_public_key(&did),
            Err(IdentityError::MalformedIdentifier(_))
        ));
    }

    #[test]
    fn test_is_valid_identifier() {
        assert!(is_valid_identifier("did:key:zRecipient"));
        assert!(!is_valid_identifier("did:key:z"));
        assert!(!is_valid_identifier("did:example:123"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn test_from_private_key() {
        let identity = Identity::generate().unwrap();
        let restored = Identity::from_private_key(&identity.keypair().secret_bytes()).unwrap();
        assert_eq!(restored.identifier(), identity.identifier());
    }

    #[test]
    fn test_from_private_key_malformed() {
        assert!(matches!(
            Identity::from_private_key(&[0u8; 10]),
            Err(IdentityError::MalformedKey(_))
        ));
    }

    #[test]
    fn test_export_import_roundtrip() {
        let identity = Identity::generate().unwrap();
        let export = identity.export();
        assert_eq!(export.did, identity.identifier().uri());
        assert_eq!(export.private_key.len(), 64);

        let json = serde_json::to_string(&export).unwrap();
        assert!(json.contains("\"publicKey\""));
        assert!(json.contains("\"privateKey\""));

        let parsed: IdentityExport = serde_json::from_str(&json).unwrap();
        let restored = Identity::import(&parsed).unwrap();
        assert_eq!(restored.identifier(), identity.identifier());
    }

    #[test]
    fn test_import_rejects_mismatched_did() {
        let a = Identity::generate().unwrap();
        let b = Identity::generate().unwrap();
        let mut export = a.export();
        export.did = b.identifier().to_string();
        assert!(matches!(
            Identity::import(&export),
            Err(IdentityError::ExportMismatch(_))
        ));
    }

    #[test]
    fn test_export_debug_hides_private_key() {
        let identity = Identity::generate().unwrap();
        let export = identity.export();
        assert!(!format!("{:?}", export).contains(&export.private_key));
    }

    #[test]
    fn test_file_save_then_load() {
        let path = temp_path("keys/issuer.json");
        let identity = Identity::generate().unwrap();
        identity.save_to_file(&path).unwrap();

        let loaded = Identity::load_from_file(&path).unwrap();
        assert_eq!(loaded.identifier(), identity.identifier());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
        std::fs::remove_dir_all(path.parent().unwrap().parent().unwrap()).ok();
    }

    #[test]
    fn test_file_load_errors() {
        let missing = temp_path("missing.json");
        assert!(matches!(
            Identity::load_from_file(&missing),
            Err(IdentityError::File { .. })
        ));

        let corrupt = temp_path("corrupt.json");
        std::fs::create_dir_all(corrupt.parent().unwrap()).unwrap();
        std::fs::write(&corrupt, "not json").unwrap();
        assert!(matches!(
            Identity::load_from_file(&corrupt),
            Err(IdentityError::Serialization(_))
        ));
        std::fs::remove_dir_all(corrupt.parent().unwrap()).ok();
    }
}
