//! Canonical serialization for signing and fingerprinting.
//!
//! `CanonicalBytes` is the only input accepted by signature and digest code.
//! Its sole constructor serializes through `serde_json::Value` and renders the
//! result with RFC 8785 (JSON Canonicalization Scheme): object keys sorted by
//! UTF-16 code units, no insignificant whitespace, ECMAScript number format.
//! Two values that are field-wise equal therefore produce identical bytes no
//! matter how or in which order they were built.

use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;

/// Top-level fields that carry signature material and never take part in the
/// signed or hashed form of a document.
pub const SIGNATURE_FIELDS: [&str; 2] = ["proof", "signature"];

/// Bytes produced exclusively by JCS canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value, dropping top-level
    /// [`SIGNATURE_FIELDS`] if present.
    pub fn new(obj: &impl Serialize) -> Result<Self, CoreError> {
        Self::excluding(obj, &SIGNATURE_FIELDS)
    }

    /// Canonicalize a value after removing the given top-level object keys.
    pub fn excluding(obj: &impl Serialize, excluded: &[&str]) -> Result<Self, CoreError> {
        let mut value = serde_json::to_value(obj)?;
        if let Value::Object(map) = &mut value {
            for key in excluded {
                map.remove(*key);
            }
        }
        let bytes = serde_jcs::to_vec(&value)?;
        Ok(Self(bytes))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}
