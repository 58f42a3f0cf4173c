use chrono::{DateTime, SubsecRound, Utc};
use haven_core::timestamp::{self, iso_millis, iso_millis_option};
use haven_core::{CanonicalBytes, CredentialType, Did, VC_CONTEXT_V1, VC_TYPE_MARKER};
use haven_crypto::{sha256, Digest};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::IdentityError;

/// A W3C verifiable credential as issued and transmitted by Haven.
///
/// Serializes to the camelCase wire shape. Immutable once signed: any field
/// change alters the canonical bytes and invalidates the signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Credential {
    #[serde(rename = "@context")]
    pub context: Vec<String>,
    /// `urn:uuid:<uuid>`
    pub id: String,
    /// `["VerifiableCredential", <semantic type>]`
    #[serde(rename = "type")]
    pub credential_type: Vec<String>,
    pub issuer: Did,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_name: Option<String>,
    #[serde(with = "iso_millis")]
    pub issuance_date: DateTime<Utc>,
    #[serde(
        default,
        with = "iso_millis_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub expiration_date: Option<DateTime<Utc>>,
    pub credential_subject: CredentialSubject,
}

/// Subject of a credential: its identifier plus flattened claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialSubject {
    pub id: Did,
    #[serde(flatten)]
    pub claims: Map<String, Value>,
}

impl Credential {
    /// Build an unsigned credential stamped with a fresh id and the current
    /// time. A claim named `id` is dropped in favour of the subject id.
    pub fn create(
        issuer: &Did,
        subject: &str,
        credential_type: impl Into<CredentialType>,
        claims: Value,
    ) -> Result<Self, IdentityError> {
        let subject_id =
            Did::new(subject).map_err(|_| IdentityError::InvalidSubject(subject.to_string()))?;

        let mut claims = match claims {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => return Err(IdentityError::InvalidClaims(other.to_string())),
        };
        claims.remove("id");

        let credential_type: CredentialType = credential_type.into();

        Ok(Self {
            context: vec![VC_CONTEXT_V1.to_string()],
            id: format!("urn:uuid:{}", Uuid::now_v7()),
            credential_type: vec![VC_TYPE_MARKER.to_string(), credential_type.to_string()],
            issuer: issuer.clone(),
            issuer_name: None,
            issuance_date: timestamp::now_millis(),
            expiration_date: None,
            credential_subject: CredentialSubject {
                id: subject_id,
                claims,
            },
        })
    }

    /// Set the expiration date (truncated to milliseconds).
    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration_date = Some(expiration.trunc_subsecs(3));
        self
    }

    /// Set the issuer display name.
    pub fn with_issuer_name(mut self, name: impl Into<String>) -> Self {
        self.issuer_name = Some(name.into());
        self
    }

    /// Canonical (JCS) bytes of the wire shape. Signature fields are never
    /// part of this form.
    ///
    /// Dates are rendered to the millisecond; a date with finer precision is
    /// an error.
    pub fn canonicalize(&self) -> Result<CanonicalBytes, IdentityError> {
        let dates = std::iter::once(("issuanceDate", &self.issuance_date))
            .chain(self.expiration_date.as_ref().map(|d| ("expirationDate", d)));
        for (field, date) in dates {
            if !timestamp::is_millis_precise(date) {
                return Err(IdentityError::ImpreciseTimestamp(format!(
                    "{} = {}",
                    field,
                    date.to_rfc3339()
                )));
            }
        }
        Ok(CanonicalBytes::new(self)?)
    }

    /// SHA-256 of the canonical bytes; the ledger-facing key.
    pub fn fingerprint(&self) -> Result<Fingerprint, IdentityError> {
        let canonical = self.canonicalize()?;
        Ok(Fingerprint(sha256(canonical.as_bytes())))
    }

    /// The semantic type (second entry of `type`), if present.
    pub fn semantic_type(&self) -> Option<CredentialType> {
        self.credential_type
            .get(1)
            .map(|name| CredentialType::from(name.as_str()))
    }

    pub fn subject(&self) -> &Did {
        &self.credential_subject.id
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.credential_subject.claims
    }

    /// Whether the credential has an expiration date before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date.map(|exp| exp < now).unwrap_or(false)
    }
}

/// The transmitted bundle: a credential and its hex-encoded signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignedCredential {
    pub credential: Credential,
    pub signature: String,
}

impl SignedCredential {
    pub fn fingerprint(&self) -> Result<Fingerprint, IdentityError> {
        self.credential.fingerprint()
    }
}

/// 32-byte SHA-256 credential fingerprint, rendered as `0x`-prefixed hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(Digest);

impl Fingerprint {
    pub fn from_bytes(bytes: Digest) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &Digest {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self)
    }
}

impl FromStr for Fingerprint {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(raw)
            .map_err(|e| IdentityError::MalformedFingerprint(format!("invalid hex: {}", e)))?;
        let digest: Digest = bytes.as_slice().try_into().map_err(|_| {
            IdentityError::MalformedFingerprint(format!("expected 32 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(digest))
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(fp: Fingerprint) -> Self {
        fp.to_hex()
    }
}
