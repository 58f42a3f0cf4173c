use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Prefix of every `did:key` identifier, including the base58btc multibase
/// marker `z`.
pub const DID_KEY_PREFIX: &str = "did:key:z";

/// JSON-LD context of a W3C verifiable credential.
pub const VC_CONTEXT_V1: &str = "https://www.w3.org/2018/credentials/v1";

/// Fixed first entry of every credential's `type` pair.
pub const VC_TYPE_MARKER: &str = "VerifiableCredential";

/// Alphabet used by base58btc (Bitcoin alphabet).
/// Self-certifying decentralized identifier.
/// Format: `did:key:z<base58btc>`
///
/// Construction checks the prefix and that the payload is base58btc.
/// Decoding the embedded key happens in `haven-identity`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Parse and syntactically validate a DID URI.
    pub fn new(uri: impl Into<String>) -> Result<Self, CoreError> {
        let uri = uri.into();
        if !Self::is_valid(&uri) {
            return Err(CoreError::InvalidDid(format!(
                "expected 'did:key:z<base58btc>', got: {}",
                uri
            )));
        }
        Ok(Self(uri))
    }

    /// Cheap syntactic check: `did:key:z` followed by one or more base58btc
    /// characters. Does not decode the payload.
    pub fn is_valid(uri: &str) -> bool {
        match uri.strip_prefix(DID_KEY_PREFIX) {
            Some(rest) => !rest.is_empty() && bs58::decode(rest).into_vec().is_ok(),
            None => false,
        }
    }

    /// Build a DID from an already base58btc-encoded multicodec key.
    pub fn from_multibase_payload(encoded: &str) -> Result<Self, CoreError> {
        Self::new(format!("{}{}", DID_KEY_PREFIX, encoded))
    }

    /// Get the full DID URI.
    pub fn uri(&self) -> &str {
        &self.0
    }

    /// The DID method (always `key`).
    pub fn method(&self) -> &str {
        "key"
    }

    /// The base58btc payload after the `z` multibase marker.
    pub fn multibase_payload(&self) -> &str {
        &self.0[DID_KEY_PREFIX.len()..]
    }
}

impl fmt::Display for Did {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Did {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Did {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

impl AsRef<str> for Did {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Semantic credential types recognised by the default trust policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CredentialType {
    /// A vouch from a community member or organisation.
    CommunityVouch,
    /// Registration with a refugee agency.
    RefugeeRegistration,
    /// Enrollment in a school.
    SchoolEnrollment,
    /// General health record.
    HealthRecord,
    /// Vaccination record.
    VaccinationRecord,
    /// Birth certificate.
    BirthCertificate,
    /// National identity document.
    NationalId,
    /// Passport.
    Passport,
    /// Driver license.
    DriverLicense,
    /// Any other type; contributes no base weight by default.
    Custom(String),
}

impl CredentialType {
    /// Every built-in (non-custom) type.
    pub const KNOWN: [CredentialType; 9] = [
        Self::CommunityVouch,
        Self::RefugeeRegistration,
        Self::SchoolEnrollment,
        Self::HealthRecord,
        Self::VaccinationRecord,
        Self::BirthCertificate,
        Self::NationalId,
        Self::Passport,
        Self::DriverLicense,
    ];

    /// Wire name of the type, as it appears in a credential's `type` pair.
    pub fn as_str(&self) -> &str {
        match self {
            Self::CommunityVouch => "CommunityVouch",
            Self::RefugeeRegistration => "RefugeeRegistration",
            Self::SchoolEnrollment => "SchoolEnrollment",
            Self::HealthRecord => "HealthRecord",
            Self::VaccinationRecord => "VaccinationRecord",
            Self::BirthCertificate => "BirthCertificate",
            Self::NationalId => "NationalID",
            Self::Passport => "Passport",
            Self::DriverLicense => "DriverLicense",
            Self::Custom(name) => name,
        }
    }

    /// Base trust weight under the default policy.
    pub fn default_weight(&self) -> u32 {
        match self {
            Self::CommunityVouch => 2,
            Self::RefugeeRegistration => 3,
            Self::SchoolEnrollment => 5,
            Self::HealthRecord => 5,
            Self::VaccinationRecord => 5,
            Self::BirthCertificate => 10,
            Self::DriverLicense => 20,
            Self::NationalId => 25,
            Self::Passport => 30,
            Self::Custom(_) => 0,
        }
    }

    /// Whether this is a custom type.
    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl From<&str> for CredentialType {
    fn from(name: &str) -> Self {
        Self::KNOWN
            .iter()
            .find(|t| t.as_str() == name)
            .cloned()
            .unwrap_or_else(|| Self::Custom(name.to_string()))
    }
}

impl From<String> for CredentialType {
    fn from(name: String) -> Self {
        Self::from(name.as_str())
    }
}

impl From<CredentialType> for String {
    fn from(t: CredentialType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for CredentialType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_did_new_valid() {
        let did = Did::new("did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK").unwrap();
        assert_eq!(did.method(), "key");
        assert_eq!(
            did.multibase_payload(),
            "6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK"
        );
    }

    #[test]
    fn test_did_invalid_prefix() {
        assert!(Did::new("did:web:example.com").is_err());
        assert!(Did::new("did:key:6Mkabc").is_err());
    }

    #[test]
    fn test_did_empty_payload() {
        assert!(!Did::is_valid("did:key:z"));
    }

    #[test]
    fn test_did_rejects_non_base58_chars() {
        // 0, O, I and l are not in the base58btc alphabet
        assert!(!Did::is_valid("did:key:z0abc"));
        assert!(!Did::is_valid("did:key:zOabc"));
        assert!(!Did::is_valid("did:key:zIabc"));
        assert!(!Did::is_valid("did:key:zlabc"));
        assert!(!Did::is_valid("did:key:zab c"));
    }

    #[test]
    fn test_did_display() {
        let did = Did::new("did:key:zRecipient").unwrap();
        assert_eq!(format!("{}", did), "did:key:zRecipient");
    }

    #[test]
    fn test_did_serde_validates() {
        let ok: Did = serde_json::from_str("\"did:key:zabc\"").unwrap();
        assert_eq!(ok.uri(), "did:key:zabc");
        let bad: Result<Did, _> = serde_json::from_str("\"did:example:123\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_did_serializes_as_plain_string() {
        let did = Did::new("did:key:zabc").unwrap();
        assert_eq!(serde_json::to_string(&did).unwrap(), "\"did:key:zabc\"");
    }

    #[test]
    fn test_credential_type_roundtrip_names() {
        for t in CredentialType::KNOWN.iter() {
            assert_eq!(&CredentialType::from(t.as_str()), t);
        }
        assert_eq!(CredentialType::NationalId.as_str(), "NationalID");
    }

    #[test]
    fn test_credential_type_custom() {
        let t = CredentialType::from("LibraryCard");
        assert!(t.is_custom());
        assert_eq!(t.default_weight(), 0);
        assert_eq!(format!("{}", t), "LibraryCard");
    }

    #[test]
    fn test_default_weights() {
        assert_eq!(CredentialType::RefugeeRegistration.default_weight(), 3);
        assert_eq!(CredentialType::BirthCertificate.default_weight(), 10);
        assert_eq!(CredentialType::Passport.default_weight(), 30);
    }
}
