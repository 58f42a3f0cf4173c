/// Credential service errors.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("invalid credential signature: {0}")]
    InvalidSignature(String),

    #[error("credential has been revoked: {0}")]
    Revoked(String),

    #[error("credential has expired: {0}")]
    Expired(String),

    #[error("invalid expiration: {0}")]
    InvalidExpiration(String),

    #[error("credential subject {subject} does not match wallet owner {owner}")]
    SubjectMismatch { subject: String, owner: String },

    #[error("credential {credential_id} was not issued by {issuer}")]
    NotIssuer {
        credential_id: String,
        issuer: String,
    },

    #[error("identity error: {0}")]
    Identity(#[from] haven_identity::IdentityError),

    #[error("anchor error: {0}")]
    Anchor(#[from] haven_anchor::AnchorError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
