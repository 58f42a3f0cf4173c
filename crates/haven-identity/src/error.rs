use haven_core::CoreError;

/// Identity-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("entropy source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("malformed identifier: {0}")]
    MalformedIdentifier(String),

    #[error("malformed key: {0}")]
    MalformedKey(String),

    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    #[error("invalid subject identifier: {0}")]
    InvalidSubject(String),

    #[error("claims must be a JSON object, got: {0}")]
    InvalidClaims(String),

    #[error("malformed fingerprint: {0}")]
    MalformedFingerprint(String),

    #[error("timestamp not exact to the millisecond: {0}")]
    ImpreciseTimestamp(String),

    #[error("signing failed: {0}")]
    SigningError(String),

    #[error("identity export mismatch: {0}")]
    ExportMismatch(String),

    #[error("identity file {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
