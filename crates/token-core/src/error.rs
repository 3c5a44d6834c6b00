//! Caller-facing error kinds for the token lifecycle engine.

use thiserror::Error;

use token_crypto::SignerError;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to load key material: {0}")]
    KeyLoadFailed(String),

    #[error("insecure key permissions: {0}")]
    InsecureKeyPermissions(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("malformed token")]
    MalformedToken,

    #[error("token algorithm does not match the configured algorithm")]
    AlgorithmMismatch,

    #[error("bad signature")]
    BadSignature,

    #[error("missing required claim: {0}")]
    MissingRequiredClaim(String),

    #[error("malformed claim: {0}")]
    MalformedClaim(String),

    #[error("token has expired")]
    Expired,

    #[error("token issued in the future")]
    FutureIssue,

    #[error("token exceeded its maximum lifetime")]
    MaxLifetimeExceeded,

    #[error("token kind does not match the expected kind")]
    KindMismatch,

    #[error("token has been revoked")]
    Revoked,

    #[error("token has already been rotated")]
    Rotated,

    #[error("feature disabled: {0}")]
    FeatureDisabled(String),

    #[error("repository error: {0}")]
    RepositoryError(String),

    #[error("cryptographic operation failed: {0}")]
    CryptoFailure(String),
}

impl From<SignerError> for TokenError {
    fn from(err: SignerError) -> Self {
        match err {
            SignerError::InvalidConfig(msg) => TokenError::InvalidConfig(msg),
            SignerError::KeyLoadFailed(msg) => TokenError::KeyLoadFailed(msg),
            SignerError::InsecureKeyPermissions(msg) => TokenError::InsecureKeyPermissions(msg),
            SignerError::Malformed => TokenError::MalformedToken,
            SignerError::AlgorithmMismatch => TokenError::AlgorithmMismatch,
            SignerError::BadSignature => TokenError::BadSignature,
            SignerError::CryptoFailure(msg) => TokenError::CryptoFailure(msg),
        }
    }
}
