//! Error types for signing and key management.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("invalid signer configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to load key material: {0}")]
    KeyLoadFailed(String),

    #[error("private key file permissions allow access beyond the owner: {0}")]
    InsecureKeyPermissions(String),

    #[error("token is not a well-formed compact JWS")]
    Malformed,

    #[error("token algorithm does not match the algorithm this signer was constructed with")]
    AlgorithmMismatch,

    #[error("signature verification failed")]
    BadSignature,

    #[error("cryptographic operation failed: {0}")]
    CryptoFailure(String),
}
