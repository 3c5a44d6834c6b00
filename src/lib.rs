//! JWT access/refresh token lifecycle engine: issuance, verification,
//! revocation, and exactly-once rotation, with pluggable persistent state
//! for revocation/rotation tracking.
//!
//! This crate is a thin facade over three workspace crates:
//! - [`token_crypto`] — the [`Signer`] and its key material.
//! - [`token_core`] — claims, the claim codec, the repository contract
//!   and its in-memory backend, the cleanup scheduler, and the
//!   [`TokenMaker`] orchestrator.
//! - [`token_cache`]/[`token_db`] — the Redis and MySQL repository
//!   backends, gated behind the `redis-repository`/`sql-repository`
//!   features.
//!
//! Construct a [`Signer`] from key material, build a [`MakerConfig`], pick
//! a [`TokenRepository`] (or omit it if neither revocation nor rotation is
//! enabled), and hand all three to [`TokenMaker::new`].

pub use token_crypto::{AlgorithmId, ClaimMap, KeyMaterial, Signer, SignerConfig, SignerError, SigningScheme};

pub use token_core::{
    fingerprint, AccessClaims, AccessTokenResponse, CleanupScheduler, ClaimTimestamps,
    InMemoryTokenRepository, MakerConfig, RefreshClaims, RefreshTokenResponse, TokenError,
    TokenKind, TokenMaker, TokenRepository, MAX_USERNAME_BYTES,
};

#[cfg(feature = "redis-repository")]
pub use token_cache::RedisTokenRepository;

#[cfg(feature = "sql-repository")]
pub use token_db::MySqlTokenRepository;
