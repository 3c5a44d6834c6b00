//! The non-repository-backend core of the token lifecycle engine: claim
//! records, the claim codec, the repository contract (plus its in-memory
//! backend), the cleanup scheduler, and the Token Maker orchestrator that
//! ties them together.
//!
//! Backend-specific repository implementations (Redis, MySQL) live in
//! sibling crates (`token-cache`, `token-db`) that depend on this crate
//! only for the [`TokenRepository`] trait and [`TokenError`].

pub mod claims;
pub mod cleanup;
pub mod codec;
pub mod config;
pub mod error;
pub mod maker;
pub mod repository;
pub mod response;

pub use claims::{AccessClaims, ClaimTimestamps, RefreshClaims, TokenKind, MAX_USERNAME_BYTES};
pub use cleanup::CleanupScheduler;
pub use config::MakerConfig;
pub use error::TokenError;
pub use maker::TokenMaker;
pub use repository::{fingerprint, InMemoryTokenRepository, TokenRepository};
pub use response::{AccessTokenResponse, RefreshTokenResponse};
