//! Strongly-typed access/refresh claim records.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The fixed set of token kinds. Carried both on the wire (`typ`) and as
/// the caller's expectation at verification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common timestamp fields shared by both claim kinds.
#[derive(Debug, Clone)]
pub struct ClaimTimestamps {
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub not_before: DateTime<Utc>,
    pub max_lifetime_expiry: DateTime<Utc>,
}

/// An access claim record — the typed form of an `access` token's payload.
#[derive(Debug, Clone)]
pub struct AccessClaims {
    pub token_id: Uuid,
    pub subject: Uuid,
    pub session_id: Option<Uuid>,
    pub username: String,
    pub issuer: String,
    pub audience: Vec<String>,
    pub roles: Vec<String>,
    pub timestamps: ClaimTimestamps,
}

impl AccessClaims {
    pub fn kind(&self) -> TokenKind {
        TokenKind::Access
    }
}

/// A refresh claim record — identical to [`AccessClaims`] minus `roles`.
#[derive(Debug, Clone)]
pub struct RefreshClaims {
    pub token_id: Uuid,
    pub subject: Uuid,
    pub session_id: Option<Uuid>,
    pub username: String,
    pub issuer: String,
    pub audience: Vec<String>,
    pub timestamps: ClaimTimestamps,
}

impl RefreshClaims {
    pub fn kind(&self) -> TokenKind {
        TokenKind::Refresh
    }
}

pub const MAX_USERNAME_BYTES: usize = 1024;
