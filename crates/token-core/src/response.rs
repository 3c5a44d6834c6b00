//! The value types an issuance call hands back to the caller.

use crate::claims::{AccessClaims, RefreshClaims};

/// A freshly issued access token: the signed compact string plus the
/// typed claims that were stamped into it.
#[derive(Debug, Clone)]
pub struct AccessTokenResponse {
    pub token: String,
    pub claims: AccessClaims,
}

/// A freshly issued refresh token: the signed compact string plus the
/// typed claims that were stamped into it.
#[derive(Debug, Clone)]
pub struct RefreshTokenResponse {
    pub token: String,
    pub claims: RefreshClaims,
}
