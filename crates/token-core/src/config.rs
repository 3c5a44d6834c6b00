//! Token Maker configuration surface. `MakerConfig` is pure data;
//! [`MakerConfig::validate`] is the only place construction can fail before
//! any key material is touched.

use std::time::Duration;

use crate::error::TokenError;

/// Configuration accepted by the Token Maker at construction time.
#[derive(Debug, Clone)]
pub struct MakerConfig {
    /// Issuer value stamped into every token this Maker issues.
    pub issuer: String,
    /// Audience values stamped into every token this Maker issues.
    pub audience: Vec<String>,
    /// Lifetime of a freshly issued access token.
    pub access_expiry: Duration,
    /// Hard ceiling on an access token's age regardless of rotation,
    /// measured from `iat`. Enforced in addition to, not instead of, `exp`.
    pub access_max_lifetime: Duration,
    /// Lifetime of a freshly issued refresh token.
    pub refresh_expiry: Duration,
    /// Hard ceiling on a refresh token's age, measured from `iat`.
    pub refresh_max_lifetime: Duration,
    /// Clock skew tolerated when checking `nbf`/`exp`/`iat` against "now".
    pub clock_skew: Duration,
    /// Extra claim names (beyond the fixed standard set) that must be
    /// present and non-empty for a token to verify.
    pub required_claims: Vec<String>,
    /// Whether revocation is enabled. When false, `revoke` always fails
    /// with `FeatureDisabled` and `verify` never consults the revoked
    /// namespace.
    pub revocation_enabled: bool,
    /// Whether rotation is enabled. When false, `rotate` always fails with
    /// `FeatureDisabled` and `verify-refresh` never consults the rotated
    /// namespace.
    pub rotation_enabled: bool,
    /// Informational per §9 Open Question O2: does not alter rotation
    /// behavior. Exposed for configuration-surface compatibility and
    /// validated as non-negative, nothing more.
    pub refresh_reuse_interval: Duration,
    /// Upper bound on how many expired repository entries a single
    /// cleanup pass removes, to bound pause time on a large backend.
    pub cleanup_batch_limit: usize,
    /// Interval between cleanup passes. Must be at least one minute.
    pub cleanup_interval: Duration,
}

impl MakerConfig {
    /// Validates the configuration, independent of any key material.
    ///
    /// Per Open Question O1, a zero or negative TTL is not rejected here —
    /// it is clamped to one second by the Maker at revocation time. This
    /// method rejects only combinations that can never be made sensible.
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.issuer.trim().is_empty() {
            return Err(TokenError::InvalidConfig("issuer must not be empty".into()));
        }
        if self.audience.is_empty() {
            return Err(TokenError::InvalidConfig(
                "audience must contain at least one entry".into(),
            ));
        }
        if self.audience.iter().any(|a| a.trim().is_empty()) {
            return Err(TokenError::InvalidConfig(
                "audience entries must not be empty".into(),
            ));
        }
        if self.access_expiry.is_zero() {
            return Err(TokenError::InvalidConfig(
                "access_expiry must be strictly positive".into(),
            ));
        }
        if self.refresh_expiry.is_zero() {
            return Err(TokenError::InvalidConfig(
                "refresh_expiry must be strictly positive".into(),
            ));
        }
        if self.access_max_lifetime < self.access_expiry {
            return Err(TokenError::InvalidConfig(
                "access_max_lifetime must be at least access_expiry".into(),
            ));
        }
        if self.refresh_max_lifetime < self.refresh_expiry {
            return Err(TokenError::InvalidConfig(
                "refresh_max_lifetime must be at least refresh_expiry".into(),
            ));
        }
        if self.cleanup_batch_limit == 0 {
            return Err(TokenError::InvalidConfig(
                "cleanup_batch_limit must be greater than zero".into(),
            ));
        }
        if self.cleanup_interval < Duration::from_secs(60) {
            return Err(TokenError::InvalidConfig(
                "cleanup_interval must be at least one minute".into(),
            ));
        }
        if self.required_claims.iter().any(|c| c.trim().is_empty()) {
            return Err(TokenError::InvalidConfig(
                "required_claims entries must not be empty".into(),
            ));
        }
        if (self.revocation_enabled || self.rotation_enabled) && self.cleanup_batch_limit == 0 {
            return Err(TokenError::InvalidConfig(
                "cleanup_batch_limit must be positive when revocation or rotation is enabled"
                    .into(),
            ));
        }
        Ok(())
    }
}

impl Default for MakerConfig {
    fn default() -> Self {
        Self {
            issuer: "token-engine".into(),
            audience: vec!["default".into()],
            access_expiry: Duration::from_secs(30 * 60),
            access_max_lifetime: Duration::from_secs(24 * 60 * 60),
            refresh_expiry: Duration::from_secs(7 * 24 * 60 * 60),
            refresh_max_lifetime: Duration::from_secs(30 * 24 * 60 * 60),
            clock_skew: Duration::from_secs(30),
            required_claims: Vec::new(),
            revocation_enabled: true,
            rotation_enabled: true,
            refresh_reuse_interval: Duration::ZERO,
            cleanup_batch_limit: 1000,
            cleanup_interval: Duration::from_secs(60),
        }
    }
}
