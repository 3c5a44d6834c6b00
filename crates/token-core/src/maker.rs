//! Token Maker: the orchestrator. Owns the [`Signer`], the
//! claim codec, and a repository handle; exposes issue/verify/revoke/rotate
//! and runs the cleanup scheduler.
//!
//! The verification pipeline is rejection-first and its ordering is load
//! bearing: cancellation, then revocation, then (for refresh tokens)
//! rotation — both consulted on the raw fingerprint before the signature
//! is ever checked — then signature verification, then claim decoding,
//! then the time-window checks, then the configured required-claim check.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration as ChronoDuration, Utc};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use token_crypto::Signer;

use crate::claims::{AccessClaims, ClaimTimestamps, RefreshClaims, TokenKind, MAX_USERNAME_BYTES};
use crate::cleanup::CleanupScheduler;
use crate::codec;
use crate::config::MakerConfig;
use crate::error::TokenError;
use crate::repository::{fingerprint, TokenRepository};
use crate::response::{AccessTokenResponse, RefreshTokenResponse};

/// Floor applied to a revoked/rotated entry's TTL so a clock-skewed or
/// already-expired token cannot desynchronize revocation.
const MIN_ENTRY_TTL: ChronoDuration = ChronoDuration::seconds(1);

/// Process-scoped orchestrator. Immutable after construction and safe to
/// share behind an `Arc` across arbitrarily many concurrent callers; the
/// only interior mutability is the repository's own and the cleanup
/// scheduler's shutdown guard.
pub struct TokenMaker {
    signer: Signer,
    config: MakerConfig,
    repository: Option<Arc<dyn TokenRepository>>,
    cleanup: Option<CleanupScheduler>,
}

fn check_cancelled(cancel: &CancellationToken) -> Result<(), TokenError> {
    if cancel.is_cancelled() {
        return Err(TokenError::Cancelled);
    }
    Ok(())
}

impl TokenMaker {
    /// Validates `config`, and — if revocation or rotation is enabled —
    /// starts the cleanup scheduler against `repository`. Fails
    /// `invalid_config` if either feature is enabled without a repository.
    pub fn new(
        config: MakerConfig,
        signer: Signer,
        repository: Option<Arc<dyn TokenRepository>>,
    ) -> Result<Self, TokenError> {
        config.validate()?;

        if (config.revocation_enabled || config.rotation_enabled) && repository.is_none() {
            return Err(TokenError::InvalidConfig(
                "revocation_enabled or rotation_enabled requires a repository".into(),
            ));
        }

        let cleanup = repository.as_ref().map(|repo| {
            CleanupScheduler::start(Arc::clone(repo), config.cleanup_interval, config.cleanup_batch_limit)
        });

        Ok(Self {
            signer,
            config,
            repository,
            cleanup,
        })
    }

    /// Signals the cleanup scheduler to stop. Idempotent; also runs on drop.
    pub fn shutdown(&self) {
        if let Some(scheduler) = &self.cleanup {
            scheduler.stop();
        }
    }

    fn repository(&self) -> Result<&Arc<dyn TokenRepository>, TokenError> {
        self.repository
            .as_ref()
            .ok_or_else(|| TokenError::FeatureDisabled("no repository configured".into()))
    }

    fn validate_issue_inputs(
        subject: Uuid,
        username: &str,
        roles: Option<&[String]>,
    ) -> Result<(), TokenError> {
        if subject.is_nil() {
            return Err(TokenError::InvalidArgument("subject must not be nil".into()));
        }
        if username.len() > MAX_USERNAME_BYTES {
            return Err(TokenError::InvalidArgument(format!(
                "username must be at most {MAX_USERNAME_BYTES} bytes"
            )));
        }
        if let Some(roles) = roles {
            if roles.is_empty() {
                return Err(TokenError::InvalidArgument(
                    "roles must contain at least one entry".into(),
                ));
            }
            if roles.iter().any(|r| r.is_empty()) {
                return Err(TokenError::InvalidArgument(
                    "roles must not contain an empty string".into(),
                ));
            }
        }
        Ok(())
    }

    /// Issues a fresh access token for `subject`.
    #[instrument(skip(self, username, roles), fields(subject = %subject))]
    pub fn issue_access(
        &self,
        subject: Uuid,
        username: &str,
        roles: Vec<String>,
        session_id: Option<Uuid>,
    ) -> Result<AccessTokenResponse, TokenError> {
        Self::validate_issue_inputs(subject, username, Some(&roles))?;

        let now = Utc::now();
        let claims = AccessClaims {
            token_id: Uuid::new_v4(),
            subject,
            session_id,
            username: username.to_string(),
            issuer: self.config.issuer.clone(),
            audience: self.config.audience.clone(),
            roles,
            timestamps: ClaimTimestamps {
                issued_at: now,
                expires_at: now + to_chrono(self.config.access_expiry),
                not_before: now,
                max_lifetime_expiry: now + to_chrono(self.config.access_max_lifetime),
            },
        };

        let map = codec::encode_access(&claims);
        let token = self.signer.sign(&map)?;
        Ok(AccessTokenResponse { token, claims })
    }

    /// Issues a fresh refresh token for `subject`.
    #[instrument(skip(self, username), fields(subject = %subject))]
    pub fn issue_refresh(
        &self,
        subject: Uuid,
        username: &str,
        session_id: Option<Uuid>,
    ) -> Result<RefreshTokenResponse, TokenError> {
        Self::validate_issue_inputs(subject, username, None)?;

        let now = Utc::now();
        let claims = RefreshClaims {
            token_id: Uuid::new_v4(),
            subject,
            session_id,
            username: username.to_string(),
            issuer: self.config.issuer.clone(),
            audience: self.config.audience.clone(),
            timestamps: ClaimTimestamps {
                issued_at: now,
                expires_at: now + to_chrono(self.config.refresh_expiry),
                not_before: now,
                max_lifetime_expiry: now + to_chrono(self.config.refresh_max_lifetime),
            },
        };

        let map = codec::encode_refresh(&claims);
        let token = self.signer.sign(&map)?;
        Ok(RefreshTokenResponse { token, claims })
    }

    fn check_time_window(&self, timestamps: &ClaimTimestamps) -> Result<(), TokenError> {
        let now = Utc::now();
        let skew = to_chrono(self.config.clock_skew);

        if timestamps.expires_at + skew <= now {
            return Err(TokenError::Expired);
        }
        if timestamps.issued_at > now + skew {
            return Err(TokenError::FutureIssue);
        }
        if timestamps.max_lifetime_expiry + skew <= now {
            return Err(TokenError::MaxLifetimeExceeded);
        }
        Ok(())
    }

    /// Verifies an access token end to end: optional revocation lookup,
    /// signature + algorithm pin, claim decode, and time-window checks.
    #[instrument(skip(self, token, cancel))]
    pub async fn verify_access(
        &self,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<AccessClaims, TokenError> {
        check_cancelled(cancel)?;

        if self.config.revocation_enabled {
            let repo = self.repository()?;
            if repo.is_revoked(&fingerprint(token)).await? {
                return Err(TokenError::Revoked);
            }
        }

        check_cancelled(cancel)?;
        let map = self.signer.verify(token)?;
        let claims = codec::decode_access(&map)?;
        self.check_time_window(&claims.timestamps)?;
        codec::check_required_claims(&map, &self.config.required_claims)?;
        Ok(claims)
    }

    /// Verifies a refresh token end to end, additionally consulting the
    /// rotated namespace before the signature is checked.
    #[instrument(skip(self, token, cancel))]
    pub async fn verify_refresh(
        &self,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<RefreshClaims, TokenError> {
        check_cancelled(cancel)?;

        if self.config.revocation_enabled {
            let repo = self.repository()?;
            if repo.is_revoked(&fingerprint(token)).await? {
                return Err(TokenError::Revoked);
            }
        }

        check_cancelled(cancel)?;

        if self.config.rotation_enabled {
            let repo = self.repository()?;
            if repo.is_rotated(&fingerprint(token)).await? {
                return Err(TokenError::Rotated);
            }
        }

        check_cancelled(cancel)?;
        let map = self.signer.verify(token)?;
        let claims = codec::decode_refresh(&map)?;
        self.check_time_window(&claims.timestamps)?;
        codec::check_required_claims(&map, &self.config.required_claims)?;
        Ok(claims)
    }

    async fn revoke(&self, token: &str, expected_kind: TokenKind) -> Result<(), TokenError> {
        if !self.config.revocation_enabled {
            return Err(TokenError::FeatureDisabled("revocation is disabled".into()));
        }
        let repo = self.repository()?;

        let map = self.signer.verify(token)?;
        let actual_kind = codec::decode_kind(&map)?;
        if actual_kind != expected_kind {
            return Err(TokenError::KindMismatch);
        }
        let timestamps = match expected_kind {
            TokenKind::Access => codec::decode_access(&map)?.timestamps,
            TokenKind::Refresh => codec::decode_refresh(&map)?.timestamps,
        };

        // Open Question O1: a negative or sub-second remaining TTL is not
        // rejected. We proceed with a one-second floor so a clock-skewed
        // client cannot desynchronize its own revocation by presenting an
        // already-expired token.
        let now = Utc::now();
        let remaining = timestamps.expires_at - now;
        let ttl = remaining.max(MIN_ENTRY_TTL);

        repo.revoke(&fingerprint(token), now + ttl).await
    }

    /// Revokes an access token before its natural expiry.
    pub async fn revoke_access(&self, token: &str) -> Result<(), TokenError> {
        self.revoke(token, TokenKind::Access).await
    }

    /// Revokes a refresh token before its natural expiry.
    pub async fn revoke_refresh(&self, token: &str) -> Result<(), TokenError> {
        self.revoke(token, TokenKind::Refresh).await
    }

    /// Rotates a live refresh token for a fresh one. This is the protocol's
    /// critical section: `mark_rotated_atomic` is the sole point at which
    /// concurrent contenders diverge, and it is never rolled back once it
    /// has returned `true`, even if issuing the replacement subsequently
    /// fails or is cancelled — the old token stays irreversibly burned.
    #[instrument(skip(self, old_token, cancel))]
    pub async fn rotate_refresh(
        &self,
        old_token: &str,
        cancel: &CancellationToken,
    ) -> Result<RefreshTokenResponse, TokenError> {
        if !self.config.rotation_enabled {
            return Err(TokenError::FeatureDisabled("rotation is disabled".into()));
        }

        let claims = self.verify_refresh(old_token, cancel).await?;

        check_cancelled(cancel)?;
        let repo = self.repository()?;
        let won = repo
            .mark_rotated_atomic(&fingerprint(old_token), claims.timestamps.max_lifetime_expiry)
            .await?;
        if !won {
            return Err(TokenError::Rotated);
        }

        self.issue_refresh(claims.subject, &claims.username, claims.session_id)
    }
}

fn to_chrono(d: StdDuration) -> ChronoDuration {
    ChronoDuration::from_std(d).unwrap_or(ChronoDuration::MAX)
}
