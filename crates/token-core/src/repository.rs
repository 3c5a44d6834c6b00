//! Token Repository contract and the in-memory backend.
//!
//! The repository never sees a raw token — only its [`fingerprint`], so a
//! leaked backend dump cannot be replayed as a bearer token.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::error::TokenError;

/// Returns the hex-encoded SHA-256 digest of a signed compact token. This
/// is the only form of a token the repository ever stores or looks up.
pub fn fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Storage contract for revocation and rotation state. Implementations
/// need only honor the atomicity of [`TokenRepository::mark_rotated_atomic`] —
/// everything else can be eventually-consistent within a single call.
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Records `fingerprint` as revoked until `expires_at`, after which a
    /// cleanup pass may forget it. Idempotent: revoking twice is not an error.
    async fn revoke(&self, fingerprint: &str, expires_at: DateTime<Utc>) -> Result<(), TokenError>;

    /// Returns whether `fingerprint` is currently recorded as revoked.
    async fn is_revoked(&self, fingerprint: &str) -> Result<bool, TokenError>;

    /// Atomically records `fingerprint` as rotated, returning `true` only
    /// if this call was the one that performed the insert. A second caller
    /// racing on the same fingerprint observes `false` and must not also
    /// treat itself as the rotation winner.
    async fn mark_rotated_atomic(
        &self,
        fingerprint: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, TokenError>;

    /// Returns whether `fingerprint` has already been rotated.
    async fn is_rotated(&self, fingerprint: &str) -> Result<bool, TokenError>;

    /// Unconditionally records `fingerprint` as rotated, overwriting any
    /// existing entry. Unlike [`TokenRepository::mark_rotated_atomic`] this
    /// offers no compare-and-set guarantee and must never be used on the
    /// concurrent rotation path — it exists for non-racy callers such as an
    /// administrative bulk-revocation tool that already knows no contender
    /// can be racing the same fingerprint.
    async fn mark_rotated(&self, fingerprint: &str, expires_at: DateTime<Utc>) -> Result<(), TokenError>;

    /// Returns the remaining time-to-live of a rotated entry, or `None` if
    /// no live entry exists for `fingerprint`.
    async fn rotation_ttl(&self, fingerprint: &str) -> Result<Option<chrono::Duration>, TokenError>;

    /// Removes entries whose recorded expiry is at or before `now`, up to
    /// `batch_limit` entries, and returns the number removed.
    async fn cleanup_expired(&self, now: DateTime<Utc>, batch_limit: usize) -> Result<usize, TokenError>;
}

#[derive(Default)]
struct Inner {
    revoked: HashMap<String, DateTime<Utc>>,
    rotated: HashMap<String, DateTime<Utc>>,
}

/// In-process repository backed by two `HashMap`s behind one
/// `tokio::sync::RwLock`. Suitable for single-instance deployments and
/// tests; state does not survive a restart and is not shared across
/// processes.
#[derive(Default)]
pub struct InMemoryTokenRepository {
    inner: RwLock<Inner>,
}

impl InMemoryTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn revoke(&self, fingerprint: &str, expires_at: DateTime<Utc>) -> Result<(), TokenError> {
        let mut inner = self.inner.write().await;
        inner.revoked.insert(fingerprint.to_string(), expires_at);
        Ok(())
    }

    async fn is_revoked(&self, fingerprint: &str) -> Result<bool, TokenError> {
        let inner = self.inner.read().await;
        Ok(inner
            .revoked
            .get(fingerprint)
            .is_some_and(|expires_at| *expires_at > Utc::now()))
    }

    async fn mark_rotated_atomic(
        &self,
        fingerprint: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, TokenError> {
        let mut inner = self.inner.write().await;
        // A present-but-expired entry is invisible (see `is_rotated`) but
        // still occupies the slot until swept; an atomic-mark race can only
        // be won against a live entry, so a stale one is overwritten here.
        if let Some(existing) = inner.rotated.get(fingerprint) {
            if *existing > Utc::now() {
                return Ok(false);
            }
        }
        inner.rotated.insert(fingerprint.to_string(), expires_at);
        Ok(true)
    }

    async fn is_rotated(&self, fingerprint: &str) -> Result<bool, TokenError> {
        let inner = self.inner.read().await;
        Ok(inner
            .rotated
            .get(fingerprint)
            .is_some_and(|expires_at| *expires_at > Utc::now()))
    }

    async fn mark_rotated(&self, fingerprint: &str, expires_at: DateTime<Utc>) -> Result<(), TokenError> {
        let mut inner = self.inner.write().await;
        inner.rotated.insert(fingerprint.to_string(), expires_at);
        Ok(())
    }

    async fn rotation_ttl(&self, fingerprint: &str) -> Result<Option<chrono::Duration>, TokenError> {
        let inner = self.inner.read().await;
        Ok(inner.rotated.get(fingerprint).and_then(|expires_at| {
            let remaining = *expires_at - Utc::now();
            (remaining > chrono::Duration::zero()).then_some(remaining)
        }))
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>, batch_limit: usize) -> Result<usize, TokenError> {
        let mut inner = self.inner.write().await;
        let mut removed = 0usize;

        let expired_revoked: Vec<String> = inner
            .revoked
            .iter()
            .filter(|(_, exp)| **exp <= now)
            .take(batch_limit)
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired_revoked {
            if removed >= batch_limit {
                break;
            }
            inner.revoked.remove(&key);
            removed += 1;
        }

        if removed < batch_limit {
            let remaining = batch_limit - removed;
            let expired_rotated: Vec<String> = inner
                .rotated
                .iter()
                .filter(|(_, exp)| **exp <= now)
                .take(remaining)
                .map(|(k, _)| k.clone())
                .collect();
            for key in expired_rotated {
                inner.rotated.remove(&key);
                removed += 1;
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn fingerprint_is_deterministic_and_does_not_leak_the_token() {
        let a = fingerprint("some.signed.token");
        let b = fingerprint("some.signed.token");
        assert_eq!(a, b);
        assert_ne!(a, "some.signed.token");
        assert_eq!(a.len(), 64);
    }

    #[tokio::test]
    async fn revoke_then_is_revoked() {
        let repo = InMemoryTokenRepository::new();
        let fp = fingerprint("token-a");
        assert!(!repo.is_revoked(&fp).await.unwrap());
        repo.revoke(&fp, Utc::now() + Duration::hours(1)).await.unwrap();
        assert!(repo.is_revoked(&fp).await.unwrap());
    }

    #[tokio::test]
    async fn only_one_concurrent_rotation_wins() {
        use std::sync::Arc;

        let repo = Arc::new(InMemoryTokenRepository::new());
        let fp = fingerprint("token-b");
        let expires_at = Utc::now() + Duration::hours(1);

        let mut handles = Vec::new();
        for _ in 0..5 {
            let repo = Arc::clone(&repo);
            let fp = fp.clone();
            handles.push(tokio::spawn(async move {
                repo.mark_rotated_atomic(&fp, expires_at).await.unwrap()
            }));
        }

        let mut wins = 0;
        for handle in handles {
            if handle.await.unwrap() {
                wins += 1;
            }
        }
        assert_eq!(wins, 1);
    }

    #[tokio::test]
    async fn rotation_ttl_reflects_remaining_life_and_absence() {
        let repo = InMemoryTokenRepository::new();
        let fp = fingerprint("token-c");

        assert!(repo.rotation_ttl(&fp).await.unwrap().is_none());

        repo.mark_rotated(&fp, Utc::now() + Duration::seconds(30))
            .await
            .unwrap();
        let ttl = repo.rotation_ttl(&fp).await.unwrap().unwrap();
        assert!(ttl > Duration::seconds(0) && ttl <= Duration::seconds(30));
    }

    #[tokio::test]
    async fn non_atomic_mark_rotated_overwrites_without_a_cas_guarantee() {
        let repo = InMemoryTokenRepository::new();
        let fp = fingerprint("token-d");
        repo.mark_rotated(&fp, Utc::now() + Duration::hours(1)).await.unwrap();
        assert!(repo.is_rotated(&fp).await.unwrap());
        // Overwriting is allowed; this path carries no exactly-once guarantee.
        repo.mark_rotated(&fp, Utc::now() + Duration::hours(2)).await.unwrap();
    }

    #[tokio::test]
    async fn cleanup_removes_only_expired_entries_up_to_the_batch_limit() {
        let repo = InMemoryTokenRepository::new();
        let past = Utc::now() - Duration::hours(1);
        let future = Utc::now() + Duration::hours(1);

        for i in 0..10 {
            repo.revoke(&format!("expired-{i}"), past).await.unwrap();
        }
        repo.revoke("still-valid", future).await.unwrap();

        let removed = repo.cleanup_expired(Utc::now(), 4).await.unwrap();
        assert_eq!(removed, 4);
        assert!(repo.is_revoked("still-valid").await.unwrap());

        let removed_rest = repo.cleanup_expired(Utc::now(), 100).await.unwrap();
        assert_eq!(removed_rest, 6);
    }
}
