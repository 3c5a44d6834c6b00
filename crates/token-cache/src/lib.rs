//! Key-value [`TokenRepository`] backend: Redis, relying on
//! native expiring keys and `SET key val NX PX ttl_ms` as the atomic
//! rotation primitive. No read-then-write path exists anywhere in this
//! implementation — the NX flag is what makes rotation race-free.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

use token_core::{TokenError, TokenRepository};

const DEFAULT_KEY_PREFIX: &str = "token-engine";
/// Floor applied to a computed TTL so a near-expiry or already-expired
/// entry still gets a key Redis will hold for at least this long, matching
/// the Maker's own one-second floor.
const MIN_TTL_MS: i64 = 1000;

/// A [`TokenRepository`] backed by a single Redis (or Redis-compatible)
/// instance, reached through a multiplexed, auto-reconnecting connection.
pub struct RedisTokenRepository {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisTokenRepository {
    /// Opens a connection manager against `redis_url`. The manager
    /// reconnects transparently on transport failure; callers do not need
    /// to retry at this layer.
    pub async fn connect(redis_url: &str) -> Result<Self, TokenError> {
        Self::connect_with_prefix(redis_url, DEFAULT_KEY_PREFIX).await
    }

    pub async fn connect_with_prefix(redis_url: &str, key_prefix: &str) -> Result<Self, TokenError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| TokenError::RepositoryError(format!("invalid redis url: {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| TokenError::RepositoryError(format!("redis connection failed: {e}")))?;
        Ok(Self {
            conn,
            key_prefix: key_prefix.to_string(),
        })
    }

    fn revoked_key(&self, fingerprint: &str) -> String {
        format!("{}:revoked:{}", self.key_prefix, fingerprint)
    }

    fn rotated_key(&self, fingerprint: &str) -> String {
        format!("{}:rotated:{}", self.key_prefix, fingerprint)
    }
}

fn ttl_millis(expires_at: DateTime<Utc>) -> i64 {
    let remaining = (expires_at - Utc::now()).num_milliseconds();
    remaining.max(MIN_TTL_MS)
}

#[async_trait]
impl TokenRepository for RedisTokenRepository {
    async fn revoke(&self, fingerprint: &str, expires_at: DateTime<Utc>) -> Result<(), TokenError> {
        let mut conn = self.conn.clone();
        let ttl_ms = ttl_millis(expires_at);
        let _: () = redis::cmd("SET")
            .arg(self.revoked_key(fingerprint))
            .arg(1)
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| TokenError::RepositoryError(format!("redis SET (revoke) failed: {e}")))?;
        Ok(())
    }

    async fn is_revoked(&self, fingerprint: &str) -> Result<bool, TokenError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn
            .exists(self.revoked_key(fingerprint))
            .await
            .map_err(|e| TokenError::RepositoryError(format!("redis EXISTS failed: {e}")))?;
        Ok(exists)
    }

    async fn mark_rotated_atomic(
        &self,
        fingerprint: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, TokenError> {
        let mut conn = self.conn.clone();
        let ttl_ms = ttl_millis(expires_at);
        let result: Option<String> = redis::cmd("SET")
            .arg(self.rotated_key(fingerprint))
            .arg(1)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| TokenError::RepositoryError(format!("redis SET NX (rotate) failed: {e}")))?;
        Ok(result.is_some())
    }

    async fn is_rotated(&self, fingerprint: &str) -> Result<bool, TokenError> {
        let mut conn = self.conn.clone();
        let exists: bool = conn
            .exists(self.rotated_key(fingerprint))
            .await
            .map_err(|e| TokenError::RepositoryError(format!("redis EXISTS failed: {e}")))?;
        Ok(exists)
    }

    async fn mark_rotated(&self, fingerprint: &str, expires_at: DateTime<Utc>) -> Result<(), TokenError> {
        let mut conn = self.conn.clone();
        let ttl_ms = ttl_millis(expires_at);
        let _: () = redis::cmd("SET")
            .arg(self.rotated_key(fingerprint))
            .arg(1)
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| TokenError::RepositoryError(format!("redis SET (mark_rotated) failed: {e}")))?;
        Ok(())
    }

    async fn rotation_ttl(&self, fingerprint: &str) -> Result<Option<chrono::Duration>, TokenError> {
        let mut conn = self.conn.clone();
        let ttl_ms: i64 = redis::cmd("PTTL")
            .arg(self.rotated_key(fingerprint))
            .query_async(&mut conn)
            .await
            .map_err(|e| TokenError::RepositoryError(format!("redis PTTL failed: {e}")))?;
        // PTTL returns -2 (no such key) or -1 (key exists, no TTL); neither
        // is reachable here since every rotated key is written with PX.
        if ttl_ms < 0 {
            Ok(None)
        } else {
            Ok(Some(chrono::Duration::milliseconds(ttl_ms)))
        }
    }

    /// Redis keys carry their own TTL; there is nothing to sweep. Backends
    /// with intrinsic expiry may treat this as a best-effort no-op.
    async fn cleanup_expired(&self, _now: DateTime<Utc>, _batch_limit: usize) -> Result<usize, TokenError> {
        debug!("redis repository relies on native key expiry; cleanup pass is a no-op");
        Ok(0)
    }
}

impl std::fmt::Debug for RedisTokenRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTokenRepository")
            .field("key_prefix", &self.key_prefix)
            .finish()
    }
}
