//! Relational [`TokenRepository`] backend: MySQL via `sqlx`.
//! A unique constraint on `fingerprint` in each table is the atomic
//! rotation primitive — `INSERT IGNORE` plus the affected-row count tells
//! the caller whether *this* call performed the insert, with no
//! read-then-write in between.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, Pool, Row};
use tracing::debug;

use token_core::{TokenError, TokenRepository};

/// A [`TokenRepository`] backed by a MySQL connection pool. The two
/// tables it reads and writes hold nothing but a fingerprint and an
/// expiry — no token material, claim data, or user identity ever reaches
/// this layer.
pub struct MySqlTokenRepository {
    pool: Pool<MySql>,
}

impl MySqlTokenRepository {
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// Creates the `revoked_tokens`/`rotated_tokens` tables if they do not
    /// already exist. Convenient for tests and local development; a
    /// production deployment is expected to manage schema through its own
    /// migration tooling instead of calling this at startup.
    pub async fn ensure_schema(&self) -> Result<(), TokenError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS revoked_tokens (
                fingerprint CHAR(64) NOT NULL PRIMARY KEY,
                expires_at DATETIME(6) NOT NULL,
                INDEX idx_revoked_expires_at (expires_at)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| TokenError::RepositoryError(format!("create revoked_tokens: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS rotated_tokens (
                fingerprint CHAR(64) NOT NULL PRIMARY KEY,
                expires_at DATETIME(6) NOT NULL,
                INDEX idx_rotated_expires_at (expires_at)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| TokenError::RepositoryError(format!("create rotated_tokens: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl TokenRepository for MySqlTokenRepository {
    async fn revoke(&self, fingerprint: &str, expires_at: DateTime<Utc>) -> Result<(), TokenError> {
        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (fingerprint, expires_at)
            VALUES (?, ?)
            ON DUPLICATE KEY UPDATE expires_at = VALUES(expires_at)
            "#,
        )
        .bind(fingerprint)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| TokenError::RepositoryError(format!("revoke upsert failed: {e}")))?;
        Ok(())
    }

    async fn is_revoked(&self, fingerprint: &str) -> Result<bool, TokenError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS hit
            FROM revoked_tokens
            WHERE fingerprint = ? AND expires_at > ?
            "#,
        )
        .bind(fingerprint)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TokenError::RepositoryError(format!("is_revoked query failed: {e}")))?;

        let hit: i64 = row
            .try_get("hit")
            .map_err(|e| TokenError::RepositoryError(e.to_string()))?;
        Ok(hit > 0)
    }

    async fn mark_rotated(&self, fingerprint: &str, expires_at: DateTime<Utc>) -> Result<(), TokenError> {
        sqlx::query(
            r#"
            INSERT INTO rotated_tokens (fingerprint, expires_at)
            VALUES (?, ?)
            ON DUPLICATE KEY UPDATE expires_at = VALUES(expires_at)
            "#,
        )
        .bind(fingerprint)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| TokenError::RepositoryError(format!("mark_rotated upsert failed: {e}")))?;
        Ok(())
    }

    async fn rotation_ttl(&self, fingerprint: &str) -> Result<Option<chrono::Duration>, TokenError> {
        let row = sqlx::query("SELECT expires_at FROM rotated_tokens WHERE fingerprint = ?")
            .bind(fingerprint)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| TokenError::RepositoryError(format!("rotation_ttl query failed: {e}")))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let expires_at: DateTime<Utc> = row
            .try_get("expires_at")
            .map_err(|e| TokenError::RepositoryError(e.to_string()))?;
        let remaining = expires_at - Utc::now();
        Ok(Some(if remaining > chrono::Duration::zero() {
            remaining
        } else {
            chrono::Duration::zero()
        }))
    }

    async fn mark_rotated_atomic(
        &self,
        fingerprint: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, TokenError> {
        let result = sqlx::query(
            r#"
            INSERT IGNORE INTO rotated_tokens (fingerprint, expires_at)
            VALUES (?, ?)
            "#,
        )
        .bind(fingerprint)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(|e| TokenError::RepositoryError(format!("rotate insert failed: {e}")))?;

        Ok(result.rows_affected() == 1)
    }

    async fn is_rotated(&self, fingerprint: &str) -> Result<bool, TokenError> {
        let row = sqlx::query(
            r#"
            SELECT COUNT(*) AS hit
            FROM rotated_tokens
            WHERE fingerprint = ? AND expires_at > ?
            "#,
        )
        .bind(fingerprint)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| TokenError::RepositoryError(format!("is_rotated query failed: {e}")))?;

        let hit: i64 = row
            .try_get("hit")
            .map_err(|e| TokenError::RepositoryError(e.to_string()))?;
        Ok(hit > 0)
    }

    async fn cleanup_expired(&self, now: DateTime<Utc>, batch_limit: usize) -> Result<usize, TokenError> {
        let limit = batch_limit as i64;

        let revoked = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= ? LIMIT ?")
            .bind(now)
            .bind(limit)
            .execute(&self.pool)
            .await
            .map_err(|e| TokenError::RepositoryError(format!("cleanup revoked_tokens failed: {e}")))?
            .rows_affected();

        let remaining = limit - revoked as i64;
        let rotated = if remaining > 0 {
            sqlx::query("DELETE FROM rotated_tokens WHERE expires_at <= ? LIMIT ?")
                .bind(now)
                .bind(remaining)
                .execute(&self.pool)
                .await
                .map_err(|e| TokenError::RepositoryError(format!("cleanup rotated_tokens failed: {e}")))?
                .rows_affected()
        } else {
            0
        };

        let total = revoked + rotated;
        if total > 0 {
            debug!(removed = total, "cleanup pass removed expired repository rows");
        }
        Ok(total as usize)
    }
}
