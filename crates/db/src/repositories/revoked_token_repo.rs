//! Repository for the `revoked_tokens` table.

use carebase_core::types::Timestamp;
use sqlx::PgPool;

pub struct RevokedTokenRepo;

impl RevokedTokenRepo {
    /// Record a revoked token hash. Re-revoking keeps the later expiry.
    pub async fn insert(
        pool: &PgPool,
        token_hash: &str,
        expires_at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO revoked_tokens (token_hash, expires_at) VALUES ($1, $2)
             ON CONFLICT (token_hash)
             DO UPDATE SET expires_at = GREATEST(revoked_tokens.expires_at, EXCLUDED.expires_at)",
        )
        .bind(token_hash)
        .bind(expires_at)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Whether an unexpired entry exists for `token_hash`.
    pub async fn exists(pool: &PgPool, token_hash: &str, now: Timestamp) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM revoked_tokens WHERE token_hash = $1 AND expires_at > $2)",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_one(pool)
        .await
    }

    /// Delete entries whose token would have expired anyway.
    pub async fn purge_expired(pool: &PgPool, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= $1")
            .bind(now)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
