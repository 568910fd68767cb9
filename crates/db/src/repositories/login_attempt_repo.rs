//! Repository for the `login_attempts` table.

use carebase_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::login_attempt::LoginAttemptRow;

pub struct LoginAttemptRepo;

impl LoginAttemptRepo {
    /// Atomically bump the counter for `client_key`.
    ///
    /// An absent or expired row restarts at 1 with `expires_at = window_end`;
    /// a live row keeps its original expiry.
    pub async fn increment(
        pool: &PgPool,
        client_key: &str,
        now: Timestamp,
        window_end: Timestamp,
    ) -> Result<LoginAttemptRow, sqlx::Error> {
        sqlx::query_as::<_, LoginAttemptRow>(
            "INSERT INTO login_attempts (client_key, attempt_count, expires_at)
             VALUES ($1, 1, $3)
             ON CONFLICT (client_key) DO UPDATE SET
                attempt_count = CASE WHEN login_attempts.expires_at <= $2
                                     THEN 1 ELSE login_attempts.attempt_count + 1 END,
                expires_at    = CASE WHEN login_attempts.expires_at <= $2
                                     THEN $3 ELSE login_attempts.expires_at END
             RETURNING attempt_count, expires_at",
        )
        .bind(client_key)
        .bind(now)
        .bind(window_end)
        .fetch_one(pool)
        .await
    }

    /// Fetch the live counter for `client_key`.
    pub async fn find_live(
        pool: &PgPool,
        client_key: &str,
        now: Timestamp,
    ) -> Result<Option<LoginAttemptRow>, sqlx::Error> {
        sqlx::query_as::<_, LoginAttemptRow>(
            "SELECT attempt_count, expires_at FROM login_attempts
             WHERE client_key = $1 AND expires_at > $2",
        )
        .bind(client_key)
        .bind(now)
        .fetch_optional(pool)
        .await
    }

    pub async fn delete(pool: &PgPool, client_key: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM login_attempts WHERE client_key = $1")
            .bind(client_key)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn purge_expired(pool: &PgPool, now: Timestamp) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM login_attempts WHERE expires_at <= $1")
            .bind(now)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
