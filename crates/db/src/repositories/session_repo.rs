//! Repository for the `auth_sessions` table.

use carebase_core::session::Session;
use carebase_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::session::SessionRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, created_at, last_activity, ip_address, user_agent, \
                       is_valid, mfa_verified";

/// Provides the durable-tier operations for sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert `session` and trim its owner down to `max_live - 1` older
    /// sessions, all in one transaction.
    ///
    /// A transaction-scoped advisory lock on the user id serializes this
    /// against concurrent logins for the same user from any API instance.
    /// Returns the ids of removed sessions (idle, invalid, or evicted).
    pub async fn insert_and_trim(
        pool: &PgPool,
        session: &Session,
        max_live: usize,
        idle_cutoff: Timestamp,
    ) -> Result<Vec<String>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(session.user_id)
            .execute(&mut *tx)
            .await?;

        let mut removed: Vec<String> = sqlx::query_scalar(
            "DELETE FROM auth_sessions
             WHERE user_id = $1 AND (is_valid = false OR last_activity < $2)
             RETURNING id",
        )
        .bind(session.user_id)
        .bind(idle_cutoff)
        .fetch_all(&mut *tx)
        .await?;

        let live: Vec<String> = sqlx::query_scalar(
            "SELECT id FROM auth_sessions
             WHERE user_id = $1
             ORDER BY created_at ASC, id ASC",
        )
        .bind(session.user_id)
        .fetch_all(&mut *tx)
        .await?;

        let excess = (live.len() + 1).saturating_sub(max_live.max(1));
        if excess > 0 {
            let evict: Vec<String> = live.into_iter().take(excess).collect();
            sqlx::query("DELETE FROM auth_sessions WHERE id = ANY($1)")
                .bind(&evict)
                .execute(&mut *tx)
                .await?;
            removed.extend(evict);
        }

        sqlx::query(
            "INSERT INTO auth_sessions
                (id, user_id, created_at, last_activity, ip_address, user_agent, is_valid, mfa_verified)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(session.created_at)
        .bind(session.last_activity)
        .bind(&session.ip_address)
        .bind(&session.user_agent)
        .bind(session.is_valid)
        .bind(session.mfa_verified)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(removed)
    }

    /// Find a session by id, regardless of validity.
    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<SessionRow>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM auth_sessions WHERE id = $1");
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Advance `last_activity` (never backwards) and return the updated row.
    /// `None` if the session is gone or invalid.
    pub async fn touch(
        pool: &PgPool,
        id: &str,
        at: Timestamp,
    ) -> Result<Option<SessionRow>, sqlx::Error> {
        let query = format!(
            "UPDATE auth_sessions SET last_activity = GREATEST(last_activity, $2)
             WHERE id = $1 AND is_valid = true
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(id)
            .bind(at)
            .fetch_optional(pool)
            .await
    }

    /// Mark the session's second factor as verified.
    pub async fn set_mfa_verified(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE auth_sessions SET mfa_verified = true WHERE id = $1 AND is_valid = true",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a single session. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM auth_sessions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all sessions for a user, returning the removed ids.
    pub async fn delete_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("DELETE FROM auth_sessions WHERE user_id = $1 RETURNING id")
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// List a user's valid sessions, oldest first.
    pub async fn list_for_user(pool: &PgPool, user_id: DbId) -> Result<Vec<SessionRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM auth_sessions
             WHERE user_id = $1 AND is_valid = true
             ORDER BY created_at ASC, id ASC"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Delete invalid sessions and those idle since before `idle_cutoff`.
    /// Returns the count of deleted rows.
    pub async fn purge_inactive(pool: &PgPool, idle_cutoff: Timestamp) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM auth_sessions WHERE is_valid = false OR last_activity < $1")
                .bind(idle_cutoff)
                .execute(pool)
                .await?;
        Ok(result.rows_affected())
    }
}
