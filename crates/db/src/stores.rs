//! Postgres-backed implementations of the durable-tier store traits.
//!
//! Every store wraps a cloned [`PgPool`] and delegates to the repositories.
//! `sqlx` errors are flattened into [`StoreError::Unavailable`]; callers
//! decide whether that fails open or closed.

use async_trait::async_trait;
use carebase_core::error::StoreError;
use carebase_core::identity::UserRecord;
use carebase_core::login_attempts::AttemptCounter;
use carebase_core::session::Session;
use carebase_core::store::{AttemptStore, RevocationStore, SessionStore, UserDirectory};
use carebase_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::repositories::{LoginAttemptRepo, RevokedTokenRepo, SessionRepo, UserRepo};

fn store_err(err: sqlx::Error) -> StoreError {
    tracing::warn!(error = %err, "Durable store query failed");
    StoreError::Unavailable(err.to_string())
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert_and_trim(
        &self,
        session: &Session,
        max_live: usize,
        idle_cutoff: Timestamp,
    ) -> Result<Vec<String>, StoreError> {
        SessionRepo::insert_and_trim(&self.pool, session, max_live, idle_cutoff)
            .await
            .map_err(store_err)
    }

    async fn fetch(&self, id: &str) -> Result<Option<Session>, StoreError> {
        SessionRepo::find_by_id(&self.pool, id)
            .await
            .map(|row| row.map(Session::from))
            .map_err(store_err)
    }

    async fn touch(&self, id: &str, at: Timestamp) -> Result<Option<Session>, StoreError> {
        SessionRepo::touch(&self.pool, id, at)
            .await
            .map(|row| row.map(Session::from))
            .map_err(store_err)
    }

    async fn set_mfa_verified(&self, id: &str) -> Result<bool, StoreError> {
        SessionRepo::set_mfa_verified(&self.pool, id)
            .await
            .map_err(store_err)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        SessionRepo::delete(&self.pool, id).await.map_err(store_err)
    }

    async fn delete_for_user(&self, user_id: DbId) -> Result<Vec<String>, StoreError> {
        SessionRepo::delete_for_user(&self.pool, user_id)
            .await
            .map_err(store_err)
    }

    async fn list_for_user(&self, user_id: DbId) -> Result<Vec<Session>, StoreError> {
        SessionRepo::list_for_user(&self.pool, user_id)
            .await
            .map(|rows| rows.into_iter().map(Session::from).collect())
            .map_err(store_err)
    }

    async fn purge_inactive(&self, idle_cutoff: Timestamp) -> Result<u64, StoreError> {
        SessionRepo::purge_inactive(&self.pool, idle_cutoff)
            .await
            .map_err(store_err)
    }
}

// ---------------------------------------------------------------------------
// Revocations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgRevocationStore {
    pool: PgPool,
}

impl PgRevocationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevocationStore for PgRevocationStore {
    async fn insert(&self, token_hash: &str, expires_at: Timestamp) -> Result<(), StoreError> {
        RevokedTokenRepo::insert(&self.pool, token_hash, expires_at)
            .await
            .map_err(store_err)
    }

    async fn contains(&self, token_hash: &str, now: Timestamp) -> Result<bool, StoreError> {
        RevokedTokenRepo::exists(&self.pool, token_hash, now)
            .await
            .map_err(store_err)
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<u64, StoreError> {
        RevokedTokenRepo::purge_expired(&self.pool, now)
            .await
            .map_err(store_err)
    }
}

// ---------------------------------------------------------------------------
// Login attempts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgAttemptStore {
    pool: PgPool,
}

impl PgAttemptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttemptStore for PgAttemptStore {
    async fn increment(
        &self,
        key: &str,
        now: Timestamp,
        window: chrono::Duration,
    ) -> Result<AttemptCounter, StoreError> {
        let row = LoginAttemptRepo::increment(&self.pool, key, now, now + window)
            .await
            .map_err(store_err)?;
        AttemptCounter::try_from(row)
    }

    async fn get(&self, key: &str, now: Timestamp) -> Result<Option<AttemptCounter>, StoreError> {
        LoginAttemptRepo::find_live(&self.pool, key, now)
            .await
            .map_err(store_err)?
            .map(AttemptCounter::try_from)
            .transpose()
    }

    async fn clear(&self, key: &str) -> Result<(), StoreError> {
        LoginAttemptRepo::delete(&self.pool, key)
            .await
            .map_err(store_err)
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<u64, StoreError> {
        LoginAttemptRepo::purge_expired(&self.pool, now)
            .await
            .map_err(store_err)
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn get_user_by_id(&self, id: DbId) -> Result<Option<UserRecord>, StoreError> {
        UserRepo::find_by_id(&self.pool, id)
            .await
            .map(|row| row.map(UserRecord::from))
            .map_err(store_err)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        UserRepo::find_by_email(&self.pool, email)
            .await
            .map(|row| row.map(UserRecord::from))
            .map_err(store_err)
    }
}
