//! Durable-tier contracts.
//!
//! Each trait is keyed independently and only needs per-key atomicity from
//! its backend, with one exception: [`SessionStore::insert_and_trim`] must be
//! atomic per *user*, so concurrent logins for a user at the session cap
//! cannot both skip eviction.
//!
//! `carebase-db` implements these over Postgres; [`memory`] provides
//! in-process implementations for single-instance deployments and tests.

pub mod memory;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::identity::UserRecord;
use crate::login_attempts::AttemptCounter;
use crate::session::Session;
use crate::types::{DbId, Timestamp};

/// Durable, cross-process session storage.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Atomically insert `session` and trim its owner's live sessions.
    ///
    /// Within one atomic step for `session.user_id`:
    /// 1. sessions with `last_activity < idle_cutoff` or `is_valid = false`
    ///    are removed;
    /// 2. while the owner holds `max_live` or more sessions, the one with the
    ///    smallest `created_at` is removed;
    /// 3. `session` is inserted.
    ///
    /// Returns the ids of every removed session.
    async fn insert_and_trim(
        &self,
        session: &Session,
        max_live: usize,
        idle_cutoff: Timestamp,
    ) -> Result<Vec<String>, StoreError>;

    async fn fetch(&self, id: &str) -> Result<Option<Session>, StoreError>;

    /// Move `last_activity` forward to `at` (never backwards) and return the
    /// stored record as it stands afterwards.
    ///
    /// Returns `None` if the session no longer exists or is invalid.
    async fn touch(&self, id: &str, at: Timestamp) -> Result<Option<Session>, StoreError>;

    /// Returns `false` if the session no longer exists or is invalid.
    async fn set_mfa_verified(&self, id: &str) -> Result<bool, StoreError>;

    /// Remove one session. Returns whether anything was removed.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Remove every session owned by `user_id`, returning their ids.
    async fn delete_for_user(&self, user_id: DbId) -> Result<Vec<String>, StoreError>;

    /// Valid sessions owned by `user_id`, oldest first.
    async fn list_for_user(&self, user_id: DbId) -> Result<Vec<Session>, StoreError>;

    /// Delete sessions idle since before `idle_cutoff`, or invalid.
    async fn purge_inactive(&self, idle_cutoff: Timestamp) -> Result<u64, StoreError>;
}

/// Revoked-token entries, each expiring with the token it names.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    async fn insert(&self, token_hash: &str, expires_at: Timestamp) -> Result<(), StoreError>;

    /// Whether a non-expired entry exists for `token_hash` at `now`.
    async fn contains(&self, token_hash: &str, now: Timestamp) -> Result<bool, StoreError>;

    async fn purge_expired(&self, now: Timestamp) -> Result<u64, StoreError>;
}

/// Per-client login attempt counters with a TTL window.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    /// Atomically increment the counter for `key`.
    ///
    /// An absent or expired counter restarts at 1 with
    /// `expires_at = now + window`; a live counter keeps its expiry.
    async fn increment(
        &self,
        key: &str,
        now: Timestamp,
        window: chrono::Duration,
    ) -> Result<AttemptCounter, StoreError>;

    /// The live counter for `key`, if any.
    async fn get(&self, key: &str, now: Timestamp) -> Result<Option<AttemptCounter>, StoreError>;

    async fn clear(&self, key: &str) -> Result<(), StoreError>;

    async fn purge_expired(&self, now: Timestamp) -> Result<u64, StoreError>;
}

/// The user/role/permission store.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user_by_id(&self, id: DbId) -> Result<Option<UserRecord>, StoreError>;

    /// Case-insensitive lookup used at login.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;
}
