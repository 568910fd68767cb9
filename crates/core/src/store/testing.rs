//! Failing store implementations for outage tests.
//!
//! Compiled for this crate's tests and for dependents that enable the
//! `test-util` feature.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::memory::MemorySessionStore;
use super::{AttemptStore, RevocationStore, SessionStore};
use crate::error::StoreError;
use crate::login_attempts::AttemptCounter;
use crate::session::Session;
use crate::types::{DbId, Timestamp};

fn refused() -> StoreError {
    StoreError::Unavailable("connection refused".into())
}

/// A [`MemorySessionStore`] that can be switched off mid-test.
#[derive(Debug, Default)]
pub struct FlakySessionStore {
    inner: MemorySessionStore,
    down: AtomicBool,
}

impl FlakySessionStore {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    /// The backing store, reachable even while "down".
    pub fn inner(&self) -> &MemorySessionStore {
        &self.inner
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(refused());
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FlakySessionStore {
    async fn insert_and_trim(
        &self,
        session: &Session,
        max_live: usize,
        idle_cutoff: Timestamp,
    ) -> Result<Vec<String>, StoreError> {
        self.check()?;
        self.inner.insert_and_trim(session, max_live, idle_cutoff).await
    }

    async fn fetch(&self, id: &str) -> Result<Option<Session>, StoreError> {
        self.check()?;
        self.inner.fetch(id).await
    }

    async fn touch(&self, id: &str, at: Timestamp) -> Result<Option<Session>, StoreError> {
        self.check()?;
        self.inner.touch(id, at).await
    }

    async fn set_mfa_verified(&self, id: &str) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.set_mfa_verified(id).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.check()?;
        self.inner.delete(id).await
    }

    async fn delete_for_user(&self, user_id: DbId) -> Result<Vec<String>, StoreError> {
        self.check()?;
        self.inner.delete_for_user(user_id).await
    }

    async fn list_for_user(&self, user_id: DbId) -> Result<Vec<Session>, StoreError> {
        self.check()?;
        self.inner.list_for_user(user_id).await
    }

    async fn purge_inactive(&self, idle_cutoff: Timestamp) -> Result<u64, StoreError> {
        self.check()?;
        self.inner.purge_inactive(idle_cutoff).await
    }
}

/// An attempt store whose backend is permanently unreachable.
#[derive(Debug, Default)]
pub struct DownAttemptStore;

#[async_trait]
impl AttemptStore for DownAttemptStore {
    async fn increment(
        &self,
        _key: &str,
        _now: Timestamp,
        _window: chrono::Duration,
    ) -> Result<AttemptCounter, StoreError> {
        Err(refused())
    }

    async fn get(&self, _key: &str, _now: Timestamp) -> Result<Option<AttemptCounter>, StoreError> {
        Err(refused())
    }

    async fn clear(&self, _key: &str) -> Result<(), StoreError> {
        Err(refused())
    }

    async fn purge_expired(&self, _now: Timestamp) -> Result<u64, StoreError> {
        Err(refused())
    }
}

/// A revocation store whose backend is permanently unreachable.
#[derive(Debug, Default)]
pub struct DownRevocationStore;

#[async_trait]
impl RevocationStore for DownRevocationStore {
    async fn insert(&self, _token_hash: &str, _expires_at: Timestamp) -> Result<(), StoreError> {
        Err(refused())
    }

    async fn contains(&self, _token_hash: &str, _now: Timestamp) -> Result<bool, StoreError> {
        Err(refused())
    }

    async fn purge_expired(&self, _now: Timestamp) -> Result<u64, StoreError> {
        Err(refused())
    }
}
