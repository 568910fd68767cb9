//! In-process store implementations.
//!
//! Suitable for single-instance deployments and tests. Each store guards its
//! map with a `std::sync::Mutex` that is never held across an `.await`, which
//! gives the per-key (and, for sessions, per-user) atomicity the traits ask
//! for.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{AttemptStore, RevocationStore, SessionStore, UserDirectory};
use crate::error::StoreError;
use crate::identity::UserRecord;
use crate::login_attempts::AttemptCounter;
use crate::session::Session;
use crate::types::{DbId, Timestamp};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, valid or not.
    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mark a session invalid without removing it, as an out-of-band
    /// administrative tool would.
    pub fn invalidate(&self, id: &str) -> bool {
        match lock(&self.sessions).get_mut(id) {
            Some(s) => {
                s.is_valid = false;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert_and_trim(
        &self,
        session: &Session,
        max_live: usize,
        idle_cutoff: Timestamp,
    ) -> Result<Vec<String>, StoreError> {
        let mut sessions = lock(&self.sessions);
        let mut removed = Vec::new();

        let dead: Vec<String> = sessions
            .values()
            .filter(|s| s.user_id == session.user_id)
            .filter(|s| !s.is_valid || s.last_activity < idle_cutoff)
            .map(|s| s.id.clone())
            .collect();
        for id in dead {
            sessions.remove(&id);
            removed.push(id);
        }

        let mut live: Vec<(Timestamp, String)> = sessions
            .values()
            .filter(|s| s.user_id == session.user_id)
            .map(|s| (s.created_at, s.id.clone()))
            .collect();
        live.sort();

        let excess = (live.len() + 1).saturating_sub(max_live.max(1));
        for (_, id) in live.into_iter().take(excess) {
            sessions.remove(&id);
            removed.push(id);
        }

        sessions.insert(session.id.clone(), session.clone());
        Ok(removed)
    }

    async fn fetch(&self, id: &str) -> Result<Option<Session>, StoreError> {
        Ok(lock(&self.sessions).get(id).cloned())
    }

    async fn touch(&self, id: &str, at: Timestamp) -> Result<Option<Session>, StoreError> {
        match lock(&self.sessions).get_mut(id) {
            Some(s) if s.is_valid => {
                s.touch(at);
                Ok(Some(s.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn set_mfa_verified(&self, id: &str) -> Result<bool, StoreError> {
        match lock(&self.sessions).get_mut(id) {
            Some(s) if s.is_valid => {
                s.mfa_verified = Some(true);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(lock(&self.sessions).remove(id).is_some())
    }

    async fn delete_for_user(&self, user_id: DbId) -> Result<Vec<String>, StoreError> {
        let mut sessions = lock(&self.sessions);
        let ids: Vec<String> = sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .map(|s| s.id.clone())
            .collect();
        for id in &ids {
            sessions.remove(id);
        }
        Ok(ids)
    }

    async fn list_for_user(&self, user_id: DbId) -> Result<Vec<Session>, StoreError> {
        let mut owned: Vec<Session> = lock(&self.sessions)
            .values()
            .filter(|s| s.user_id == user_id && s.is_valid)
            .cloned()
            .collect();
        owned.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(owned)
    }

    async fn purge_inactive(&self, idle_cutoff: Timestamp) -> Result<u64, StoreError> {
        let mut sessions = lock(&self.sessions);
        let before = sessions.len();
        sessions.retain(|_, s| s.is_valid && s.last_activity >= idle_cutoff);
        Ok((before - sessions.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Revocations
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryRevocationStore {
    entries: Mutex<HashMap<String, Timestamp>>,
}

impl MemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RevocationStore for MemoryRevocationStore {
    async fn insert(&self, token_hash: &str, expires_at: Timestamp) -> Result<(), StoreError> {
        let mut entries = lock(&self.entries);
        let slot = entries.entry(token_hash.to_string()).or_insert(expires_at);
        if expires_at > *slot {
            *slot = expires_at;
        }
        Ok(())
    }

    async fn contains(&self, token_hash: &str, now: Timestamp) -> Result<bool, StoreError> {
        Ok(lock(&self.entries)
            .get(token_hash)
            .is_some_and(|expires_at| *expires_at > now))
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<u64, StoreError> {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        Ok((before - entries.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Login attempts
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryAttemptStore {
    counters: Mutex<HashMap<String, AttemptCounter>>,
}

impl MemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttemptStore for MemoryAttemptStore {
    async fn increment(
        &self,
        key: &str,
        now: Timestamp,
        window: chrono::Duration,
    ) -> Result<AttemptCounter, StoreError> {
        let mut counters = lock(&self.counters);
        let counter = counters.entry(key.to_string()).or_insert(AttemptCounter {
            count: 0,
            expires_at: now + window,
        });
        if counter.expires_at <= now {
            *counter = AttemptCounter {
                count: 0,
                expires_at: now + window,
            };
        }
        counter.count = counter.count.saturating_add(1);
        Ok(*counter)
    }

    async fn get(&self, key: &str, now: Timestamp) -> Result<Option<AttemptCounter>, StoreError> {
        Ok(lock(&self.counters)
            .get(key)
            .filter(|c| c.expires_at > now)
            .copied())
    }

    async fn clear(&self, key: &str) -> Result<(), StoreError> {
        lock(&self.counters).remove(key);
        Ok(())
    }

    async fn purge_expired(&self, now: Timestamp) -> Result<u64, StoreError> {
        let mut counters = lock(&self.counters);
        let before = counters.len();
        counters.retain(|_, c| c.expires_at > now);
        Ok((before - counters.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct MemoryUserDirectory {
    users: Mutex<HashMap<DbId, UserRecord>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user record.
    pub fn upsert(&self, user: UserRecord) {
        lock(&self.users).insert(user.id, user);
    }

    pub fn set_status(&self, id: DbId, status: &str) {
        if let Some(u) = lock(&self.users).get_mut(&id) {
            u.status = status.to_string();
        }
    }

    pub fn set_permissions(&self, id: DbId, permissions: Vec<String>) {
        if let Some(u) = lock(&self.users).get_mut(&id) {
            u.permissions = permissions;
        }
    }

    pub fn remove(&self, id: DbId) {
        lock(&self.users).remove(&id);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn get_user_by_id(&self, id: DbId) -> Result<Option<UserRecord>, StoreError> {
        Ok(lock(&self.users).get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        Ok(lock(&self.users)
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}
