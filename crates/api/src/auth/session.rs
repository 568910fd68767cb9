//! Two-tier session registry.
//!
//! The fast tier is an in-process map guarded by a `std::sync::RwLock` and is
//! never held across an `.await`. The durable tier is any
//! [`SessionStore`] (Postgres in production) and is the source of truth
//! across processes. Every mutation writes through both tiers in the same
//! call; every durable call is bounded by the configured store timeout.
//!
//! Each process caches its own copy of a session, so the fast tier is only
//! trusted to say a session *is* usable. A cached copy that looks idle or
//! invalid is re-read from the durable tier before anything is destroyed,
//! and every successful touch replaces the cached copy with the durable row.
//!
//! `validate` is not idempotent with respect to timing-adjacent calls: a
//! successful validation slides `last_activity` forward, and an unusable
//! session is destroyed as a side effect.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use carebase_core::clock::Clock;
use carebase_core::error::StoreError;
use carebase_core::session::{Session, SessionInvalidReason};
use carebase_core::store::SessionStore;
use carebase_core::types::{DbId, Timestamp};

use super::durable::{bounded, FailurePolicy, DEFAULT_STORE_TIMEOUT};

/// Default inactivity timeout in seconds (30 minutes).
pub const DEFAULT_SESSION_TIMEOUT_SECS: i64 = 1800;

/// Default cap on concurrently live sessions per user.
pub const DEFAULT_MAX_SESSIONS_PER_USER: usize = 5;

/// Number of per-user creation locks. Users hash onto stripes by id.
const USER_LOCK_STRIPES: usize = 64;

/// Tunables for a [`SessionRegistry`].
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Sliding inactivity timeout.
    pub timeout: chrono::Duration,
    pub max_per_user: usize,
    /// Destroy a session whose observed client IP differs from the one
    /// captured at creation.
    pub enforce_ip_binding: bool,
    pub store_timeout: Duration,
    pub failure_policy: FailurePolicy,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout: chrono::Duration::seconds(DEFAULT_SESSION_TIMEOUT_SECS),
            max_per_user: DEFAULT_MAX_SESSIONS_PER_USER,
            enforce_ip_binding: false,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            failure_policy: FailurePolicy::Closed,
        }
    }
}

/// Counts from one [`SessionRegistry::purge_expired`] sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionPurge {
    pub local: usize,
    pub durable: u64,
}

pub struct SessionRegistry {
    fast: RwLock<HashMap<String, Session>>,
    /// Fast-tier index of session ids by owner.
    by_user: Mutex<HashMap<DbId, HashSet<String>>>,
    /// Serializes `create` per user within this process.
    create_locks: Vec<tokio::sync::Mutex<()>>,
    durable: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    settings: SessionSettings,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("cached", &self.cached_count())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl SessionRegistry {
    pub fn new(
        durable: Arc<dyn SessionStore>,
        clock: Arc<dyn Clock>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            fast: RwLock::new(HashMap::new()),
            by_user: Mutex::new(HashMap::new()),
            create_locks: (0..USER_LOCK_STRIPES)
                .map(|_| tokio::sync::Mutex::new(()))
                .collect(),
            durable,
            clock,
            settings,
        }
    }

    /// Number of sessions currently held in the fast tier.
    pub fn cached_count(&self) -> usize {
        self.fast.read().map(|m| m.len()).unwrap_or(0)
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Fast-tier lookup only. Never suspends.
    pub fn try_fast(&self, session_id: &str) -> Option<Session> {
        self.fast
            .read()
            .ok()
            .and_then(|m| m.get(session_id).cloned())
    }

    /// Durable-tier lookup; a hit is copied into the fast tier.
    pub async fn fetch_durable_and_repopulate(
        &self,
        session_id: &str,
    ) -> Result<Option<Session>, StoreError> {
        let found = self.call(self.durable.fetch(session_id)).await?;
        if let Some(session) = &found {
            self.remember(session.clone());
        }
        Ok(found)
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Create a session for `user_id`, evicting the owner's oldest live
    /// sessions first if they are at the cap.
    pub async fn create(
        &self,
        user_id: DbId,
        ip_address: &str,
        user_agent: Option<&str>,
    ) -> Result<Session, StoreError> {
        let _guard = self.create_lock(user_id).lock().await;

        let now = self.clock.now();
        let session = Session::new(user_id, ip_address, user_agent, now);
        let max = self.settings.max_per_user.max(1);

        match self
            .call(
                self.durable
                    .insert_and_trim(&session, max, now - self.settings.timeout),
            )
            .await
        {
            Ok(removed) => {
                for id in &removed {
                    self.forget(id);
                }
                if !removed.is_empty() {
                    tracing::info!(
                        user_id,
                        evicted = removed.len(),
                        "Evicted sessions to stay within the per-user cap",
                    );
                }
            }
            Err(e) if self.settings.failure_policy == FailurePolicy::Open => {
                tracing::warn!(
                    user_id,
                    error = %e,
                    "Durable session insert failed; continuing with the fast tier only",
                );
                self.trim_local(user_id, now, max);
            }
            Err(e) => {
                tracing::error!(user_id, error = %e, "Session creation failed");
                return Err(e);
            }
        }

        self.remember(session.clone());
        tracing::debug!(user_id, session_id = %session.id, "Session created");
        Ok(session)
    }

    /// Validate a session and slide its inactivity window.
    ///
    /// The returned record is the durable tier's copy after the touch, so
    /// activity and MFA state recorded by other processes are reflected.
    /// An unusable session is destroyed in both tiers before the reason is
    /// returned.
    pub async fn validate(
        &self,
        session_id: &str,
        observed_ip: &str,
    ) -> Result<Session, SessionInvalidReason> {
        let now = self.clock.now();
        let session = match self.try_fast(session_id) {
            Some(cached) => match cached.check_usable(now, self.settings.timeout) {
                Ok(()) => cached,
                Err(reason) => self.reconcile_stale(session_id, cached, reason).await?,
            },
            None => match self.fetch_durable_and_repopulate(session_id).await {
                Ok(Some(session)) => session,
                Ok(None) => return Err(SessionInvalidReason::NotFound),
                Err(e) => {
                    tracing::warn!(error = %e, "Durable session lookup failed");
                    return Err(SessionInvalidReason::StoreUnavailable);
                }
            },
        };

        if let Err(reason) = session.check_usable(now, self.settings.timeout) {
            self.destroy_quietly(session_id).await;
            return Err(reason);
        }

        if self.settings.enforce_ip_binding && !session.matches_ip(observed_ip) {
            tracing::warn!(
                target: "security",
                event = "session_ip_mismatch",
                user_id = session.user_id,
                bound_ip = %session.ip_address,
                observed_ip = %observed_ip,
                "Session presented from a different address; destroying",
            );
            self.destroy_quietly(session_id).await;
            return Err(SessionInvalidReason::IpMismatch);
        }

        match self.call(self.durable.touch(session_id, now)).await {
            Ok(Some(current)) => {
                self.remember(current.clone());
                Ok(current)
            }
            Ok(None) => {
                // Destroyed by another process since we cached it.
                self.forget(session_id);
                Err(SessionInvalidReason::Destroyed)
            }
            Err(e) => match self.settings.failure_policy {
                FailurePolicy::Closed => {
                    tracing::warn!(error = %e, "Durable session touch failed; rejecting");
                    Err(SessionInvalidReason::StoreUnavailable)
                }
                FailurePolicy::Open => {
                    tracing::warn!(error = %e, "Durable session touch failed; trusting fast tier");
                    Ok(self.touch_local(session_id, now).unwrap_or_else(|| {
                        let mut session = session;
                        session.touch(now);
                        session
                    }))
                }
            },
        }
    }

    /// Destroy one session in both tiers. Idempotent.
    ///
    /// Returns whether the durable tier held it.
    pub async fn destroy(&self, session_id: &str) -> Result<bool, StoreError> {
        self.forget(session_id);
        self.call(self.durable.delete(session_id)).await
    }

    /// Destroy every session owned by `user_id`. Returns how many were
    /// removed across both tiers.
    pub async fn destroy_all(&self, user_id: DbId) -> Result<usize, StoreError> {
        let local: HashSet<String> = self
            .by_user
            .lock()
            .ok()
            .and_then(|mut index| index.remove(&user_id))
            .unwrap_or_default();
        if let Ok(mut fast) = self.fast.write() {
            for id in &local {
                fast.remove(id);
            }
        }

        let durable = self.call(self.durable.delete_for_user(user_id)).await?;
        for id in &durable {
            self.forget(id);
        }

        let mut all = local;
        all.extend(durable);
        tracing::info!(user_id, destroyed = all.len(), "Destroyed all sessions for user");
        Ok(all.len())
    }

    /// Record that the session's holder completed a second factor.
    ///
    /// Returns `false` if the session is gone.
    pub async fn mark_mfa_verified(&self, session_id: &str) -> Result<bool, StoreError> {
        let updated = self.call(self.durable.set_mfa_verified(session_id)).await?;
        if updated {
            if let Ok(mut fast) = self.fast.write() {
                if let Some(session) = fast.get_mut(session_id) {
                    session.mfa_verified = Some(true);
                }
            }
        } else {
            self.forget(session_id);
        }
        Ok(updated)
    }

    /// Live sessions owned by `user_id`, oldest first.
    pub async fn sessions_for_user(&self, user_id: DbId) -> Result<Vec<Session>, StoreError> {
        let now = self.clock.now();
        let timeout = self.settings.timeout;
        let sessions = self.call(self.durable.list_for_user(user_id)).await?;
        Ok(sessions
            .into_iter()
            .filter(|s| s.is_usable(now, timeout))
            .collect())
    }

    /// Drop sessions past the inactivity timeout from both tiers.
    pub async fn purge_expired(&self) -> Result<SessionPurge, StoreError> {
        let now = self.clock.now();
        let timeout = self.settings.timeout;

        let stale: Vec<String> = self
            .fast
            .read()
            .map(|m| {
                m.values()
                    .filter(|s| !s.is_usable(now, timeout))
                    .map(|s| s.id.clone())
                    .collect()
            })
            .unwrap_or_default();
        for id in &stale {
            self.forget(id);
        }

        let durable = self.call(self.durable.purge_inactive(now - timeout)).await?;
        Ok(SessionPurge {
            local: stale.len(),
            durable,
        })
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn call<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        bounded(self.settings.store_timeout, fut).await
    }

    fn create_lock(&self, user_id: DbId) -> &tokio::sync::Mutex<()> {
        let stripe = user_id.rem_euclid(USER_LOCK_STRIPES as DbId) as usize;
        &self.create_locks[stripe]
    }

    /// The cached copy looks unusable, but activity may have reached another
    /// process. Re-read the durable record before passing judgement.
    async fn reconcile_stale(
        &self,
        session_id: &str,
        cached: Session,
        cached_reason: SessionInvalidReason,
    ) -> Result<Session, SessionInvalidReason> {
        match self.fetch_durable_and_repopulate(session_id).await {
            Ok(Some(current)) => Ok(current),
            Ok(None) => {
                self.forget(session_id);
                Err(cached_reason)
            }
            Err(e) => match self.settings.failure_policy {
                FailurePolicy::Closed => {
                    tracing::warn!(error = %e, "Durable session lookup failed");
                    Err(SessionInvalidReason::StoreUnavailable)
                }
                FailurePolicy::Open => {
                    tracing::warn!(error = %e, "Durable session lookup failed; trusting fast tier");
                    Ok(cached)
                }
            },
        }
    }

    async fn destroy_quietly(&self, session_id: &str) {
        if let Err(e) = self.destroy(session_id).await {
            tracing::warn!(error = %e, "Lazy session cleanup failed in the durable tier");
        }
    }

    fn remember(&self, session: Session) {
        let user_id = session.user_id;
        let id = session.id.clone();
        if let Ok(mut fast) = self.fast.write() {
            fast.insert(id.clone(), session);
        }
        if let Ok(mut index) = self.by_user.lock() {
            index.entry(user_id).or_default().insert(id);
        }
    }

    fn forget(&self, session_id: &str) {
        let removed = self.fast.write().ok().and_then(|mut m| m.remove(session_id));
        if let Some(session) = removed {
            if let Ok(mut index) = self.by_user.lock() {
                if let Some(ids) = index.get_mut(&session.user_id) {
                    ids.remove(session_id);
                    if ids.is_empty() {
                        index.remove(&session.user_id);
                    }
                }
            }
        }
    }

    fn touch_local(&self, session_id: &str, at: Timestamp) -> Option<Session> {
        let mut fast = self.fast.write().ok()?;
        let session = fast.get_mut(session_id)?;
        session.touch(at);
        Some(session.clone())
    }

    /// Cap enforcement against the fast tier alone, used when the durable
    /// insert could not run.
    fn trim_local(&self, user_id: DbId, now: Timestamp, max: usize) {
        let ids: Vec<String> = self
            .by_user
            .lock()
            .ok()
            .and_then(|index| index.get(&user_id).map(|s| s.iter().cloned().collect()))
            .unwrap_or_default();

        let mut live: Vec<(Timestamp, String)> = Vec::new();
        let mut dead: Vec<String> = Vec::new();
        if let Ok(fast) = self.fast.read() {
            for id in ids {
                match fast.get(&id) {
                    Some(s) if s.is_usable(now, self.settings.timeout) => {
                        live.push((s.created_at, id))
                    }
                    _ => dead.push(id),
                }
            }
        }
        live.sort();

        let excess = (live.len() + 1).saturating_sub(max);
        for id in dead.iter().chain(live.iter().take(excess).map(|(_, id)| id)) {
            self.forget(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use carebase_core::clock::ManualClock;
    use carebase_core::store::testing::FlakySessionStore;
    use chrono::Duration as ChronoDuration;

    use super::*;

    struct Fixture {
        registry: SessionRegistry,
        store: Arc<FlakySessionStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture(settings: SessionSettings) -> Fixture {
        let store = Arc::new(FlakySessionStore::default());
        let clock = Arc::new(ManualClock::starting_now());
        let registry = SessionRegistry::new(store.clone(), clock.clone(), settings);
        Fixture {
            registry,
            store,
            clock,
        }
    }

    #[tokio::test]
    async fn validate_right_after_create() {
        let f = fixture(SessionSettings::default());
        let session = f.registry.create(1, "10.0.0.1", Some("ua")).await.unwrap();

        let validated = f.registry.validate(&session.id, "10.0.0.1").await.unwrap();
        assert_eq!(validated.id, session.id);
        assert_eq!(validated.last_activity, f.clock.now());
        assert!(validated.is_valid);
    }

    #[tokio::test]
    async fn validate_repopulates_fast_tier_from_durable() {
        let f = fixture(SessionSettings::default());
        let session = f.registry.create(1, "10.0.0.1", None).await.unwrap();

        // A second registry over the same durable store simulates another
        // process.
        let other = SessionRegistry::new(
            f.store.clone(),
            f.clock.clone(),
            SessionSettings::default(),
        );
        assert!(other.try_fast(&session.id).is_none());
        other.validate(&session.id, "10.0.0.1").await.unwrap();
        assert!(other.try_fast(&session.id).is_some());
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let f = fixture(SessionSettings::default());
        assert_matches!(
            f.registry.validate("nope", "10.0.0.1").await,
            Err(SessionInvalidReason::NotFound)
        );
    }

    #[tokio::test]
    async fn cap_evicts_oldest() {
        let f = fixture(SessionSettings {
            max_per_user: 3,
            ..Default::default()
        });

        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(f.registry.create(5, "10.0.0.1", None).await.unwrap().id);
            f.clock.advance(ChronoDuration::seconds(1));
        }
        let newest = f.registry.create(5, "10.0.0.1", None).await.unwrap();

        let live: Vec<String> = f
            .registry
            .sessions_for_user(5)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(live, vec![ids[1].clone(), ids[2].clone(), newest.id]);
        assert!(f.registry.try_fast(&ids[0]).is_none());
        assert_matches!(
            f.registry.validate(&ids[0], "10.0.0.1").await,
            Err(SessionInvalidReason::NotFound)
        );
    }

    #[tokio::test]
    async fn concurrent_creates_at_cap_stay_within_cap() {
        let f = fixture(SessionSettings {
            max_per_user: 2,
            ..Default::default()
        });
        let registry = Arc::new(f.registry);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.create(9, "10.0.0.1", None).await })
            })
            .collect();
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(registry.sessions_for_user(9).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn expired_session_is_destroyed() {
        let f = fixture(SessionSettings::default());
        let session = f.registry.create(1, "10.0.0.1", None).await.unwrap();

        f.clock.advance(ChronoDuration::seconds(DEFAULT_SESSION_TIMEOUT_SECS + 1));
        assert_matches!(
            f.registry.validate(&session.id, "10.0.0.1").await,
            Err(SessionInvalidReason::Expired)
        );
        assert_matches!(
            f.registry.validate(&session.id, "10.0.0.1").await,
            Err(SessionInvalidReason::NotFound)
        );
        assert!(f.store.inner().is_empty());
    }

    #[tokio::test]
    async fn activity_slides_the_window() {
        let f = fixture(SessionSettings::default());
        let session = f.registry.create(1, "10.0.0.1", None).await.unwrap();

        for _ in 0..4 {
            f.clock.advance(ChronoDuration::minutes(20));
            f.registry.validate(&session.id, "10.0.0.1").await.unwrap();
        }
    }

    #[tokio::test]
    async fn ip_mismatch_destroys_when_enforced() {
        let f = fixture(SessionSettings {
            enforce_ip_binding: true,
            ..Default::default()
        });
        let session = f.registry.create(1, "10.0.0.1", None).await.unwrap();

        assert_matches!(
            f.registry.validate(&session.id, "203.0.113.9").await,
            Err(SessionInvalidReason::IpMismatch)
        );
        assert_matches!(
            f.registry.validate(&session.id, "10.0.0.1").await,
            Err(SessionInvalidReason::NotFound)
        );
    }

    #[tokio::test]
    async fn ip_change_allowed_when_not_enforced() {
        let f = fixture(SessionSettings::default());
        let session = f.registry.create(1, "10.0.0.1", None).await.unwrap();
        assert!(f.registry.validate(&session.id, "203.0.113.9").await.is_ok());
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let f = fixture(SessionSettings::default());
        let session = f.registry.create(1, "10.0.0.1", None).await.unwrap();

        assert!(f.registry.destroy(&session.id).await.unwrap());
        assert!(!f.registry.destroy(&session.id).await.unwrap());
        assert_matches!(
            f.registry.validate(&session.id, "10.0.0.1").await,
            Err(SessionInvalidReason::NotFound)
        );
    }

    #[tokio::test]
    async fn remote_destroy_is_seen_on_next_validate() {
        let f = fixture(SessionSettings::default());
        let session = f.registry.create(1, "10.0.0.1", None).await.unwrap();

        f.store.inner().invalidate(&session.id);
        assert_matches!(
            f.registry.validate(&session.id, "10.0.0.1").await,
            Err(SessionInvalidReason::Destroyed)
        );
    }

    #[tokio::test]
    async fn destroy_all_clears_every_session() {
        let f = fixture(SessionSettings::default());
        let a = f.registry.create(3, "10.0.0.1", None).await.unwrap();
        let b = f.registry.create(3, "10.0.0.2", None).await.unwrap();
        let other = f.registry.create(4, "10.0.0.3", None).await.unwrap();

        assert_eq!(f.registry.destroy_all(3).await.unwrap(), 2);
        assert!(f.registry.validate(&a.id, "10.0.0.1").await.is_err());
        assert!(f.registry.validate(&b.id, "10.0.0.2").await.is_err());
        assert!(f.registry.validate(&other.id, "10.0.0.3").await.is_ok());
    }

    #[tokio::test]
    async fn mfa_flag_written_through() {
        let f = fixture(SessionSettings::default());
        let session = f.registry.create(1, "10.0.0.1", None).await.unwrap();
        assert!(!session.is_mfa_verified());

        assert!(f.registry.mark_mfa_verified(&session.id).await.unwrap());
        assert!(f.registry.try_fast(&session.id).unwrap().is_mfa_verified());
        assert!(f
            .store
            .inner()
            .fetch(&session.id)
            .await
            .unwrap()
            .unwrap()
            .is_mfa_verified());
    }

    #[tokio::test]
    async fn store_outage_fails_closed_by_default() {
        let f = fixture(SessionSettings::default());
        let session = f.registry.create(1, "10.0.0.1", None).await.unwrap();

        f.store.set_down(true);
        assert_matches!(
            f.registry.validate(&session.id, "10.0.0.1").await,
            Err(SessionInvalidReason::StoreUnavailable)
        );
        assert!(f.registry.create(1, "10.0.0.1", None).await.is_err());
    }

    #[tokio::test]
    async fn store_outage_trusts_fast_tier_when_open() {
        let f = fixture(SessionSettings {
            failure_policy: FailurePolicy::Open,
            max_per_user: 2,
            ..Default::default()
        });
        let session = f.registry.create(1, "10.0.0.1", None).await.unwrap();

        f.store.set_down(true);
        assert!(f.registry.validate(&session.id, "10.0.0.1").await.is_ok());

        // Unknown to the fast tier: nothing to trust.
        assert_matches!(
            f.registry.validate("missing", "10.0.0.1").await,
            Err(SessionInvalidReason::StoreUnavailable)
        );

        // Creation still enforces the cap locally.
        f.clock.advance(ChronoDuration::seconds(1));
        f.registry.create(1, "10.0.0.1", None).await.unwrap();
        f.clock.advance(ChronoDuration::seconds(1));
        f.registry.create(1, "10.0.0.1", None).await.unwrap();
        assert!(f.registry.try_fast(&session.id).is_none());
        assert_eq!(f.registry.cached_count(), 2);
    }

    #[tokio::test]
    async fn purge_sweeps_both_tiers() {
        let f = fixture(SessionSettings::default());
        f.registry.create(1, "10.0.0.1", None).await.unwrap();
        f.registry.create(2, "10.0.0.2", None).await.unwrap();

        f.clock.advance(ChronoDuration::hours(1));
        let kept = f.registry.create(3, "10.0.0.3", None).await.unwrap();

        let purge = f.registry.purge_expired().await.unwrap();
        assert_eq!(purge.local, 2);
        assert_eq!(purge.durable, 2);
        assert_eq!(f.registry.cached_count(), 1);
        assert!(f.registry.try_fast(&kept.id).is_some());
    }

    fn second_process(f: &Fixture) -> SessionRegistry {
        SessionRegistry::new(f.store.clone(), f.clock.clone(), SessionSettings::default())
    }

    #[tokio::test]
    async fn activity_on_another_process_keeps_cached_copy_alive() {
        let f = fixture(SessionSettings::default());
        let session = f.registry.create(1, "10.0.0.1", None).await.unwrap();
        let other = second_process(&f);

        for _ in 0..4 {
            f.clock.advance(ChronoDuration::minutes(10));
            other.validate(&session.id, "10.0.0.1").await.unwrap();
        }

        // Idle for 40 minutes as far as this process's cache knows.
        let validated = f.registry.validate(&session.id, "10.0.0.1").await.unwrap();
        assert_eq!(validated.last_activity, f.clock.now());
        assert_eq!(
            f.registry.try_fast(&session.id).unwrap().last_activity,
            f.clock.now()
        );
        assert!(f.store.inner().fetch(&session.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn session_idle_everywhere_expires_on_every_process() {
        let f = fixture(SessionSettings::default());
        let session = f.registry.create(1, "10.0.0.1", None).await.unwrap();
        let other = second_process(&f);

        f.clock.advance(ChronoDuration::minutes(10));
        other.validate(&session.id, "10.0.0.1").await.unwrap();
        f.clock.advance(ChronoDuration::minutes(31));

        assert_matches!(
            f.registry.validate(&session.id, "10.0.0.1").await,
            Err(SessionInvalidReason::Expired)
        );
        assert!(f.store.inner().is_empty());
        assert_matches!(
            other.validate(&session.id, "10.0.0.1").await,
            Err(SessionInvalidReason::Expired)
        );
        assert!(other.try_fast(&session.id).is_none());
    }

    #[tokio::test]
    async fn mfa_verified_on_another_process_is_seen_here() {
        let f = fixture(SessionSettings::default());
        let session = f.registry.create(1, "10.0.0.1", None).await.unwrap();
        let other = second_process(&f);

        assert!(other.mark_mfa_verified(&session.id).await.unwrap());

        let validated = f.registry.validate(&session.id, "10.0.0.1").await.unwrap();
        assert!(validated.is_mfa_verified());
        assert!(f.registry.try_fast(&session.id).unwrap().is_mfa_verified());
    }

    #[tokio::test]
    async fn stale_cached_copy_is_not_destroyed_during_outage() {
        let f = fixture(SessionSettings::default());
        let session = f.registry.create(1, "10.0.0.1", None).await.unwrap();
        let other = second_process(&f);

        f.clock.advance(ChronoDuration::minutes(20));
        other.validate(&session.id, "10.0.0.1").await.unwrap();
        f.clock.advance(ChronoDuration::minutes(15));

        f.store.set_down(true);
        assert_matches!(
            f.registry.validate(&session.id, "10.0.0.1").await,
            Err(SessionInvalidReason::StoreUnavailable)
        );

        f.store.set_down(false);
        assert!(f.registry.validate(&session.id, "10.0.0.1").await.is_ok());
    }
}
