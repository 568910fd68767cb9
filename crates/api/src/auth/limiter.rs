//! Per-IP login attempt limiter.
//!
//! Fails open: when the counting store is unreachable the attempt is allowed
//! and a warning is logged.

use std::sync::Arc;
use std::time::Duration;

use carebase_core::clock::Clock;
use carebase_core::error::StoreError;
use carebase_core::login_attempts::{lockout_state, AttemptDecision, LockoutState};
use carebase_core::store::AttemptStore;

use super::durable::bounded;

pub struct LoginLimiter {
    store: Arc<dyn AttemptStore>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
    window: chrono::Duration,
    store_timeout: Duration,
}

impl std::fmt::Debug for LoginLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginLimiter")
            .field("max_attempts", &self.max_attempts)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl LoginLimiter {
    pub fn new(
        store: Arc<dyn AttemptStore>,
        clock: Arc<dyn Clock>,
        max_attempts: u32,
        window: chrono::Duration,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            max_attempts,
            window,
            store_timeout,
        }
    }

    /// Count one attempt from `client_key` and decide whether it may
    /// proceed.
    pub async fn record_attempt(&self, client_key: &str) -> AttemptDecision {
        let now = self.clock.now();
        match bounded(
            self.store_timeout,
            self.store.increment(client_key, now, self.window),
        )
        .await
        {
            Ok(counter) => AttemptDecision::evaluate(&counter, self.max_attempts, now),
            Err(e) => {
                tracing::warn!(error = %e, "Login attempt store unavailable; allowing attempt");
                AttemptDecision::fail_open(self.max_attempts)
            }
        }
    }

    /// Reset `client_key` after a successful credential check.
    pub async fn clear(&self, client_key: &str) {
        if let Err(e) = bounded(self.store_timeout, self.store.clear(client_key)).await {
            tracing::warn!(error = %e, "Failed to clear login attempt counter");
        }
    }

    /// Current lockout state for `client_key`, without counting an attempt.
    pub async fn state(&self, client_key: &str) -> LockoutState {
        let now = self.clock.now();
        match bounded(self.store_timeout, self.store.get(client_key, now)).await {
            Ok(counter) => lockout_state(counter.as_ref(), self.max_attempts, now),
            Err(e) => {
                tracing::warn!(error = %e, "Login attempt store unavailable");
                LockoutState::Clear
            }
        }
    }

    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        bounded(self.store_timeout, self.store.purge_expired(self.clock.now())).await
    }
}
