//! Revoked-token list.
//!
//! Entries are keyed by the SHA-256 of the raw token and expire with the
//! token itself, so the list is bounded by the number of tokens revoked
//! within one access-token lifetime.

use std::sync::Arc;
use std::time::Duration;

use carebase_core::clock::Clock;
use carebase_core::error::StoreError;
use carebase_core::hashing::sha256_hex;
use carebase_core::store::RevocationStore;

use super::durable::{bounded, FailurePolicy};
use super::jwt::TokenCodec;

pub struct RevocationList {
    store: Arc<dyn RevocationStore>,
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
    store_timeout: Duration,
    failure_policy: FailurePolicy,
}

impl std::fmt::Debug for RevocationList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RevocationList")
            .field("store_timeout", &self.store_timeout)
            .field("failure_policy", &self.failure_policy)
            .finish_non_exhaustive()
    }
}

impl RevocationList {
    pub fn new(
        store: Arc<dyn RevocationStore>,
        codec: Arc<TokenCodec>,
        clock: Arc<dyn Clock>,
        store_timeout: Duration,
        failure_policy: FailurePolicy,
    ) -> Self {
        Self {
            store,
            codec,
            clock,
            store_timeout,
            failure_policy,
        }
    }

    /// Revoke `token` for the rest of its natural lifetime.
    ///
    /// Returns `false` without touching the store when there is nothing to
    /// revoke: the token is already expired, or was not signed by us.
    pub async fn revoke(&self, token: &str) -> Result<bool, StoreError> {
        let expires_at = match self.codec.peek_expiry(token) {
            Ok(at) => at,
            Err(e) => {
                tracing::debug!(error = %e, "Not revoking a token that fails verification");
                return Ok(false);
            }
        };
        // The codec accepts a token through the whole second named by `exp`.
        let entry_expires_at = expires_at + chrono::Duration::seconds(1);
        if entry_expires_at <= self.clock.now() {
            return Ok(false);
        }

        bounded(
            self.store_timeout,
            self.store.insert(&sha256_hex(token.as_bytes()), entry_expires_at),
        )
        .await?;
        Ok(true)
    }

    /// Whether `token` has been revoked.
    ///
    /// A store failure resolves per the failure policy: `Closed` reports the
    /// token as revoked.
    pub async fn is_revoked(&self, token: &str) -> bool {
        let key = sha256_hex(token.as_bytes());
        match bounded(self.store_timeout, self.store.contains(&key, self.clock.now())).await {
            Ok(revoked) => revoked,
            Err(e) => {
                let revoked = self.failure_policy == FailurePolicy::Closed;
                tracing::warn!(
                    error = %e,
                    policy = self.failure_policy.as_str(),
                    "Revocation lookup failed",
                );
                revoked
            }
        }
    }

    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        bounded(self.store_timeout, self.store.purge_expired(self.clock.now())).await
    }
}
