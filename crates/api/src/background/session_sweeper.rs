//! Periodic cleanup of expired auth state.
//!
//! Sessions past the inactivity timeout, revocation entries past their
//! token's expiry, and lapsed login-attempt counters are all TTL-bounded, but
//! only the sweeper actually deletes them from the durable tier.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::auth::gate::AuthGate;

/// Run the sweep loop every `period` until `cancel` is triggered.
pub async fn run(gate: Arc<AuthGate>, period: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = period.as_secs(), "Session sweeper started");

    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session sweeper stopping");
                break;
            }
            _ = interval.tick() => {
                let report = gate.sweep().await;
                if report.sessions + report.revocations + report.login_attempts > 0 {
                    tracing::info!(
                        sessions = report.sessions,
                        revocations = report.revocations,
                        login_attempts = report.login_attempts,
                        "Session sweeper: purged expired rows",
                    );
                } else {
                    tracing::debug!("Session sweeper: nothing to purge");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use carebase_core::clock::ManualClock;
    use carebase_core::store::memory::{
        MemoryAttemptStore, MemoryRevocationStore, MemorySessionStore, MemoryUserDirectory,
    };

    use super::*;
    use crate::auth::gate::AuthStores;
    use crate::auth::jwt::JwtConfig;
    use crate::config::AuthConfig;

    #[tokio::test(start_paused = true)]
    async fn sweeps_until_cancelled() {
        let clock = Arc::new(ManualClock::starting_now());
        let sessions = Arc::new(MemorySessionStore::new());
        let gate = Arc::new(AuthGate::from_config(
            &JwtConfig {
                secret: "sweeper-secret".into(),
                issuer: "carebase".into(),
                audience: "carebase-api".into(),
                access_token_expiry_mins: 15,
                refresh_token_expiry_days: 7,
            },
            &AuthConfig::default(),
            AuthStores {
                sessions: sessions.clone(),
                revocations: Arc::new(MemoryRevocationStore::new()),
                attempts: Arc::new(MemoryAttemptStore::new()),
                users: Arc::new(MemoryUserDirectory::new()),
            },
            clock.clone(),
        ));

        gate.sessions().create(1, "10.0.0.1", None).await.unwrap();
        clock.advance(chrono::Duration::hours(2));

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(gate.clone(), Duration::from_secs(60), cancel.clone()));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(sessions.is_empty());

        cancel.cancel();
        task.await.unwrap();
    }
}
