//! The authentication gate: the single entry point that turns presented
//! credentials into an [`IdentityContext`] or a typed [`AuthRejection`].
//!
//! The gate never leaks collaborator errors. Store failures are translated
//! per the configured policy, and the precise reason for a rejection is
//! logged (security events under the `security` target) while the caller
//! only sees the coarse rejection.

use std::sync::Arc;
use std::time::Duration;

use carebase_core::clock::Clock;
use carebase_core::error::AuthRejection;
use carebase_core::identity::{IdentityContext, UserRecord};
use carebase_core::session::Session;
use carebase_core::store::{AttemptStore, RevocationStore, SessionStore, UserDirectory};
use carebase_core::types::{DbId, Timestamp};
use serde::Serialize;

use super::durable::bounded;
use super::jwt::{AccessGrant, JwtConfig, TokenCodec, TokenError};
use super::limiter::LoginLimiter;
use super::password::verify_credentials;
use super::revocation::RevocationList;
use super::session::{SessionRegistry, SessionSettings};
use crate::config::AuthConfig;

/// Credentials presented with a request.
#[derive(Debug, Clone, Default)]
pub struct CredentialCarrier {
    /// Raw bearer token, if any.
    pub bearer: Option<String>,
    /// Client address as observed by the transport.
    pub ip: String,
    pub user_agent: Option<String>,
}

impl CredentialCarrier {
    fn token(&self) -> Option<&str> {
        self.bearer.as_deref().filter(|t| !t.is_empty())
    }
}

/// Primary credentials submitted to [`AuthGate::login`].
#[derive(Clone)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
    pub ip: String,
    pub user_agent: Option<String>,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("ip", &self.ip)
            .finish_non_exhaustive()
    }
}

/// Tokens handed out at login.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub access_expires_at: Timestamp,
    pub refresh_expires_at: Timestamp,
}

/// A new access token minted from a refresh token.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshedAccess {
    pub access_token: String,
    pub expires_in: i64,
    pub access_expires_at: Timestamp,
}

/// A successfully authenticated request.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub identity: IdentityContext,
    pub session: Session,
}

/// The durable-tier collaborators the gate is composed from.
#[derive(Clone)]
pub struct AuthStores {
    pub sessions: Arc<dyn SessionStore>,
    pub revocations: Arc<dyn RevocationStore>,
    pub attempts: Arc<dyn AttemptStore>,
    pub users: Arc<dyn UserDirectory>,
}

/// Counts from one [`AuthGate::sweep`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub sessions: u64,
    pub revocations: u64,
    pub login_attempts: u64,
}

pub struct AuthGate {
    codec: Arc<TokenCodec>,
    sessions: SessionRegistry,
    revocations: RevocationList,
    limiter: LoginLimiter,
    users: Arc<dyn UserDirectory>,
    access_ttl: chrono::Duration,
    refresh_ttl: chrono::Duration,
    store_timeout: Duration,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("codec", &self.codec)
            .field("sessions", &self.sessions)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}

impl AuthGate {
    /// Compose the gate and its sub-services from configuration.
    pub fn from_config(
        jwt: &JwtConfig,
        auth: &AuthConfig,
        stores: AuthStores,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let store_timeout = auth.store_timeout();
        let codec = Arc::new(TokenCodec::new(jwt, clock.clone()));

        let sessions = SessionRegistry::new(
            stores.sessions,
            clock.clone(),
            SessionSettings {
                timeout: auth.session_timeout(),
                max_per_user: auth.max_sessions_per_user,
                enforce_ip_binding: auth.enforce_ip_binding,
                store_timeout,
                failure_policy: auth.session_store_failure_policy,
            },
        );
        let revocations = RevocationList::new(
            stores.revocations,
            codec.clone(),
            clock.clone(),
            store_timeout,
            auth.session_store_failure_policy,
        );
        let limiter = LoginLimiter::new(
            stores.attempts,
            clock,
            auth.login_max_attempts,
            auth.login_lockout(),
            store_timeout,
        );

        Self {
            codec,
            sessions,
            revocations,
            limiter,
            users: stores.users,
            access_ttl: jwt.access_ttl(),
            refresh_ttl: jwt.refresh_ttl(),
            store_timeout,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn revocations(&self) -> &RevocationList {
        &self.revocations
    }

    pub fn limiter(&self) -> &LoginLimiter {
        &self.limiter
    }

    // -----------------------------------------------------------------------
    // Per-request authentication
    // -----------------------------------------------------------------------

    /// Authenticate one request.
    pub async fn authenticate(
        &self,
        carrier: &CredentialCarrier,
    ) -> Result<Authenticated, AuthRejection> {
        let token = carrier.token().ok_or(AuthRejection::TokenMissing)?;

        if self.revocations.is_revoked(token).await {
            tracing::warn!(
                target: "security",
                event = "revoked_token_reuse",
                ip = %carrier.ip,
                "Revoked access token presented",
            );
            return Err(AuthRejection::SessionInvalid);
        }

        let claims = self.codec.verify_access(token).map_err(token_rejection)?;
        let session = self
            .validate_session(&claims.sid, claims.sub, &carrier.ip)
            .await?;
        let user = self.active_user(claims.sub, &carrier.ip).await?;

        let identity = IdentityContext {
            user_id: user.id,
            email: user.email,
            role: user.role,
            permissions: user.permissions,
            organization_id: user.organization_id,
            provider_id: user.provider_id,
            session_id: session.id.clone(),
            mfa_verified: session.is_mfa_verified(),
            token_expires_at: claims.expires_at(),
        };
        Ok(Authenticated { identity, session })
    }

    // -----------------------------------------------------------------------
    // Login / refresh / logout
    // -----------------------------------------------------------------------

    /// Exchange primary credentials for a session and token pair.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<TokenPair, AuthRejection> {
        let ip = credentials.ip.as_str();

        let decision = self.limiter.record_attempt(ip).await;
        if !decision.allowed {
            let retry_after_secs = decision
                .retry_after
                .map(|d| d.num_seconds().max(1))
                .unwrap_or(1);
            tracing::warn!(
                target: "security",
                event = "login_rate_limited",
                ip = %ip,
                retry_after_secs,
                "Login attempts exceeded",
            );
            return Err(AuthRejection::RateLimited { retry_after_secs });
        }

        let user = bounded(self.store_timeout, self.users.find_by_email(&credentials.email))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "User lookup failed during login");
                AuthRejection::Unavailable
            })?;

        let password_ok = verify_credentials(
            &credentials.password,
            user.as_ref().map(|u| u.password_hash.as_str()),
        );
        let user = match user {
            Some(user) if password_ok => user,
            _ => {
                tracing::info!(
                    ip = %ip,
                    remaining = decision.remaining,
                    "Login failed: invalid credentials",
                );
                return Err(AuthRejection::InvalidCredentials);
            }
        };

        if !user.is_active() {
            tracing::warn!(
                target: "security",
                event = "inactive_account_login",
                user_id = user.id,
                status = %user.status,
                ip = %ip,
                "Login with valid credentials for an inactive account",
            );
            return Err(AuthRejection::AccountInactive);
        }

        self.limiter.clear(ip).await;

        let session = self
            .sessions
            .create(user.id, ip, credentials.user_agent.as_deref())
            .await
            .map_err(|_| AuthRejection::Unavailable)?;

        let access = self
            .codec
            .issue_access(&grant_for(&user, &session.id), self.access_ttl)
            .map_err(issue_failure)?;
        let refresh = self
            .codec
            .issue_refresh(user.id, &session.id, self.refresh_ttl)
            .map_err(issue_failure)?;

        tracing::info!(user_id = user.id, session_id = %session.id, "User logged in");

        Ok(TokenPair {
            access_token: access.token,
            refresh_token: refresh.token,
            expires_in: self.access_ttl.num_seconds(),
            access_expires_at: access.expires_at,
            refresh_expires_at: refresh.expires_at,
        })
    }

    /// Mint a new access token from a refresh token, with permissions read
    /// fresh from the user store.
    pub async fn refresh(
        &self,
        refresh_token: &str,
        carrier: &CredentialCarrier,
    ) -> Result<RefreshedAccess, AuthRejection> {
        if self.revocations.is_revoked(refresh_token).await {
            tracing::warn!(
                target: "security",
                event = "revoked_token_reuse",
                ip = %carrier.ip,
                "Revoked refresh token presented",
            );
            return Err(AuthRejection::SessionInvalid);
        }

        let claims = self
            .codec
            .verify_refresh(refresh_token)
            .map_err(token_rejection)?;
        let session = self
            .validate_session(&claims.sid, claims.sub, &carrier.ip)
            .await?;
        let user = self.active_user(claims.sub, &carrier.ip).await?;

        let access = self
            .codec
            .issue_access(&grant_for(&user, &session.id), self.access_ttl)
            .map_err(issue_failure)?;

        tracing::debug!(user_id = user.id, session_id = %session.id, "Access token refreshed");

        Ok(RefreshedAccess {
            access_token: access.token,
            expires_in: self.access_ttl.num_seconds(),
            access_expires_at: access.expires_at,
        })
    }

    /// End one session and revoke the access token that was presented with
    /// the logout request.
    pub async fn logout(
        &self,
        session_id: &str,
        presented_token: Option<&str>,
    ) -> Result<(), AuthRejection> {
        if let Some(token) = presented_token {
            if let Err(e) = self.revocations.revoke(token).await {
                tracing::error!(error = %e, "Failed to revoke access token on logout");
            }
        }

        self.sessions.destroy(session_id).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to destroy session on logout");
            AuthRejection::Unavailable
        })?;
        tracing::info!(session_id = %session_id, "Session logged out");
        Ok(())
    }

    /// End every session of `user_id`. Returns how many were destroyed.
    pub async fn logout_all(&self, user_id: DbId) -> Result<usize, AuthRejection> {
        self.sessions.destroy_all(user_id).await.map_err(|e| {
            tracing::error!(user_id, error = %e, "Failed to destroy sessions");
            AuthRejection::Unavailable
        })
    }

    /// Record a completed second factor on `session_id`.
    pub async fn confirm_second_factor(&self, session_id: &str) -> Result<(), AuthRejection> {
        match self.sessions.mark_mfa_verified(session_id).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(AuthRejection::SessionInvalid),
            Err(e) => {
                tracing::error!(error = %e, "Failed to record second factor");
                Err(AuthRejection::Unavailable)
            }
        }
    }

    /// Live sessions of `user_id`.
    pub async fn sessions_for(&self, user_id: DbId) -> Result<Vec<Session>, AuthRejection> {
        self.sessions.sessions_for_user(user_id).await.map_err(|e| {
            tracing::error!(user_id, error = %e, "Failed to list sessions");
            AuthRejection::Unavailable
        })
    }

    /// Purge expired sessions, revocation entries and attempt counters.
    ///
    /// Each store is swept independently; a failure in one does not stop the
    /// others.
    pub async fn sweep(&self) -> SweepReport {
        let mut report = SweepReport::default();

        match self.sessions.purge_expired().await {
            Ok(purge) => {
                tracing::debug!(local = purge.local, "Dropped expired sessions from fast tier");
                report.sessions = purge.durable;
            }
            Err(e) => tracing::warn!(error = %e, "Session sweep failed"),
        }
        match self.revocations.purge_expired().await {
            Ok(n) => report.revocations = n,
            Err(e) => tracing::warn!(error = %e, "Revocation sweep failed"),
        }
        match self.limiter.purge_expired().await {
            Ok(n) => report.login_attempts = n,
            Err(e) => tracing::warn!(error = %e, "Login attempt sweep failed"),
        }

        report
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    async fn validate_session(
        &self,
        session_id: &str,
        user_id: DbId,
        ip: &str,
    ) -> Result<Session, AuthRejection> {
        let session = self.sessions.validate(session_id, ip).await.map_err(|reason| {
            if reason.is_security_event() {
                tracing::warn!(
                    target: "security",
                    event = "session_rejected",
                    reason = %reason,
                    user_id,
                    ip = %ip,
                    "Session rejected",
                );
            } else {
                tracing::debug!(reason = %reason, user_id, "Session rejected");
            }
            AuthRejection::SessionInvalid
        })?;

        if session.user_id != user_id {
            tracing::warn!(
                target: "security",
                event = "session_subject_mismatch",
                token_user_id = user_id,
                session_user_id = session.user_id,
                ip = %ip,
                "Token subject does not own the referenced session",
            );
            return Err(AuthRejection::SessionInvalid);
        }
        Ok(session)
    }

    async fn active_user(&self, user_id: DbId, ip: &str) -> Result<UserRecord, AuthRejection> {
        let user = bounded(self.store_timeout, self.users.get_user_by_id(user_id))
            .await
            .map_err(|e| {
                tracing::error!(user_id, error = %e, "User lookup failed");
                AuthRejection::Unavailable
            })?;

        match user {
            Some(user) if user.is_active() => Ok(user),
            other => {
                tracing::warn!(
                    target: "security",
                    event = "inactive_account",
                    user_id,
                    status = other.as_ref().map(|u| u.status.as_str()).unwrap_or("missing"),
                    ip = %ip,
                    "Authenticated request for an inactive or missing account",
                );
                Err(AuthRejection::AccountInactive)
            }
        }
    }
}

fn grant_for(user: &UserRecord, session_id: &str) -> AccessGrant {
    AccessGrant {
        user_id: user.id,
        email: user.email.clone(),
        role: user.role.clone(),
        permissions: user.permissions.clone(),
        organization_id: user.organization_id,
        provider_id: user.provider_id,
        session_id: session_id.to_string(),
    }
}

fn token_rejection(err: TokenError) -> AuthRejection {
    tracing::debug!(error = %err, "Token rejected");
    match err {
        TokenError::Expired => AuthRejection::TokenExpired,
        _ => AuthRejection::TokenInvalid,
    }
}

fn issue_failure(err: TokenError) -> AuthRejection {
    tracing::error!(error = %err, "Failed to sign token");
    AuthRejection::Unavailable
}
