//! Server-side session record and its usability rule.
//!
//! A session is *usable* iff it has not been destroyed (`is_valid`) and has
//! seen activity within the inactivity timeout. Expiry is sliding: every
//! successful validation moves `last_activity` forward.

use serde::Serialize;

use crate::hashing::generate_session_id;
use crate::types::{DbId, Timestamp};

/// One authenticated client connection lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    /// Opaque high-entropy identifier, never reused.
    pub id: String,
    pub user_id: DbId,
    pub created_at: Timestamp,
    /// Refreshed on every successful validation.
    pub last_activity: Timestamp,
    /// Client address captured at creation (hijack detection).
    pub ip_address: String,
    pub user_agent: Option<String>,
    /// False once explicitly destroyed.
    pub is_valid: bool,
    /// Set once a secondary factor has been confirmed.
    pub mfa_verified: Option<bool>,
}

impl Session {
    /// Build a fresh session for `user_id`, created and active at `now`.
    pub fn new(user_id: DbId, ip_address: &str, user_agent: Option<&str>, now: Timestamp) -> Self {
        Self {
            id: generate_session_id(),
            user_id,
            created_at: now,
            last_activity: now,
            ip_address: ip_address.to_string(),
            user_agent: user_agent.map(str::to_string),
            is_valid: true,
            mfa_verified: None,
        }
    }

    /// Check usability at `now` against the inactivity `timeout`.
    ///
    /// Returns the reason the session is unusable, if any. IP binding is not
    /// checked here; see [`Session::matches_ip`].
    pub fn check_usable(
        &self,
        now: Timestamp,
        timeout: chrono::Duration,
    ) -> Result<(), SessionInvalidReason> {
        if !self.is_valid {
            return Err(SessionInvalidReason::Destroyed);
        }
        if now - self.last_activity > timeout {
            return Err(SessionInvalidReason::Expired);
        }
        Ok(())
    }

    pub fn is_usable(&self, now: Timestamp, timeout: chrono::Duration) -> bool {
        self.check_usable(now, timeout).is_ok()
    }

    /// Whether the observed client address matches the one bound at creation.
    pub fn matches_ip(&self, observed: &str) -> bool {
        self.ip_address == observed
    }

    /// Record activity at `at`. Never moves `last_activity` backwards, so
    /// racing validations resolve last-writer-wins by timestamp.
    pub fn touch(&mut self, at: Timestamp) {
        if at > self.last_activity {
            self.last_activity = at;
        }
    }

    pub fn is_mfa_verified(&self) -> bool {
        self.mfa_verified.unwrap_or(false)
    }
}

/// Internal cause of a failed session validation.
///
/// Callers outside the auth subsystem only ever see a generic
/// "session invalid"; this enum exists for audit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionInvalidReason {
    NotFound,
    Expired,
    Destroyed,
    IpMismatch,
    StoreUnavailable,
}

impl SessionInvalidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionInvalidReason::NotFound => "not_found",
            SessionInvalidReason::Expired => "expired",
            SessionInvalidReason::Destroyed => "destroyed",
            SessionInvalidReason::IpMismatch => "ip_mismatch",
            SessionInvalidReason::StoreUnavailable => "store_unavailable",
        }
    }

    /// Whether this outcome should be audited as a security event rather
    /// than a routine timeout.
    pub fn is_security_event(&self) -> bool {
        matches!(self, SessionInvalidReason::IpMismatch)
    }
}

impl std::fmt::Display for SessionInvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;

    fn timeout() -> Duration {
        Duration::minutes(30)
    }

    #[test]
    fn fresh_session_is_usable() {
        let now = Utc::now();
        let session = Session::new(7, "10.0.0.1", Some("curl/8"), now);
        assert!(session.is_usable(now, timeout()));
        assert_eq!(session.created_at, session.last_activity);
        assert_eq!(session.mfa_verified, None);
    }

    #[test]
    fn usable_exactly_at_timeout_boundary() {
        let now = Utc::now();
        let session = Session::new(7, "10.0.0.1", None, now);
        assert!(session.is_usable(now + timeout(), timeout()));
        assert_eq!(
            session.check_usable(now + timeout() + Duration::seconds(1), timeout()),
            Err(SessionInvalidReason::Expired)
        );
    }

    #[test]
    fn destroyed_session_is_not_usable() {
        let now = Utc::now();
        let mut session = Session::new(7, "10.0.0.1", None, now);
        session.is_valid = false;
        assert_eq!(
            session.check_usable(now, timeout()),
            Err(SessionInvalidReason::Destroyed)
        );
    }

    #[test]
    fn touch_never_moves_backwards() {
        let now = Utc::now();
        let mut session = Session::new(7, "10.0.0.1", None, now);
        session.touch(now + Duration::seconds(10));
        session.touch(now + Duration::seconds(5));
        assert_eq!(session.last_activity, now + Duration::seconds(10));
    }

    #[test]
    fn only_ip_mismatch_is_a_security_event() {
        assert!(SessionInvalidReason::IpMismatch.is_security_event());
        assert!(!SessionInvalidReason::Expired.is_security_event());
        assert!(!SessionInvalidReason::NotFound.is_security_event());
    }
}
