//! Login attempt counting policy.
//!
//! Per client key (IP address) the limiter moves through
//! `Clear -> Counting -> Locked -> Clear`. The counter lives in an
//! [`AttemptStore`](crate::store::AttemptStore) with a TTL equal to the
//! lockout window; this module only turns a counter into a decision.

use crate::types::Timestamp;

/// Default maximum login attempts per window.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default lockout window in seconds (15 minutes).
pub const DEFAULT_LOCKOUT_SECS: i64 = 900;

/// A counter as returned by the store after an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptCounter {
    pub count: u32,
    /// When the window (and the counter) expires.
    pub expires_at: Timestamp,
}

/// Where a client key sits in the lockout state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockoutState {
    Clear,
    Counting,
    Locked,
}

/// Result of recording one login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptDecision {
    pub allowed: bool,
    /// Attempts left in the current window after this one.
    pub remaining: u32,
    /// Time until the window ends, when locked.
    pub retry_after: Option<chrono::Duration>,
}

impl AttemptDecision {
    /// Decide on a post-increment counter.
    pub fn evaluate(counter: &AttemptCounter, max_attempts: u32, now: Timestamp) -> Self {
        if counter.count > max_attempts {
            let retry_after = (counter.expires_at - now).max(chrono::Duration::zero());
            return Self {
                allowed: false,
                remaining: 0,
                retry_after: Some(retry_after),
            };
        }
        Self {
            allowed: true,
            remaining: max_attempts - counter.count,
            retry_after: None,
        }
    }

    /// Decision used when the counting store cannot be reached.
    pub fn fail_open(max_attempts: u32) -> Self {
        Self {
            allowed: true,
            remaining: max_attempts,
            retry_after: None,
        }
    }
}

/// Classify a (possibly absent) counter at `now`.
pub fn lockout_state(
    counter: Option<&AttemptCounter>,
    max_attempts: u32,
    now: Timestamp,
) -> LockoutState {
    match counter {
        None => LockoutState::Clear,
        Some(c) if c.expires_at <= now || c.count == 0 => LockoutState::Clear,
        Some(c) if c.count > max_attempts => LockoutState::Locked,
        Some(_) => LockoutState::Counting,
    }
}
