//! Error and rejection taxonomy for the auth subsystem.
//!
//! [`AuthRejection`] is what callers of the authentication gate see. It is
//! deliberately coarse: revoked, expired, destroyed and hijacked sessions all
//! surface as [`AuthRejection::SessionInvalid`]. The precise cause is carried
//! separately (see [`crate::session::SessionInvalidReason`]) and only ever
//! reaches the logs.

use std::time::Duration;

/// Failure talking to a durable store (Postgres, or any shared backend).
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Corrupt store record: {0}")]
    Corrupt(String),
}

/// Authentication failure returned by the gate, login, and refresh paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthRejection {
    #[error("Missing bearer token")]
    TokenMissing,

    #[error("Invalid token")]
    TokenInvalid,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Session is no longer valid")]
    SessionInvalid,

    #[error("Account is not active")]
    AccountInactive,

    #[error("Too many login attempts. Try again in {retry_after_secs} seconds.")]
    RateLimited { retry_after_secs: i64 },

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Authentication service temporarily unavailable")]
    Unavailable,
}

impl AuthRejection {
    /// Stable machine-readable code for JSON error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            AuthRejection::TokenMissing => "TOKEN_MISSING",
            AuthRejection::TokenInvalid => "TOKEN_INVALID",
            AuthRejection::TokenExpired => "TOKEN_EXPIRED",
            AuthRejection::SessionInvalid => "SESSION_INVALID",
            AuthRejection::AccountInactive => "ACCOUNT_INACTIVE",
            AuthRejection::RateLimited { .. } => "RATE_LIMITED",
            AuthRejection::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthRejection::Unavailable => "UNAVAILABLE",
        }
    }
}

/// Authorization failure returned by the guards in [`crate::guards`].
///
/// Kept separate from [`AuthRejection`]: the caller *is* authenticated, it
/// just may not do this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("Insufficient role")]
    InsufficientRole,

    #[error("Missing required permission")]
    MissingPermission,

    #[error("Not the owner of this resource")]
    NotOwner,

    #[error("Second factor verification required")]
    MfaRequired,
}

impl AccessDenied {
    pub fn code(&self) -> &'static str {
        match self {
            AccessDenied::InsufficientRole => "INSUFFICIENT_ROLE",
            AccessDenied::MissingPermission => "MISSING_PERMISSION",
            AccessDenied::NotOwner => "NOT_OWNER",
            AccessDenied::MfaRequired => "MFA_REQUIRED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_message_includes_retry_hint() {
        let msg = AuthRejection::RateLimited {
            retry_after_secs: 42,
        }
        .to_string();
        assert!(msg.contains("42 seconds"));
    }

    #[test]
    fn codes_are_distinct() {
        let all = [
            AuthRejection::TokenMissing,
            AuthRejection::TokenInvalid,
            AuthRejection::TokenExpired,
            AuthRejection::SessionInvalid,
            AuthRejection::AccountInactive,
            AuthRejection::RateLimited {
                retry_after_secs: 1,
            },
            AuthRejection::InvalidCredentials,
            AuthRejection::Unavailable,
        ];
        let mut codes: Vec<_> = all.iter().map(AuthRejection::code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), all.len());
    }
}
