//! Bounded calls into the durable tier, and what to do when they fail.

use std::future::Future;
use std::str::FromStr;
use std::time::Duration;

use carebase_core::error::StoreError;

/// Default bound on a single durable-tier call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_millis(500);

/// Behaviour when the durable tier errors or times out on an integrity
/// check (session validation, revocation lookup).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Treat the credential as invalid.
    #[default]
    Closed,
    /// Trust the fast tier and let the request through.
    Open,
}

impl FailurePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePolicy::Closed => "closed",
            FailurePolicy::Open => "open",
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "closed" => Ok(FailurePolicy::Closed),
            "open" => Ok(FailurePolicy::Open),
            other => Err(format!(
                "unknown failure policy '{other}' (expected 'closed' or 'open')"
            )),
        }
    }
}

/// Run `call` with an upper bound of `limit`, mapping an elapsed timer to
/// [`StoreError::Timeout`].
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}
