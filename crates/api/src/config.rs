use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use carebase_core::login_attempts::{DEFAULT_LOCKOUT_SECS, DEFAULT_MAX_ATTEMPTS};

use crate::auth::durable::FailurePolicy;
use crate::auth::jwt::JwtConfig;
use crate::auth::session::{DEFAULT_MAX_SESSIONS_PER_USER, DEFAULT_SESSION_TIMEOUT_SECS};

/// Read and parse `key`, falling back to `default` when unset.
///
/// # Panics
///
/// Panics if the variable is set but does not parse as `T`.
pub(crate) fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} is invalid: {e}")),
        Err(_) => default,
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on draining in-flight work at shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Take the client address from the last `X-Forwarded-For` entry
    /// (default: `false`). Only set this when the server is reachable solely
    /// through a reverse proxy that appends the peer address to that header.
    pub trust_forwarded_for: bool,
    /// JWT token configuration (secret, issuer, audience, expiry durations).
    pub jwt: JwtConfig,
    /// Session, limiter and durable-tier settings.
    pub auth: AuthConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`| `30`                       |
    /// | `TRUST_FORWARDED_FOR`  | `false`                    |
    ///
    /// See [`JwtConfig::from_env`] and [`AuthConfig::from_env`] for the rest.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host,
            port: env_or("PORT", 3000),
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 30),
            trust_forwarded_for: env_or("TRUST_FORWARDED_FOR", false),
            jwt: JwtConfig::from_env(),
            auth: AuthConfig::from_env(),
        }
    }
}

/// Session lifecycle and login throttling settings.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Sliding inactivity timeout in seconds (default: `1800`).
    pub session_timeout_secs: i64,
    /// Live sessions allowed per user before the oldest is evicted (default: `5`).
    pub max_sessions_per_user: usize,
    /// Failed-login threshold per client IP (default: `5`).
    pub login_max_attempts: u32,
    /// Lockout window in seconds (default: `900`).
    pub login_lockout_secs: i64,
    /// Destroy sessions presented from an address other than the one they
    /// were created from (default: `false`).
    pub enforce_ip_binding: bool,
    /// Upper bound on each durable-store call in milliseconds (default: `500`).
    pub store_timeout_ms: u64,
    /// What session and revocation checks do when the durable store fails
    /// (default: `closed`).
    pub session_store_failure_policy: FailurePolicy,
    /// Background sweep period in seconds (default: `300`).
    pub session_sweep_interval_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
            max_sessions_per_user: DEFAULT_MAX_SESSIONS_PER_USER,
            login_max_attempts: DEFAULT_MAX_ATTEMPTS,
            login_lockout_secs: DEFAULT_LOCKOUT_SECS,
            enforce_ip_binding: false,
            store_timeout_ms: 500,
            session_store_failure_policy: FailurePolicy::Closed,
            session_sweep_interval_secs: 300,
        }
    }
}

impl AuthConfig {
    /// Load auth settings from environment variables.
    ///
    /// | Env Var                        | Default  |
    /// |--------------------------------|----------|
    /// | `SESSION_TIMEOUT_SECS`         | `1800`   |
    /// | `MAX_SESSIONS_PER_USER`        | `5`      |
    /// | `LOGIN_MAX_ATTEMPTS`           | `5`      |
    /// | `LOGIN_LOCKOUT_SECS`           | `900`    |
    /// | `ENFORCE_IP_BINDING`           | `false`  |
    /// | `STORE_TIMEOUT_MS`             | `500`    |
    /// | `SESSION_STORE_FAILURE_POLICY` | `closed` |
    /// | `SESSION_SWEEP_INTERVAL_SECS`  | `300`    |
    ///
    /// # Panics
    ///
    /// Panics if a variable is set to an unparseable value, or if the session
    /// cap or timeout is zero.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            session_timeout_secs: env_or("SESSION_TIMEOUT_SECS", defaults.session_timeout_secs),
            max_sessions_per_user: env_or("MAX_SESSIONS_PER_USER", defaults.max_sessions_per_user),
            login_max_attempts: env_or("LOGIN_MAX_ATTEMPTS", defaults.login_max_attempts),
            login_lockout_secs: env_or("LOGIN_LOCKOUT_SECS", defaults.login_lockout_secs),
            enforce_ip_binding: env_or("ENFORCE_IP_BINDING", defaults.enforce_ip_binding),
            store_timeout_ms: env_or("STORE_TIMEOUT_MS", defaults.store_timeout_ms),
            session_store_failure_policy: env_or(
                "SESSION_STORE_FAILURE_POLICY",
                defaults.session_store_failure_policy,
            ),
            session_sweep_interval_secs: env_or(
                "SESSION_SWEEP_INTERVAL_SECS",
                defaults.session_sweep_interval_secs,
            ),
        };
        assert!(config.session_timeout_secs > 0, "SESSION_TIMEOUT_SECS must be positive");
        assert!(config.max_sessions_per_user > 0, "MAX_SESSIONS_PER_USER must be positive");
        config
    }

    pub fn session_timeout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_timeout_secs)
    }

    pub fn login_lockout(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.login_lockout_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_secs.max(1))
    }
}
