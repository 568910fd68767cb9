//! Token codec: HS256 JWT access and refresh tokens.
//!
//! Access tokens carry the full identity claim set and are presented on every
//! request. Refresh tokens carry only the subject and the session they are
//! bound to; permissions are re-read from the user store whenever a new
//! access token is minted, so they never ride along in a refresh token.
//!
//! Expiry is evaluated against the injected [`Clock`] rather than the
//! library's wall clock, which keeps verification a pure function of
//! `(secret, token, clock)`.

use std::sync::Arc;

use carebase_core::clock::Clock;
use carebase_core::types::{DbId, Timestamp};
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `typ` claim value for access tokens.
pub const TOKEN_TYPE_ACCESS: &str = "access";
/// `typ` claim value for refresh tokens.
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

/// Default access token expiry in minutes.
const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 15;
/// Default refresh token expiry in days.
const DEFAULT_REFRESH_EXPIRY_DAYS: i64 = 7;
const DEFAULT_ISSUER: &str = "carebase";
const DEFAULT_AUDIENCE: &str = "carebase-api";

/// Configuration for JWT token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// `iss` claim written into and required from every token.
    pub issuer: String,
    /// `aud` claim written into and required from every token.
    pub audience: String,
    /// Access token lifetime in minutes (default: 15).
    pub access_token_expiry_mins: i64,
    /// Refresh token lifetime in days (default: 7).
    pub refresh_token_expiry_days: i64,
}

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default        |
    /// |----------------------------|----------|----------------|
    /// | `JWT_SECRET`               | **yes**  | --             |
    /// | `JWT_ISSUER`               | no       | `carebase`     |
    /// | `JWT_AUDIENCE`             | no       | `carebase-api` |
    /// | `JWT_ACCESS_EXPIRY_MINS`   | no       | `15`           |
    /// | `JWT_REFRESH_EXPIRY_DAYS`  | no       | `7`            |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET` is not set or is empty.
    pub fn from_env() -> Self {
        let secret =
            std::env::var("JWT_SECRET").expect("JWT_SECRET must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET must not be empty");

        Self {
            secret,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| DEFAULT_ISSUER.into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| DEFAULT_AUDIENCE.into()),
            access_token_expiry_mins: crate::config::env_or(
                "JWT_ACCESS_EXPIRY_MINS",
                DEFAULT_ACCESS_EXPIRY_MINS,
            ),
            refresh_token_expiry_days: crate::config::env_or(
                "JWT_REFRESH_EXPIRY_DAYS",
                DEFAULT_REFRESH_EXPIRY_DAYS,
            ),
        }
    }

    pub fn access_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.access_token_expiry_mins)
    }

    pub fn refresh_ttl(&self) -> chrono::Duration {
        chrono::Duration::days(self.refresh_token_expiry_days)
    }
}

/// Why a token failed verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Token is malformed")]
    Malformed,

    #[error("Token signature is invalid")]
    SignatureInvalid,

    #[error("Token has expired")]
    Expired,

    #[error("Token audience does not match")]
    AudienceMismatch,

    #[error("Token issuer does not match")]
    IssuerMismatch,

    #[error("Token encoding failed: {0}")]
    Encoding(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                TokenError::SignatureInvalid
            }
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidAudience => TokenError::AudienceMismatch,
            ErrorKind::InvalidIssuer => TokenError::IssuerMismatch,
            _ => TokenError::Malformed,
        }
    }
}

/// Identity claims to embed in an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessGrant {
    pub user_id: DbId,
    pub email: String,
    pub role: String,
    pub permissions: Vec<String>,
    pub organization_id: Option<DbId>,
    pub provider_id: Option<DbId>,
    pub session_id: String,
}

/// Claims carried by every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject -- the user's internal database id.
    pub sub: DbId,
    pub email: String,
    pub role: String,
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<DbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<DbId>,
    /// Session this token is bound to.
    pub sid: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    /// Unique token identifier (UUID v4) for audit.
    pub jti: String,
    pub typ: String,
}

impl AccessClaims {
    /// The identity portion of the claims, without timing or envelope fields.
    pub fn grant(&self) -> AccessGrant {
        AccessGrant {
            user_id: self.sub,
            email: self.email.clone(),
            role: self.role.clone(),
            permissions: self.permissions.clone(),
            organization_id: self.org,
            provider_id: self.provider,
            session_id: self.sid.clone(),
        }
    }

    pub fn expires_at(&self) -> Timestamp {
        timestamp_from_secs(self.exp)
    }
}

/// Claims carried by a refresh token: subject and session only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: DbId,
    pub sid: String,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
    pub jti: String,
    pub typ: String,
}

/// Envelope fields shared by both token kinds, used when only the expiry
/// matters.
#[derive(Debug, Deserialize)]
struct EnvelopeClaims {
    exp: i64,
}

/// A freshly signed token and its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: Timestamp,
}

fn timestamp_from_secs(secs: i64) -> Timestamp {
    DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Signs and verifies tokens with a single HMAC secret.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(config: &JwtConfig, clock: Arc<dyn Clock>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against `clock` in `check_expiry`.
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);

        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            clock,
        }
    }

    /// Issue an access token for `grant`, valid for `ttl`.
    pub fn issue_access(
        &self,
        grant: &AccessGrant,
        ttl: chrono::Duration,
    ) -> Result<IssuedToken, TokenError> {
        let now = self.clock.now();
        let expires_at = now + ttl;
        let claims = AccessClaims {
            sub: grant.user_id,
            email: grant.email.clone(),
            role: grant.role.clone(),
            permissions: grant.permissions.clone(),
            org: grant.organization_id,
            provider: grant.provider_id,
            sid: grant.session_id.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4().to_string(),
            typ: TOKEN_TYPE_ACCESS.to_string(),
        };
        self.sign(&claims, expires_at)
    }

    /// Issue a refresh token bound to `session_id`, valid for `ttl`.
    pub fn issue_refresh(
        &self,
        user_id: DbId,
        session_id: &str,
        ttl: chrono::Duration,
    ) -> Result<IssuedToken, TokenError> {
        let now = self.clock.now();
        let expires_at = now + ttl;
        let claims = RefreshClaims {
            sub: user_id,
            sid: session_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            jti: Uuid::new_v4().to_string(),
            typ: TOKEN_TYPE_REFRESH.to_string(),
        };
        self.sign(&claims, expires_at)
    }

    /// Verify an access token's signature, issuer, audience, type and expiry.
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims: AccessClaims = self.decode_verified(token)?;
        if claims.typ != TOKEN_TYPE_ACCESS {
            return Err(TokenError::Malformed);
        }
        self.check_expiry(claims.exp)?;
        Ok(claims)
    }

    /// Verify a refresh token's signature, issuer, audience, type and expiry.
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        let claims: RefreshClaims = self.decode_verified(token)?;
        if claims.typ != TOKEN_TYPE_REFRESH {
            return Err(TokenError::Malformed);
        }
        self.check_expiry(claims.exp)?;
        Ok(claims)
    }

    /// Read the embedded expiry of a token this codec signed, without
    /// rejecting it for being expired.
    pub fn peek_expiry(&self, token: &str) -> Result<Timestamp, TokenError> {
        let claims: EnvelopeClaims = self.decode_verified(token)?;
        Ok(timestamp_from_secs(claims.exp))
    }

    fn sign<T: Serialize>(&self, claims: &T, expires_at: Timestamp) -> Result<IssuedToken, TokenError> {
        let token = encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))?;
        Ok(IssuedToken { token, expires_at })
    }

    fn decode_verified<T: DeserializeOwned>(&self, token: &str) -> Result<T, TokenError> {
        Ok(decode::<T>(token, &self.decoding, &self.validation)?.claims)
    }

    fn check_expiry(&self, exp: i64) -> Result<(), TokenError> {
        if self.clock.now().timestamp() > exp {
            return Err(TokenError::Expired);
        }
        Ok(())
    }
}
