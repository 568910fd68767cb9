//! Bearer-token authentication extractors for Axum handlers.

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header;
use axum::http::request::Parts;
use carebase_core::identity::IdentityContext;
use carebase_core::session::Session;

use crate::auth::gate::CredentialCarrier;
use crate::error::AppError;
use crate::state::AppState;

/// Placeholder address when neither a forwarding header nor a socket address
/// is available.
pub const UNKNOWN_CLIENT_IP: &str = "unknown";

/// Client address and user agent of the current request.
///
/// The address keys the login limiter and session IP binding, so it only
/// comes from `X-Forwarded-For` when [`ServerConfig::trust_forwarded_for`]
/// is set. Otherwise it is the peer socket address.
///
/// [`ServerConfig::trust_forwarded_for`]: crate::config::ServerConfig::trust_forwarded_for
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub ip: String,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_parts(parts: &Parts, trust_forwarded_for: bool) -> Self {
        let ip = trust_forwarded_for
            .then(|| forwarded_ip(parts))
            .flatten()
            .or_else(|| {
                parts
                    .extensions
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip())
            })
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| UNKNOWN_CLIENT_IP.to_string());

        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Self { ip, user_agent }
    }
}

/// The rightmost `X-Forwarded-For` entry, the one appended by the proxy.
/// Entries to its left are client-supplied and never consulted.
fn forwarded_ip(parts: &Parts) -> Option<IpAddr> {
    parts
        .headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .last()
        .and_then(|v| v.trim().parse().ok())
}

impl FromRequestParts<AppState> for ClientInfo {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts, state.config.trust_forwarded_for))
    }
}

/// Build the credential carrier for a request: bearer token plus client info.
pub fn credential_carrier(parts: &Parts, trust_forwarded_for: bool) -> CredentialCarrier {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());
    let client = ClientInfo::from_parts(parts, trust_forwarded_for);

    CredentialCarrier {
        bearer,
        ip: client.ip,
        user_agent: client.user_agent,
    }
}

/// An authenticated caller.
///
/// Running this extractor runs the full authentication gate: revocation
/// check, token verification, session validation (which slides the
/// session's inactivity window) and a live user lookup. The result is cached
/// in the request extensions so stacked extractors authenticate once.
///
/// ```ignore
/// async fn my_handler(user: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = user.identity.user_id, role = %user.identity.role, "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity: IdentityContext,
    pub session: Session,
    /// The raw access token, kept so logout can revoke it.
    pub token: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let carrier = credential_carrier(parts, state.config.trust_forwarded_for);
        let authenticated = state.gate.authenticate(&carrier).await?;

        let user = AuthUser {
            identity: authenticated.identity,
            session: authenticated.session,
            token: carrier.bearer.unwrap_or_default(),
        };
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(builder: axum::http::request::Builder) -> Parts {
        builder.body(()).unwrap().into_parts().0
    }

    fn behind_proxy(forwarded_for: &str) -> Parts {
        let mut p = parts(
            Request::builder()
                .header("x-forwarded-for", forwarded_for)
                .header("user-agent", "curl/8"),
        );
        p.extensions
            .insert(ConnectInfo(SocketAddr::from(([10, 0, 0, 2], 4000))));
        p
    }

    #[test]
    fn forwarded_for_ignored_unless_trusted() {
        let p = behind_proxy("203.0.113.7");

        let info = ClientInfo::from_parts(&p, false);
        assert_eq!(info.ip, "10.0.0.2");
        assert_eq!(info.user_agent.as_deref(), Some("curl/8"));
    }

    #[test]
    fn trusted_proxy_entry_is_the_last_one() {
        let p = behind_proxy("198.51.100.1, 203.0.113.7");
        assert_eq!(ClientInfo::from_parts(&p, true).ip, "203.0.113.7");
    }

    #[test]
    fn non_address_forwarded_values_fall_back_to_socket() {
        for value in ["spoof-1", "", "203.0.113.7, not-an-ip"] {
            let p = behind_proxy(value);
            assert_eq!(ClientInfo::from_parts(&p, true).ip, "10.0.0.2", "{value:?}");
        }
    }

    #[test]
    fn socket_address_then_unknown() {
        let mut p = parts(Request::builder());
        assert_eq!(ClientInfo::from_parts(&p, false).ip, UNKNOWN_CLIENT_IP);

        p.extensions
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 1], 4000))));
        assert_eq!(ClientInfo::from_parts(&p, false).ip, "192.0.2.1");
    }

    #[test]
    fn bearer_token_is_extracted() {
        let p = parts(Request::builder().header("authorization", "Bearer abc.def.ghi"));
        assert_eq!(
            credential_carrier(&p, false).bearer.as_deref(),
            Some("abc.def.ghi")
        );

        let p = parts(Request::builder().header("authorization", "Basic Zm9vOmJhcg=="));
        assert!(credential_carrier(&p, false).bearer.is_none());
    }
}
