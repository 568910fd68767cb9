//! Handlers for the `/auth` resource (login, refresh, logout, sessions).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use carebase_core::identity::IdentityContext;
use carebase_core::session::Session;
use carebase_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::gate::{CredentialCarrier, LoginCredentials, RefreshedAccess, TokenPair};
use crate::error::AppResult;
use crate::middleware::auth::{AuthUser, ClientInfo};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

/// Response body for `POST /auth/logout-all`.
#[derive(Debug, Serialize)]
pub struct LogoutAllResponse {
    pub sessions_ended: usize,
}

/// One entry of `GET /auth/sessions`.
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub created_at: Timestamp,
    pub last_activity: Timestamp,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub mfa_verified: bool,
    /// Whether this is the session making the request.
    pub current: bool,
}

impl SessionInfo {
    fn from_session(session: Session, current_id: &str) -> Self {
        Self {
            current: session.id == current_id,
            mfa_verified: session.is_mfa_verified(),
            id: session.id,
            created_at: session.created_at,
            last_activity: session.last_activity,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Authenticate with email + password. Returns access and refresh tokens
/// bound to a new session.
pub async fn login(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<TokenPair>> {
    input.validate()?;

    let pair = state
        .gate
        .login(&LoginCredentials {
            email: input.email,
            password: input.password,
            ip: client.ip,
            user_agent: client.user_agent,
        })
        .await?;
    Ok(Json(pair))
}

/// POST /api/v1/auth/refresh
///
/// Exchange a refresh token for a new access token.
pub async fn refresh(
    State(state): State<AppState>,
    client: ClientInfo,
    Json(input): Json<RefreshRequest>,
) -> AppResult<Json<RefreshedAccess>> {
    input.validate()?;

    let carrier = CredentialCarrier {
        bearer: None,
        ip: client.ip,
        user_agent: client.user_agent,
    };
    let access = state.gate.refresh(&input.refresh_token, &carrier).await?;
    Ok(Json(access))
}

/// POST /api/v1/auth/logout
///
/// End the current session and revoke the presented access token.
pub async fn logout(State(state): State<AppState>, user: AuthUser) -> AppResult<StatusCode> {
    state
        .gate
        .logout(&user.session.id, Some(&user.token))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/auth/logout-all
///
/// End every session of the current user, including this one.
pub async fn logout_all(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<LogoutAllResponse>>> {
    if let Err(e) = state.gate.revocations().revoke(&user.token).await {
        tracing::warn!(error = %e, "Failed to revoke access token on logout-all");
    }
    let sessions_ended = state.gate.logout_all(user.identity.user_id).await?;
    Ok(Json(DataResponse {
        data: LogoutAllResponse { sessions_ended },
    }))
}

/// GET /api/v1/auth/me
pub async fn me(user: AuthUser) -> Json<DataResponse<IdentityContext>> {
    Json(DataResponse {
        data: user.identity,
    })
}

/// GET /api/v1/auth/sessions
///
/// The current user's live sessions, oldest first.
pub async fn sessions(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<DataResponse<Vec<SessionInfo>>>> {
    let sessions = state.gate.sessions_for(user.identity.user_id).await?;
    let data = sessions
        .into_iter()
        .map(|s| SessionInfo::from_session(s, &user.session.id))
        .collect();
    Ok(Json(DataResponse { data }))
}
