//! Administrative session management.

use axum::extract::{Path, State};
use axum::Json;
use carebase_core::types::DbId;
use serde::Serialize;

use crate::error::AppResult;
use crate::middleware::rbac::{RequirePermission, RevokeSessions};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct RevokeSessionsResponse {
    pub user_id: DbId,
    pub sessions_ended: usize,
}

/// POST /api/v1/admin/users/{id}/sessions/revoke
///
/// Force-logout a user everywhere. Requires `sessions:revoke`.
pub async fn revoke_user_sessions(
    State(state): State<AppState>,
    admin: RequirePermission<RevokeSessions>,
    Path(user_id): Path<DbId>,
) -> AppResult<Json<DataResponse<RevokeSessionsResponse>>> {
    let sessions_ended = state.gate.logout_all(user_id).await?;
    tracing::info!(
        target: "security",
        event = "admin_session_revoke",
        admin_id = admin.user().identity.user_id,
        user_id,
        sessions_ended,
        "Administrator ended all sessions for user",
    );
    Ok(Json(DataResponse {
        data: RevokeSessionsResponse {
            user_id,
            sessions_ended,
        },
    }))
}
