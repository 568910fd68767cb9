use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Absent when the server runs on in-memory stores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_healthy: Option<bool>,
    /// Sessions held in this process's fast tier.
    pub cached_sessions: usize,
}

/// GET /health
///
/// A failing database check reports `degraded` rather than an error status,
/// so load balancers keep routing while sessions still validate from cache.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = match &state.pool {
        Some(pool) => Some(carebase_db::health_check(pool).await.is_ok()),
        None => None,
    };

    Json(HealthResponse {
        status: if db_healthy == Some(false) { "degraded" } else { "ok" },
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
        cached_sessions: state.gate.sessions().cached_count(),
    })
}

/// Mounted at the root, outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
