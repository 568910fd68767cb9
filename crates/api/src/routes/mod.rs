pub mod admin;
pub mod auth;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /auth/login                                      login (public)
/// /auth/refresh                                    refresh (public)
/// /auth/logout                                     logout (requires auth)
/// /auth/logout-all                                 end all own sessions (requires auth)
/// /auth/me                                         identity context (requires auth)
/// /auth/sessions                                   own live sessions (requires auth)
///
/// /admin/users/{id}/sessions/revoke                force-logout (sessions:revoke)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/admin", admin::router())
}
