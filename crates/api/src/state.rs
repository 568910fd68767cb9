use std::sync::Arc;

use crate::auth::gate::AuthGate;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, absent when running on in-memory stores.
    pub pool: Option<carebase_db::DbPool>,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Authentication gate and the session, revocation and limiter services
    /// it owns.
    pub gate: Arc<AuthGate>,
}
