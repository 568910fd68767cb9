use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use carebase_api::auth::gate::{AuthGate, AuthStores};
use carebase_api::background;
use carebase_api::config::ServerConfig;
use carebase_api::router::build_app_router;
use carebase_api::state::AppState;
use carebase_core::clock::SystemClock;
use carebase_db::stores::{PgAttemptStore, PgRevocationStore, PgSessionStore, PgUserDirectory};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "carebase_api=debug,carebase_db=info,security=info,tower_http=debug".into());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        port = %config.port,
        session_timeout_secs = config.auth.session_timeout_secs,
        max_sessions_per_user = config.auth.max_sessions_per_user,
        enforce_ip_binding = config.auth.enforce_ip_binding,
        trust_forwarded_for = config.trust_forwarded_for,
        failure_policy = config.auth.session_store_failure_policy.as_str(),
        "Loaded server configuration",
    );

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = carebase_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    carebase_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    carebase_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Auth gate ---
    let stores = AuthStores {
        sessions: Arc::new(PgSessionStore::new(pool.clone())),
        revocations: Arc::new(PgRevocationStore::new(pool.clone())),
        attempts: Arc::new(PgAttemptStore::new(pool.clone())),
        users: Arc::new(PgUserDirectory::new(pool.clone())),
    };
    let gate = Arc::new(AuthGate::from_config(
        &config.jwt,
        &config.auth,
        stores,
        Arc::new(SystemClock),
    ));

    // --- Background sweeper ---
    let sweeper_cancel = CancellationToken::new();
    let sweeper_handle = tokio::spawn(background::session_sweeper::run(
        Arc::clone(&gate),
        config.auth.sweep_interval(),
        sweeper_cancel.clone(),
    ));

    // --- App state & router ---
    let state = AppState {
        pool: Some(pool.clone()),
        config: Arc::new(config.clone()),
        gate,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweeper_cancel.cancel();
    let drain = Duration::from_secs(config.shutdown_timeout_secs);
    if tokio::time::timeout(drain, sweeper_handle).await.is_err() {
        tracing::warn!("Session sweeper did not stop within the shutdown timeout");
    }

    pool.close().await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
