#![allow(dead_code)]

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use carebase_api::auth::gate::{AuthGate, AuthStores};
use carebase_api::auth::jwt::JwtConfig;
use carebase_api::auth::password::hash_password;
use carebase_api::config::{AuthConfig, ServerConfig};
use carebase_api::router::build_app_router;
use carebase_api::state::AppState;
use carebase_core::clock::ManualClock;
use carebase_core::identity::UserRecord;
use carebase_core::roles::{permissions, ROLE_ADMIN, ROLE_CLINICIAN};
use carebase_core::store::memory::{
    MemoryAttemptStore, MemoryRevocationStore, MemorySessionStore, MemoryUserDirectory,
};
use carebase_core::store::{AttemptStore, SessionStore};
use carebase_core::types::DbId;
use http_body_util::BodyExt;
use tower::ServiceExt;

pub use carebase_core::store::testing::{DownAttemptStore, FlakySessionStore};

pub const PASSWORD: &str = "correct-horse-battery";
pub const CLINICIAN_ID: DbId = 1;
pub const CLINICIAN_EMAIL: &str = "clinician@clinic.test";
pub const ADMIN_ID: DbId = 2;
pub const ADMIN_EMAIL: &str = "admin@clinic.test";
pub const CLIENT_IP: &str = "198.51.100.20";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(auth: AuthConfig) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        // The router is driven without a socket; tests stand in for the proxy.
        trust_forwarded_for: true,
        jwt: JwtConfig {
            secret: "integration-test-secret-with-enough-entropy".to_string(),
            issuer: "carebase".to_string(),
            audience: "carebase-api".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
        auth,
    }
}

/// Argon2 is slow in debug builds; hash the shared test password once.
fn password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(PASSWORD).expect("hashing should succeed"))
        .clone()
}

/// Everything a test needs to drive the app and reach behind it.
pub struct TestApp {
    pub router: Router,
    pub gate: Arc<AuthGate>,
    pub clock: Arc<ManualClock>,
    pub users: Arc<MemoryUserDirectory>,
}

/// Durable-tier replacements for failure-mode tests.
#[derive(Default)]
pub struct StoreOverrides {
    pub sessions: Option<Arc<dyn SessionStore>>,
    pub attempts: Option<Arc<dyn AttemptStore>>,
}

pub fn build_test_app() -> TestApp {
    build_test_app_with(AuthConfig::default(), StoreOverrides::default())
}

pub fn build_test_app_with(auth: AuthConfig, overrides: StoreOverrides) -> TestApp {
    build_test_app_from(test_config(auth), overrides)
}

/// Build the full application router, using in-memory stores and a manual
/// clock, with the same middleware stack as production.
pub fn build_test_app_from(config: ServerConfig, overrides: StoreOverrides) -> TestApp {
    let clock = Arc::new(ManualClock::starting_now());

    let users = Arc::new(MemoryUserDirectory::new());
    users.upsert(UserRecord {
        id: CLINICIAN_ID,
        email: CLINICIAN_EMAIL.to_string(),
        password_hash: password_hash(),
        role: ROLE_CLINICIAN.to_string(),
        status: "active".to_string(),
        permissions: vec![permissions::PATIENTS_READ.to_string()],
        organization_id: Some(100),
        provider_id: Some(7),
    });
    users.upsert(UserRecord {
        id: ADMIN_ID,
        email: ADMIN_EMAIL.to_string(),
        password_hash: password_hash(),
        role: ROLE_ADMIN.to_string(),
        status: "active".to_string(),
        permissions: vec![
            permissions::PATIENTS_READ.to_string(),
            permissions::SESSIONS_REVOKE.to_string(),
        ],
        organization_id: Some(100),
        provider_id: None,
    });

    let stores = AuthStores {
        sessions: overrides
            .sessions
            .unwrap_or_else(|| Arc::new(MemorySessionStore::new()) as Arc<dyn SessionStore>),
        revocations: Arc::new(MemoryRevocationStore::new()),
        attempts: overrides
            .attempts
            .unwrap_or_else(|| Arc::new(MemoryAttemptStore::new()) as Arc<dyn AttemptStore>),
        users: users.clone(),
    };
    let gate = Arc::new(AuthGate::from_config(
        &config.jwt,
        &config.auth,
        stores,
        clock.clone(),
    ));

    let state = AppState {
        pool: None,
        config: Arc::new(config.clone()),
        gate: gate.clone(),
    };

    TestApp {
        router: build_app_router(state, &config),
        gate,
        clock,
        users,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone()
        .oneshot(request)
        .await
        .expect("router should not fail")
}

pub async fn get(app: &Router, uri: &str) -> Response<Body> {
    let request = Request::get(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn get_auth(app: &Router, uri: &str, token: &str) -> Response<Body> {
    get_auth_from(app, uri, token, CLIENT_IP).await
}

pub async fn get_auth_from(app: &Router, uri: &str, token: &str, ip: &str) -> Response<Body> {
    let request = Request::get(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: &Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    post_json_from(app, uri, body, CLIENT_IP).await
}

pub async fn post_json_from(
    app: &Router,
    uri: &str,
    body: serde_json::Value,
    ip: &str,
) -> Response<Body> {
    let request = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", ip)
        .header(header::USER_AGENT, "carebase-tests")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_auth(app: &Router, uri: &str, token: &str) -> Response<Body> {
    let request = Request::post(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header("x-forwarded-for", CLIENT_IP)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Log in through the API and return the token pair JSON.
pub async fn login(app: &Router, email: &str) -> serde_json::Value {
    let response = post_json(
        app,
        "/api/v1/auth/login",
        serde_json::json!({ "email": email, "password": PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    body_json(response).await
}

pub fn access_token(pair: &serde_json::Value) -> String {
    pair["access_token"]
        .as_str()
        .expect("access_token should be a string")
        .to_string()
}
