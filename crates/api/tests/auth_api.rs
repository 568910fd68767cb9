//! HTTP-level integration tests for the auth and admin endpoints.

mod common;

use axum::http::StatusCode;
use common::{
    access_token, body_json, build_test_app, get, get_auth, login, post_auth, post_json,
    ADMIN_EMAIL, CLINICIAN_EMAIL, CLINICIAN_ID, PASSWORD,
};
use serde_json::json;

#[tokio::test]
async fn test_health_without_database() {
    let app = build_test_app();
    let response = get(&app.router, "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json.get("db_healthy").is_none());
    assert_eq!(json["cached_sessions"], 0);
}

#[tokio::test]
async fn test_health_counts_cached_sessions() {
    let app = build_test_app();
    login(&app.router, CLINICIAN_EMAIL).await;
    login(&app.router, ADMIN_EMAIL).await;

    let json = body_json(get(&app.router, "/health").await).await;
    assert_eq!(json["cached_sessions"], 2);
}

#[tokio::test]
async fn test_login_success() {
    let app = build_test_app();
    let pair = login(&app.router, CLINICIAN_EMAIL).await;

    assert!(pair["access_token"].is_string());
    assert!(pair["refresh_token"].is_string());
    assert_eq!(pair["expires_in"], 900);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = build_test_app();
    let response = post_json(
        &app.router,
        "/api/v1/auth/login",
        json!({ "email": CLINICIAN_EMAIL, "password": "not-it" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_login_unknown_email_is_indistinguishable() {
    let app = build_test_app();
    let response = post_json(
        &app.router,
        "/api/v1/auth/login",
        json!({ "email": "nobody@clinic.test", "password": PASSWORD }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_login_rejects_malformed_body() {
    let app = build_test_app();
    let response = post_json(
        &app.router,
        "/api/v1/auth/login",
        json!({ "email": "not-an-email", "password": PASSWORD }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_login_inactive_account() {
    let app = build_test_app();
    app.users.set_status(CLINICIAN_ID, "suspended");

    let response = post_json(
        &app.router,
        "/api/v1/auth/login",
        json!({ "email": CLINICIAN_EMAIL, "password": PASSWORD }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "ACCOUNT_INACTIVE");
}

#[tokio::test]
async fn test_me_returns_identity_context() {
    let app = build_test_app();
    let token = access_token(&login(&app.router, CLINICIAN_EMAIL).await);

    let response = get_auth(&app.router, "/api/v1/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["user_id"], CLINICIAN_ID);
    assert_eq!(json["data"]["email"], CLINICIAN_EMAIL);
    assert_eq!(json["data"]["role"], "clinician");
    assert_eq!(json["data"]["permissions"], json!(["patients:read"]));
    assert_eq!(json["data"]["organization_id"], 100);
    assert_eq!(json["data"]["mfa_verified"], false);
}

#[tokio::test]
async fn test_me_requires_token() {
    let app = build_test_app();

    let response = get(&app.router, "/api/v1/auth/me").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "TOKEN_MISSING");

    let response = get_auth(&app.router, "/api/v1/auth/me", "garbage").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "TOKEN_INVALID");
}

#[tokio::test]
async fn test_refresh_issues_working_access_token() {
    let app = build_test_app();
    let pair = login(&app.router, CLINICIAN_EMAIL).await;

    let response = post_json(
        &app.router,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": pair["refresh_token"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let refreshed = body_json(response).await;
    let token = refreshed["access_token"].as_str().unwrap().to_string();
    assert!(refreshed.get("refresh_token").is_none());

    let response = get_auth(&app.router, "/api/v1/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_with_access_token_is_rejected() {
    let app = build_test_app();
    let pair = login(&app.router, CLINICIAN_EMAIL).await;

    let response = post_json(
        &app.router,
        "/api/v1/auth/refresh",
        json!({ "refresh_token": pair["access_token"] }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "TOKEN_INVALID");
}

#[tokio::test]
async fn test_logout_invalidates_session() {
    let app = build_test_app();
    let token = access_token(&login(&app.router, CLINICIAN_EMAIL).await);

    let response = post_auth(&app.router, "/api/v1/auth/logout", &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = get_auth(&app.router, "/api/v1/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "SESSION_INVALID");
}

#[tokio::test]
async fn test_sessions_lists_own_sessions() {
    let app = build_test_app();
    let first = access_token(&login(&app.router, CLINICIAN_EMAIL).await);
    app.clock.advance(chrono::Duration::seconds(5));
    login(&app.router, CLINICIAN_EMAIL).await;
    login(&app.router, ADMIN_EMAIL).await;

    let response = get_auth(&app.router, "/api/v1/auth/sessions", &first).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let sessions = json["data"].as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0]["current"], true);
    assert_eq!(sessions[1]["current"], false);
    assert_eq!(sessions[0]["ip_address"], common::CLIENT_IP);
    assert_eq!(sessions[0]["user_agent"], "carebase-tests");
}

#[tokio::test]
async fn test_logout_all_ends_every_session() {
    let app = build_test_app();
    let a = access_token(&login(&app.router, CLINICIAN_EMAIL).await);
    let b = access_token(&login(&app.router, CLINICIAN_EMAIL).await);

    let response = post_auth(&app.router, "/api/v1/auth/logout-all", &a).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["sessions_ended"], 2);

    for token in [a, b] {
        let response = get_auth(&app.router, "/api/v1/auth/me", &token).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_admin_revoke_requires_permission() {
    let app = build_test_app();
    let token = access_token(&login(&app.router, CLINICIAN_EMAIL).await);

    let response = post_auth(
        &app.router,
        "/api/v1/admin/users/2/sessions/revoke",
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "MISSING_PERMISSION");
}

#[tokio::test]
async fn test_admin_revoke_forces_logout() {
    let app = build_test_app();
    let clinician = access_token(&login(&app.router, CLINICIAN_EMAIL).await);
    let admin = access_token(&login(&app.router, ADMIN_EMAIL).await);

    let uri = format!("/api/v1/admin/users/{CLINICIAN_ID}/sessions/revoke");
    let response = post_auth(&app.router, &uri, &admin).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["user_id"], CLINICIAN_ID);
    assert_eq!(json["data"]["sessions_ended"], 1);

    let response = get_auth(&app.router, "/api/v1/auth/me", &clinician).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "SESSION_INVALID");

    let response = get_auth(&app.router, "/api/v1/auth/me", &admin).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_revoked_permission_applies_on_next_request() {
    let app = build_test_app();
    let admin = access_token(&login(&app.router, ADMIN_EMAIL).await);

    app.users
        .set_permissions(common::ADMIN_ID, vec!["patients:read".to_string()]);

    let uri = format!("/api/v1/admin/users/{CLINICIAN_ID}/sessions/revoke");
    let response = post_auth(&app.router, &uri, &admin).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deactivated_user_is_locked_out_mid_session() {
    let app = build_test_app();
    let token = access_token(&login(&app.router, CLINICIAN_EMAIL).await);

    app.users.set_status(CLINICIAN_ID, "disabled");

    let response = get_auth(&app.router, "/api/v1/auth/me", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "ACCOUNT_INACTIVE");
}
