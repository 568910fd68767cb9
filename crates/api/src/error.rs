use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use carebase_core::error::{AccessDenied, AuthRejection};
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps the auth rejection taxonomy and adds request validation failures.
/// Store and signing failures never surface here raw: the gate has already
/// turned them into [`AuthRejection::Unavailable`].
/// Implements [`IntoResponse`] to produce consistent JSON error responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Authentication failed (gate, login or refresh).
    #[error(transparent)]
    Rejected(#[from] AuthRejection),

    /// Authenticated, but a guard denied the request.
    #[error(transparent)]
    Forbidden(#[from] AccessDenied),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::BadRequest(errors.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut retry_after = None;

        let (status, code, message) = match &self {
            AppError::Rejected(rejection) => {
                let status = match rejection {
                    AuthRejection::TokenMissing
                    | AuthRejection::TokenInvalid
                    | AuthRejection::TokenExpired
                    | AuthRejection::SessionInvalid
                    | AuthRejection::InvalidCredentials => StatusCode::UNAUTHORIZED,
                    AuthRejection::AccountInactive => StatusCode::FORBIDDEN,
                    AuthRejection::RateLimited { retry_after_secs } => {
                        retry_after = Some(*retry_after_secs);
                        StatusCode::TOO_MANY_REQUESTS
                    }
                    AuthRejection::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                };
                (status, rejection.code(), rejection.to_string())
            }
            AppError::Forbidden(denied) => {
                (StatusCode::FORBIDDEN, denied.code(), denied.to_string())
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        let mut response = (status, axum::Json(body)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_map_to_statuses() {
        let cases = [
            (AuthRejection::TokenMissing, StatusCode::UNAUTHORIZED),
            (AuthRejection::TokenInvalid, StatusCode::UNAUTHORIZED),
            (AuthRejection::TokenExpired, StatusCode::UNAUTHORIZED),
            (AuthRejection::SessionInvalid, StatusCode::UNAUTHORIZED),
            (AuthRejection::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthRejection::AccountInactive, StatusCode::FORBIDDEN),
            (AuthRejection::Unavailable, StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (rejection, status) in cases {
            assert_eq!(AppError::from(rejection).into_response().status(), status);
        }
        assert_eq!(
            AppError::from(AccessDenied::MissingPermission)
                .into_response()
                .status(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn rate_limited_sets_retry_after() {
        let response =
            AppError::from(AuthRejection::RateLimited { retry_after_secs: 42 }).into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "42");
    }

    #[test]
    fn bad_request_is_never_a_server_error() {
        let response = AppError::BadRequest("email: invalid".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Store and signing failures arrive as `Unavailable`, not as 500s.
        let response = AppError::from(AuthRejection::Unavailable).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
