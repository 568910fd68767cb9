//! Permission-based access control extractors.
//!
//! Each extractor wraps [`AuthUser`] and applies a guard from
//! [`carebase_core::guards`], rejecting with 403 when it denies.

use std::marker::PhantomData;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use carebase_core::guards::{authorize, Requirement};
use carebase_core::roles::permissions;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// A permission name usable as a type parameter of [`RequirePermission`].
pub trait PermissionName {
    const NAME: &'static str;
}

/// Permission to force-logout other users.
pub struct RevokeSessions;

impl PermissionName for RevokeSessions {
    const NAME: &'static str = permissions::SESSIONS_REVOKE;
}

/// Requires the permission named by `P`. Rejects with 403 otherwise.
///
/// ```ignore
/// async fn revoke(RequirePermission(admin, ..): RequirePermission<RevokeSessions>) -> AppResult<()> {
///     Ok(())
/// }
/// ```
pub struct RequirePermission<P: PermissionName>(pub AuthUser, PhantomData<P>);

impl<P: PermissionName> RequirePermission<P> {
    pub fn user(&self) -> &AuthUser {
        &self.0
    }
}

impl<P> FromRequestParts<AppState> for RequirePermission<P>
where
    P: PermissionName + Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        authorize(&user.identity, Requirement::Permission(P::NAME)).map_err(|denied| {
            tracing::info!(
                user_id = user.identity.user_id,
                permission = P::NAME,
                "Request denied: missing permission",
            );
            AppError::Forbidden(denied)
        })?;
        Ok(RequirePermission(user, PhantomData))
    }
}
