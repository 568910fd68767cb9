//! Authorization guards layered after authentication.
//!
//! Each guard is a pure predicate over an [`IdentityContext`]. Policy (which
//! roles may do what) lives with the route definitions; this module only
//! evaluates requirements.

use crate::error::AccessDenied;
use crate::identity::IdentityContext;
use crate::types::DbId;

/// A single authorization requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement<'a> {
    /// Caller's role must be one of these.
    AnyRole(&'a [&'a str]),
    /// Caller must hold this permission.
    Permission(&'a str),
    /// Caller must be the resource owner.
    Owner(DbId),
    /// The session must have a confirmed second factor.
    MfaVerified,
}

/// Evaluate one requirement, returning the deny reason on failure.
pub fn authorize(ctx: &IdentityContext, requirement: Requirement<'_>) -> Result<(), AccessDenied> {
    match requirement {
        Requirement::AnyRole(roles) => {
            if roles.iter().any(|r| ctx.has_role(r)) {
                Ok(())
            } else {
                Err(AccessDenied::InsufficientRole)
            }
        }
        Requirement::Permission(permission) => {
            if ctx.has_permission(permission) {
                Ok(())
            } else {
                Err(AccessDenied::MissingPermission)
            }
        }
        Requirement::Owner(owner_id) => {
            if ctx.user_id == owner_id {
                Ok(())
            } else {
                Err(AccessDenied::NotOwner)
            }
        }
        Requirement::MfaVerified => {
            if ctx.mfa_verified {
                Ok(())
            } else {
                Err(AccessDenied::MfaRequired)
            }
        }
    }
}

/// Boolean form of [`authorize`].
pub fn is_authorized(ctx: &IdentityContext, requirement: Requirement<'_>) -> bool {
    authorize(ctx, requirement).is_ok()
}

/// Evaluate requirements in order, stopping at the first denial.
pub fn authorize_all(
    ctx: &IdentityContext,
    requirements: &[Requirement<'_>],
) -> Result<(), AccessDenied> {
    requirements.iter().try_for_each(|r| authorize(ctx, *r))
}
