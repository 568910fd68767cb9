//! Principal records fetched from the user store, and the identity context
//! attached to authenticated requests.

use serde::Serialize;

use crate::roles::USER_STATUS_ACTIVE;
use crate::types::{DbId, Timestamp};

/// A user as returned by the user-store collaborator.
///
/// Contains the password hash -- never serialize this to API responses.
#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: DbId,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    /// `"active"` permits authentication; anything else is rejected.
    pub status: String,
    /// Role permissions plus direct grants, deduplicated.
    pub permissions: Vec<String>,
    pub organization_id: Option<DbId>,
    pub provider_id: Option<DbId>,
}

impl UserRecord {
    pub fn is_active(&self) -> bool {
        self.status == USER_STATUS_ACTIVE
    }
}

impl std::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .field("status", &self.status)
            .field("permissions", &self.permissions)
            .field("organization_id", &self.organization_id)
            .field("provider_id", &self.provider_id)
            .finish()
    }
}

/// The resolved caller of an authenticated request.
///
/// `role` and `permissions` come from the live user-store read made on every
/// request, not from the token, so a revoked permission takes effect on the
/// next request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityContext {
    pub user_id: DbId,
    pub email: String,
    pub role: String,
    pub permissions: Vec<String>,
    pub organization_id: Option<DbId>,
    pub provider_id: Option<DbId>,
    pub session_id: String,
    pub mfa_verified: bool,
    /// Expiry of the access token that authenticated this request.
    pub token_expires_at: Timestamp,
}

impl IdentityContext {
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}
