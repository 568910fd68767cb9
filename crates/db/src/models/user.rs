//! User row model and DTOs.

use carebase_core::identity::UserRecord;
use carebase_core::types::DbId;
use sqlx::FromRow;

/// A user joined with its role name and effective permission set.
///
/// Contains the password hash -- NEVER serialize this to API responses.
#[derive(Clone, FromRow)]
pub struct UserWithPermissions {
    pub id: DbId,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub status: String,
    pub organization_id: Option<DbId>,
    pub provider_id: Option<DbId>,
    pub permissions: Vec<String>,
}

impl From<UserWithPermissions> for UserRecord {
    fn from(row: UserWithPermissions) -> Self {
        UserRecord {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role,
            status: row.status,
            permissions: row.permissions,
            organization_id: row.organization_id,
            provider_id: row.provider_id,
        }
    }
}

/// DTO for creating a new user.
#[derive(Debug)]
pub struct CreateUser {
    pub email: String,
    pub password_hash: String,
    /// Role name, resolved against the `roles` table.
    pub role: String,
    pub organization_id: Option<DbId>,
    pub provider_id: Option<DbId>,
}
