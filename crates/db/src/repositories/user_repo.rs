//! Repository for the `users` table and its role/permission joins.

use carebase_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::{CreateUser, UserWithPermissions};

/// Select list producing a [`UserWithPermissions`] row for alias `u`.
///
/// The permission set is the union of the role's grants and the user's
/// direct grants, sorted for stable output.
const SELECT_WITH_PERMISSIONS: &str = "SELECT u.id, u.email, u.password_hash, r.name AS role, \
     u.status, u.organization_id, u.provider_id, \
     ARRAY(SELECT p.name FROM permissions p \
           WHERE p.id IN (SELECT rp.permission_id FROM role_permissions rp WHERE rp.role_id = u.role_id \
                          UNION \
                          SELECT up.permission_id FROM user_permissions up WHERE up.user_id = u.id) \
           ORDER BY p.name) AS permissions \
     FROM users u JOIN roles r ON r.id = u.role_id";

/// Provides lookups for the authentication gate plus minimal write helpers.
pub struct UserRepo;

impl UserRepo {
    /// Find a user with role name and effective permissions by id.
    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<UserWithPermissions>, sqlx::Error> {
        let query = format!("{SELECT_WITH_PERMISSIONS} WHERE u.id = $1");
        sqlx::query_as::<_, UserWithPermissions>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a user by email (case-insensitive).
    pub async fn find_by_email(
        pool: &PgPool,
        email: &str,
    ) -> Result<Option<UserWithPermissions>, sqlx::Error> {
        let query = format!("{SELECT_WITH_PERMISSIONS} WHERE LOWER(u.email) = LOWER($1)");
        sqlx::query_as::<_, UserWithPermissions>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Insert a new user, resolving the role by name. Returns the new id.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<DbId, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO users (email, password_hash, role_id, organization_id, provider_id)
             SELECT $1, $2, r.id, $4, $5 FROM roles r WHERE r.name = $3
             RETURNING id",
        )
        .bind(&input.email)
        .bind(&input.password_hash)
        .bind(&input.role)
        .bind(input.organization_id)
        .bind(input.provider_id)
        .fetch_one(pool)
        .await
    }

    /// Change a user's status (e.g. `"active"`, `"suspended"`).
    pub async fn set_status(pool: &PgPool, id: DbId, status: &str) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(status)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Grant a named permission directly to a user. Idempotent.
    pub async fn grant_permission(
        pool: &PgPool,
        user_id: DbId,
        permission: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_permissions (user_id, permission_id)
             SELECT $1, p.id FROM permissions p WHERE p.name = $2
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(permission)
        .execute(pool)
        .await?;
        Ok(())
    }
}
