//! Row model for the `auth_sessions` table.

use carebase_core::session::Session;
use carebase_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A session row from the `auth_sessions` table.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: String,
    pub user_id: DbId,
    pub created_at: Timestamp,
    pub last_activity: Timestamp,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub is_valid: bool,
    pub mfa_verified: Option<bool>,
}

impl From<SessionRow> for Session {
    fn from(row: SessionRow) -> Self {
        Session {
            id: row.id,
            user_id: row.user_id,
            created_at: row.created_at,
            last_activity: row.last_activity,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            is_valid: row.is_valid,
            mfa_verified: row.mfa_verified,
        }
    }
}
