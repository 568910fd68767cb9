//! Row model for the `login_attempts` table.

use carebase_core::error::StoreError;
use carebase_core::login_attempts::AttemptCounter;
use carebase_core::types::Timestamp;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct LoginAttemptRow {
    pub attempt_count: i32,
    pub expires_at: Timestamp,
}

impl TryFrom<LoginAttemptRow> for AttemptCounter {
    type Error = StoreError;

    fn try_from(row: LoginAttemptRow) -> Result<Self, Self::Error> {
        let count = u32::try_from(row.attempt_count).map_err(|_| {
            StoreError::Corrupt(format!("negative attempt_count {}", row.attempt_count))
        })?;
        Ok(AttemptCounter {
            count,
            expires_at: row.expires_at,
        })
    }
}
