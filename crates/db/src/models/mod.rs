//! Row models mapped with `sqlx::FromRow`.

pub mod login_attempt;
pub mod session;
pub mod user;
