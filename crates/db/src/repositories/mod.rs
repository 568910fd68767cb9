//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod login_attempt_repo;
pub mod revoked_token_repo;
pub mod session_repo;
pub mod user_repo;

pub use login_attempt_repo::LoginAttemptRepo;
pub use revoked_token_repo::RevokedTokenRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
