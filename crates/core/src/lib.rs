//! Carebase authentication domain.
//!
//! Holds the types, rejection taxonomy, store contracts and pure policy
//! functions shared by the database adapters (`carebase-db`) and the HTTP
//! service (`carebase-api`). Nothing here performs network I/O directly;
//! durable state is reached through the traits in [`store`].

pub mod clock;
pub mod error;
pub mod guards;
pub mod hashing;
pub mod identity;
pub mod login_attempts;
pub mod roles;
pub mod session;
pub mod store;
pub mod types;
