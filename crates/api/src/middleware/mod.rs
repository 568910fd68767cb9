//! Authentication and authorization extractors.
//!
//! - [`auth::ClientInfo`] -- Client address and user agent for the request.
//! - [`auth::AuthUser`] -- Runs the authentication gate on the bearer token.
//! - [`rbac::RequirePermission`] -- Requires a named permission.

pub mod auth;
pub mod rbac;
