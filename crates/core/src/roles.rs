//! Well-known role and permission names.
//!
//! These must match the seed data in `20260301000001_create_users_and_roles.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_CLINICIAN: &str = "clinician";
pub const ROLE_RECEPTIONIST: &str = "receptionist";
pub const ROLE_PATIENT: &str = "patient";

/// Permission names granted through `role_permissions` / `user_permissions`.
pub mod permissions {
    /// Force-logout any user's sessions.
    pub const SESSIONS_REVOKE: &str = "sessions:revoke";
    pub const PATIENTS_READ: &str = "patients:read";
    pub const PATIENTS_WRITE: &str = "patients:write";
    pub const APPOINTMENTS_MANAGE: &str = "appointments:manage";
    pub const BILLING_MANAGE: &str = "billing:manage";
}

/// User status value that permits authentication.
pub const USER_STATUS_ACTIVE: &str = "active";
