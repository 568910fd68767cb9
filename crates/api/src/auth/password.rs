//! Argon2id password hashing and verification.
//!
//! Hashes are stored as PHC strings, so algorithm parameters and salt travel
//! with the hash itself.

use std::sync::OnceLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Hash a plaintext password using Argon2id with a random salt.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC-formatted hash.
///
/// Returns `Ok(true)` if the password matches, `Ok(false)` if it does not,
/// and `Err` only when the stored hash itself cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Hash verified against when the login email matches no account, so an
/// unknown email costs the same as a wrong password.
fn placeholder_hash() -> Option<&'static str> {
    static PLACEHOLDER: OnceLock<Option<String>> = OnceLock::new();
    PLACEHOLDER
        .get_or_init(|| hash_password("carebase-placeholder-credential").ok())
        .as_deref()
}

/// Check a login password against an optional stored hash.
///
/// `None` (no such account) always yields `false`, after spending the same
/// Argon2 work as a real comparison. An unparseable stored hash is logged
/// and treated as a mismatch.
pub fn verify_credentials(password: &str, stored_hash: Option<&str>) -> bool {
    match stored_hash {
        Some(hash) => verify_password(password, hash).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Stored password hash is not a valid PHC string");
            false
        }),
        None => {
            if let Some(hash) = placeholder_hash() {
                let _ = verify_password(password, hash);
            }
            false
        }
    }
}
