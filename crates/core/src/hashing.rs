//! SHA-256 digests and random identifier generation.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of a generated session identifier (alphanumeric characters).
pub const SESSION_ID_LENGTH: usize = 48;

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// Generate a fresh, high-entropy session identifier.
///
/// 48 alphanumeric characters carry roughly 285 bits of entropy, so ids are
/// never reused in practice.
pub fn generate_session_id() -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(SESSION_ID_LENGTH)
        .map(char::from)
        .collect()
}
