//! SHA-256 fingerprint of executed SQL.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of a string
pub fn compute_checksum(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    format!("{:x}", hasher.finalize())
}
