//! Deterministic 128-bit path identifiers, stable across commits.

use sha2::{Digest, Sha256};

/// Derive a path-id from a path string: `sha256(path)` truncated to 128
/// bits, returned as 32 lowercase hex characters.
#[must_use]
pub fn path_id(path: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    let digest = hasher.finalize();
    let mut s = String::with_capacity(32);
    for b in &digest[..16] {
        s.push_str(&format!("{b:02x}"));
    }
    s
}
