//! Content fingerprints for uploaded bytes.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Lowercase hex SHA-256 of `bytes`.
pub fn hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Checks a caller-declared digest against `bytes`. Case and surrounding
/// whitespace in `expected` are ignored.
pub fn verify(expected: &str, bytes: &[u8]) -> bool {
    matches_digest(expected, &hash(bytes))
}

/// Compares a declared digest with one already computed by [`hash`].
pub fn matches_digest(expected: &str, computed: &str) -> bool {
    let expected = expected.trim().to_ascii_lowercase();
    if expected.len() != computed.len() {
        return false;
    }
    expected.as_bytes().ct_eq(computed.as_bytes()).into()
}
