//! SHA-256 verification of candidate binaries

use sha2::{Digest, Sha256};
use tracing::warn;

/// Size in bytes of a SHA-256 digest
pub const DIGEST_LEN: usize = 32;

/// Compute the SHA-256 digest of a buffer
pub fn digest(bytes: &[u8]) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

/// Check that `bytes` hashes to `expected`
///
/// A mismatch is logged with both digests in hex.
pub fn verify(bytes: &[u8], expected: &[u8]) -> bool {
    let computed = digest(bytes);
    let matches = computed.as_slice() == expected;

    if !matches {
        warn!(
            actual = %hex::encode(computed),
            expected = %hex::encode(expected),
            "SHA mismatch"
        );
    }

    matches
}
