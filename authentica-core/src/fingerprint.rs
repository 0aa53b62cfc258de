//! Canonical content fingerprints.
//!
//! Product details are fingerprinted with Keccak-256 over the raw UTF-8
//! string at registration time; verification recomputes the digest from the
//! details the consumer supplies and compares it case-insensitively against
//! the on-chain value.

use sha3::{Digest, Keccak256};

/// Compute the canonical fingerprint of a details string.
///
/// Returns a `0x`-prefixed lowercase hex digest. Deterministic: the same
/// input always yields the same fingerprint.
pub fn details_fingerprint(details: &str) -> String {
    let mut hasher = Keccak256::new();
    hasher.update(details.as_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}

/// Case-insensitive fingerprint equality, tolerant of a missing `0x` prefix.
pub fn fingerprints_match(a: &str, b: &str) -> bool {
    normalize(a) == normalize(b)
}

fn normalize(fingerprint: &str) -> String {
    let fingerprint = fingerprint.trim();
    let fingerprint = fingerprint
        .strip_prefix("0x")
        .or_else(|| fingerprint.strip_prefix("0X"))
        .unwrap_or(fingerprint);
    fingerprint.to_ascii_lowercase()
}
