//! SHA-256 helpers shared by the integrity, audit, and changelog layers.

use sha2::{Digest, Sha256};

/// Prefix carried by every checksum string Quay writes to disk.
pub const SHA256_PREFIX: &str = "sha256:";

/// Compute the SHA-256 of a byte slice as lowercase hex.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute the SHA-256 of a string as lowercase hex.
pub fn sha256_str(s: &str) -> String {
    sha256_bytes(s.as_bytes())
}

/// Compute a prefixed checksum (`sha256:<hex>`) of a byte slice.
pub fn prefixed_sha256(data: &[u8]) -> String {
    format!("{}{}", SHA256_PREFIX, sha256_bytes(data))
}

/// Check whether a string is a well-formed prefixed checksum.
pub fn is_valid_checksum(s: &str) -> bool {
    match s.strip_prefix(SHA256_PREFIX) {
        Some(hex_part) => {
            hex_part.len() == 64
                && hex_part
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        }
        None => false,
    }
}
