//! Domain-Separated Hashing
//!
//! SHA-256 helpers used for:
//! - Ciphertext digests (what a proof is bound to)
//! - Encryption key fingerprints
//! - Proof commitments and binding tags

use sha2::{Sha256, Digest};

/// Hash output type (256 bits / 32 bytes)
pub type Digest32 = [u8; 32];

/// Domain for ciphertext digests.
pub const CIPHERTEXT_DOMAIN: &[u8] = b"CIPHER_BET_CIPHERTEXT_V1";

/// Domain for public key fingerprints.
pub const KEY_DOMAIN: &[u8] = b"CIPHER_BET_KEY_V1";

/// Incremental hasher with a domain separator.
///
/// Order of updates is part of the digest.
pub struct DomainHasher {
    hasher: Sha256,
}

impl DomainHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with length-prefixed bytes, so adjacent fields cannot shift.
    #[inline]
    pub fn update_framed(&mut self, bytes: &[u8]) {
        self.update_u64(bytes.len() as u64);
        self.hasher.update(bytes);
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u128 value (little-endian).
    #[inline]
    pub fn update_u128(&mut self, value: u128) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> Digest32 {
        self.hasher.finalize().into()
    }
}

/// Compute hash with domain separator.
pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> Digest32 {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(data);
    hasher.finalize().into()
}

/// Digest identifying a ciphertext.
pub fn ciphertext_digest(ciphertext: &[u8]) -> Digest32 {
    hash_with_domain(CIPHERTEXT_DOMAIN, ciphertext)
}

/// Fingerprint of a public encryption key.
pub fn key_fingerprint(public_key: &[u8]) -> Digest32 {
    hash_with_domain(KEY_DOMAIN, public_key)
}

/// Short hex prefix for log lines.
pub fn short_hex(bytes: &[u8]) -> String {
    hex::encode(&bytes[..bytes.len().min(6)])
}

// =============================================================================
// TESTS
// =============================================================================
