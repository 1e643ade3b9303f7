//! Domain-Separated Hashing
//!
//! SHA-256 helpers shared by seed derivation and the claim registry's
//! commitments. Every hash in the crate goes behind an ASCII domain
//! separator so values from different protocols can never collide.

use sha2::{Digest, Sha256};

/// Hash output type (256 bits / 32 bytes).
pub type Hash32 = [u8; 32];

/// Deterministic hasher with helpers for the crate's primitive types.
///
/// Update order is part of the hash; callers feed fields in a fixed,
/// documented order.
pub struct DomainHasher {
    hasher: Sha256,
}

impl DomainHasher {
    /// Create a new hasher seeded with a domain separator.
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

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u16 value (little-endian).
    #[inline]
    pub fn update_u16(&mut self, value: u16) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> Hash32 {
        self.hasher.finalize().into()
    }
}

/// Hash arbitrary bytes behind a domain separator.
pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> Hash32 {
    let mut hasher = Sha256::new();
    hasher.update(domain);
    hasher.update(data);
    hasher.finalize().into()
}

/// Short hex rendering of a hash for log lines.
pub fn short_hex(hash: &Hash32) -> String {
    hex::encode(&hash[..4])
}
