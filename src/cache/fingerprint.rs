//! Fingerprint computation for cache keys
//!
//! Fingerprint = blake3 over tagged, length-prefixed fields, so that
//! ("ab", "c") and ("a", "bc") never collide.

use crate::types::Fingerprint;
use blake3::Hasher;

/// Incremental fingerprint over named generation inputs.
pub struct FingerprintBuilder {
    hasher: Hasher,
}

impl FingerprintBuilder {
    pub fn new(domain: &str) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(b"folio:");
        hasher.update(domain.as_bytes());
        Self { hasher }
    }

    pub fn field(mut self, tag: &str, value: &[u8]) -> Self {
        self.hasher.update(tag.as_bytes());
        self.hasher.update(b":");
        self.hasher.update(&(value.len() as u64).to_le_bytes());
        self.hasher.update(value);
        self
    }

    pub fn text(self, tag: &str, value: &str) -> Self {
        self.field(tag, value.as_bytes())
    }

    pub fn finish(self) -> Fingerprint {
        *self.hasher.finalize().as_bytes()
    }
}
