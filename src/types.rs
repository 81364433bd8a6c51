//! Shared identifier types.

/// 32-byte blake3 digest identifying a generation input.
pub type Fingerprint = [u8; 32];

/// Identifier of a task in a task pool.
pub type TaskId = String;

/// Identifier of a section inside a task's document.
pub type SectionId = String;

/// Short hex prefix of a fingerprint for log fields.
pub fn short_hex(fingerprint: &Fingerprint) -> String {
    hex::encode(&fingerprint[..6])
}
