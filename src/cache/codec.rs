//! L3 record encoding: bincode envelope around deflate-compressed text.

use crate::error::StorageError;
use chrono::{DateTime, Utc};
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredRecord {
    pub compressed: Vec<u8>,
    pub inserted_at: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
}

pub fn compress(text: &str) -> Result<Vec<u8>, StorageError> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(text.as_bytes())
        .map_err(|e| StorageError::Encode(format!("Failed to compress entry: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| StorageError::Encode(format!("Failed to finish compression: {}", e)))
}

pub fn decompress(bytes: &[u8]) -> Result<String, StorageError> {
    let mut text = String::new();
    DeflateDecoder::new(bytes)
        .read_to_string(&mut text)
        .map_err(|e| StorageError::Decode(format!("Failed to decompress entry: {}", e)))?;
    Ok(text)
}

pub(crate) fn encode_record(record: &StoredRecord) -> Result<Vec<u8>, StorageError> {
    bincode::serialize(record)
        .map_err(|e| StorageError::Encode(format!("Failed to serialize cache record: {}", e)))
}

pub(crate) fn decode_record(bytes: &[u8]) -> Result<StoredRecord, StorageError> {
    bincode::deserialize(bytes)
        .map_err(|e| StorageError::Decode(format!("Failed to deserialize cache record: {}", e)))
}
