//! Persistent key/value store
//!
//! Durable byte storage used by cache tier L3 and by finalized artifacts.
//! The orchestrator only sees the trait; sled backs it on disk.

pub mod memory;
pub mod persistence;

pub use memory::MemoryStore;
pub use persistence::SledStore;

use crate::error::StorageError;

/// Persistent store interface
pub trait PersistentStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;
    fn delete(&self, key: &[u8]) -> Result<(), StorageError>;

    /// Number of stored records
    fn len(&self) -> Result<usize, StorageError>;

    /// Remove every record
    fn clear(&self) -> Result<(), StorageError>;

    fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }
}
