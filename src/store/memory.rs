//! In-memory persistent store, for tests and runs with persistence disabled.

use crate::error::StorageError;
use crate::store::PersistentStore;
use parking_lot::RwLock;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.records.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.records.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        self.records.write().remove(key);
        Ok(())
    }

    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.records.read().len())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.records.write().clear();
        Ok(())
    }
}
