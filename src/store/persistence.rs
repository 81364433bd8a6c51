//! Sled-backed persistent store

use crate::error::StorageError;
use crate::store::PersistentStore;
use std::path::Path;

/// Tree names used inside one sled database.
pub const CACHE_TREE: &str = "cache_l3";
pub const ARTIFACT_TREE: &str = "artifacts";

/// Sled-based implementation of PersistentStore, scoped to one named tree.
#[derive(Clone)]
pub struct SledStore {
    tree: sled::Tree,
}

impl SledStore {
    /// Open (or create) a sled database at `path` and scope the store to `tree_name`.
    pub fn open<P: AsRef<Path>>(path: P, tree_name: &str) -> Result<Self, StorageError> {
        let db = sled::open(path)
            .map_err(|e| StorageError::Backend(format!("Failed to open sled database: {}", e)))?;
        Self::from_db(&db, tree_name)
    }

    /// Scope a store to a tree of an already-open database.
    pub fn from_db(db: &sled::Db, tree_name: &str) -> Result<Self, StorageError> {
        let tree = db.open_tree(tree_name).map_err(|e| {
            StorageError::Backend(format!("Failed to open sled tree {}: {}", tree_name, e))
        })?;
        Ok(Self { tree })
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.tree
            .flush()
            .map_err(|e| StorageError::Backend(format!("Failed to flush tree: {}", e)))?;
        Ok(())
    }
}

impl PersistentStore for SledStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let value = self
            .tree
            .get(key)
            .map_err(|e| StorageError::Backend(format!("Failed to get record: {}", e)))?;
        Ok(value.map(|v| v.to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.tree
            .insert(key, value)
            .map_err(|e| StorageError::Backend(format!("Failed to put record: {}", e)))?;
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        self.tree
            .remove(key)
            .map_err(|e| StorageError::Backend(format!("Failed to delete record: {}", e)))?;
        Ok(())
    }

    fn len(&self) -> Result<usize, StorageError> {
        Ok(self.tree.len())
    }

    fn clear(&self) -> Result<(), StorageError> {
        self.tree
            .clear()
            .map_err(|e| StorageError::Backend(format!("Failed to clear tree: {}", e)))?;
        Ok(())
    }
}
