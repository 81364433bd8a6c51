//! Finalized artifacts and their persistence.

use crate::error::StorageError;
use crate::generation::outcome::QualityReport;
use crate::generation::state::{AttemptCounts, RetryEvent, TransitionRecord};
use crate::store::PersistentStore;
use crate::types::{SectionId, TaskId};
use crate::validation::ValidationIssue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionOutput {
    pub id: SectionId,
    pub text: String,
    pub words: usize,
}

/// Assembled document plus the metadata of how it was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizedArtifact {
    pub task_id: TaskId,
    pub title: String,
    pub category: String,
    pub document: String,
    pub sections: Vec<SectionOutput>,
    pub quality: QualityReport,
    /// Non-blocking issues left in the final pass
    pub issues: Vec<ValidationIssue>,
    pub attempts: AttemptCounts,
    pub history: Vec<TransitionRecord>,
    pub retry_events: Vec<RetryEvent>,
    pub model_calls: u32,
    pub cache_hits: u32,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// JSON artifact records keyed by task id.
#[derive(Clone)]
pub struct ArtifactStore {
    store: Arc<dyn PersistentStore>,
}

impl ArtifactStore {
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self { store }
    }

    pub fn put(&self, artifact: &FinalizedArtifact) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(artifact)
            .map_err(|e| StorageError::Encode(format!("Failed to serialize artifact: {}", e)))?;
        self.store.put(artifact.task_id.as_bytes(), &bytes)
    }

    pub fn get(&self, task_id: &str) -> Result<Option<FinalizedArtifact>, StorageError> {
        match self.store.get(task_id.as_bytes())? {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                StorageError::Decode(format!("Failed to deserialize artifact: {}", e))
            }),
            None => Ok(None),
        }
    }

    pub fn delete(&self, task_id: &str) -> Result<(), StorageError> {
        self.store.delete(task_id.as_bytes())
    }

    pub fn len(&self) -> Result<usize, StorageError> {
        self.store.len()
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        self.store.is_empty()
    }
}
