//! Task pool loading: TOML (`[[task]]` tables) or JSON (array of tasks).

use crate::error::ApiError;
use crate::schedule::spec::TaskSpec;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Unordered collection of task specs as handed over by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskPool {
    #[serde(default, rename = "task")]
    pub tasks: Vec<TaskSpec>,
}

impl TaskPool {
    pub fn new(tasks: Vec<TaskSpec>) -> Self {
        Self { tasks }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ApiError> {
        toml::from_str(raw).map_err(|e| ApiError::TaskPool(format!("Invalid TOML task pool: {}", e)))
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ApiError> {
        let tasks: Vec<TaskSpec> = serde_json::from_str(raw)
            .map_err(|e| ApiError::TaskPool(format!("Invalid JSON task pool: {}", e)))?;
        Ok(Self { tasks })
    }

    /// Load a pool from disk; `.json` files are parsed as JSON, everything else as TOML.
    pub fn from_path(path: &Path) -> Result<Self, ApiError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ApiError::TaskPool(format!("Failed to read task pool {}: {}", path.display(), e))
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&raw),
            _ => Self::from_toml_str(&raw),
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
