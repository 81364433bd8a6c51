//! Error types for the Folio generation pipeline.

use crate::types::{SectionId, TaskId};
use thiserror::Error;

/// Queue build errors. All of them are fatal to the build; no partial queue is produced.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum BuildError {
    #[error("Task '{task}' declares unknown prerequisite '{prerequisite}'")]
    UnknownPrerequisite { task: TaskId, prerequisite: TaskId },

    #[error("Cyclic dependency: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<TaskId> },

    #[error("Duplicate task id: {0}")]
    DuplicateTask(TaskId),

    #[error("Task id cannot be empty")]
    EmptyTaskId,

    #[error("Task '{task}' declares section '{section}' more than once")]
    DuplicateSection { task: TaskId, section: SectionId },

    #[error("Task '{task}' has a section with an empty id")]
    EmptySectionId { task: TaskId },

    #[error("Task '{task}' has invalid {field} {value} (must be within 0.0..=1.0)")]
    InvalidDifficulty {
        task: TaskId,
        field: &'static str,
        value: f64,
    },
}

/// Model service errors. The orchestrator treats every variant as retryable.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    #[error("Model service timed out after {0} ms")]
    Timeout(u128),

    #[error("Model service request failed: {0}")]
    Request(String),

    #[error("Model service returned malformed output: {0}")]
    Malformed(String),
}

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Failed to encode record: {0}")]
    Encode(String),

    #[error("Failed to decode record: {0}")]
    Decode(String),

    #[error("Invalid cache capacity for {tier}: must be greater than zero")]
    InvalidCapacity { tier: &'static str },

    #[error("Storage I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

/// Top-level errors surfaced by configuration, task pool loading and the CLI.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Queue build failed: {0}")]
    Build(#[from] BuildError),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Task pool error: {0}")]
    TaskPool(String),

    #[error("Generation run failed: {0}")]
    GenerationFailed(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        ApiError::ProviderError(err.to_string())
    }
}
