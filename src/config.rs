//! Configuration System
//!
//! Layered configuration on the `config` crate. Every section deserializes
//! with serde defaults, so an empty workspace yields a usable config apart
//! from the provider model, which `run` requires.

use crate::cache::CacheConfig;
use crate::generation::OrchestratorConfig;
use crate::logging::LoggingConfig;
use crate::schedule::SchedulerConfig;
use crate::validation::ValidationConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub use crate::provider::{ProviderConfig, ProviderType};

mod facade;
mod merge {
    pub mod merge_policy;
}
mod sources {
    pub mod global_file;
    pub mod workspace_file;
}

pub use facade::ConfigLoader;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FolioConfig {
    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Finalized artifact database, relative to the workspace root
    #[serde(default = "default_artifacts_path")]
    pub artifacts_path: PathBuf,
}

fn default_artifacts_path() -> PathBuf {
    PathBuf::from(".folio/artifacts")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            artifacts_path: default_artifacts_path(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.artifacts_path.as_os_str().is_empty() {
            return Err("Artifacts path cannot be empty".to_string());
        }
        Ok(())
    }

    pub fn artifacts_dir(&self, workspace_root: &Path) -> PathBuf {
        workspace_root.join(&self.artifacts_path)
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Provider(String),
    Cache(String),
    Orchestrator(String),
    Scheduler(String),
    Validation(String),
    Storage(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Provider(msg) => write!(f, "Provider: {}", msg),
            ValidationError::Cache(msg) => write!(f, "Cache: {}", msg),
            ValidationError::Orchestrator(msg) => write!(f, "Orchestrator: {}", msg),
            ValidationError::Scheduler(msg) => write!(f, "Scheduler: {}", msg),
            ValidationError::Validation(msg) => write!(f, "Validation: {}", msg),
            ValidationError::Storage(msg) => write!(f, "Storage: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl FolioConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = self.provider.validate() {
            errors.push(ValidationError::Provider(e));
        }
        if let Err(e) = self.cache.validate() {
            errors.push(ValidationError::Cache(e));
        }
        if let Err(e) = self.orchestrator.validate() {
            errors.push(ValidationError::Orchestrator(e));
        }
        if let Err(e) = self.scheduler.validate() {
            errors.push(ValidationError::Scheduler(e));
        }
        if let Err(e) = self.validation.validate() {
            errors.push(ValidationError::Validation(e));
        }
        if let Err(e) = self.storage.validate() {
            errors.push(ValidationError::Storage(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
