//! CLI output: error mapping from domain errors to a stable CLI surface.

use crate::error::ApiError;

/// Map domain errors to a single line prefixed with a stable category.
pub fn map_error(e: &ApiError) -> String {
    let category = match e {
        ApiError::Build(_) => "build",
        ApiError::StorageError(_) => "storage",
        ApiError::ProviderError(_) | ApiError::ProviderNotConfigured(_) => "provider",
        ApiError::ConfigError(_) => "config",
        ApiError::TaskPool(_) => "tasks",
        ApiError::GenerationFailed(_) => "generation",
    };
    format!("error[{}]: {}", category, e)
}
