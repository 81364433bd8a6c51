//! CLI presentation: text and json formatters per command.

mod cache;
mod plan;
mod run;

pub use cache::format_cache_clear_result;
pub use plan::{format_plan_json, format_plan_text};
pub use run::{format_run_json, format_run_text};

use crate::error::{ApiError, StorageError};
use serde::Serialize;

fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::StorageError(StorageError::Encode(e.to_string())))
}
