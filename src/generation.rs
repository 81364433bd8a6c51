//! Generation orchestrator: a bounded state machine per task, driven over
//! the scheduled queue by a small worker pool.

pub mod orchestrator;
pub mod outcome;
pub mod prompt;
pub mod retry;
pub mod runner;
pub mod state;

pub use orchestrator::Orchestrator;
pub use outcome::{QualityReport, RunReport, TaskFailure, TaskOutcome};
pub use prompt::{GenerationParams, PrerequisiteExcerpt};
pub use retry::RetryPolicy;
pub use runner::{GenerationContext, GenerationLimits, TaskRunner};
pub use state::{
    is_legal_transition, AttemptCounts, FailureReason, GenerationState, RetryEvent, Stage,
    TransitionEvent, TransitionRecord,
};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Orchestrator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_max_correction_attempts")]
    pub max_correction_attempts: u32,

    #[serde(default = "default_max_expansion_attempts")]
    pub max_expansion_attempts: u32,

    /// Retries per model call after the first attempt
    #[serde(default = "default_max_generation_retries")]
    pub max_generation_retries: u32,

    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,

    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    #[serde(default = "default_task_timeout_secs")]
    pub task_timeout_secs: u64,

    /// Characters of each finalized prerequisite passed to dependents
    #[serde(default = "default_prerequisite_excerpt_chars")]
    pub prerequisite_excerpt_chars: usize,
}

fn default_workers() -> usize {
    1
}

fn default_max_correction_attempts() -> u32 {
    3
}

fn default_max_expansion_attempts() -> u32 {
    2
}

fn default_max_generation_retries() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_backoff_max_ms() -> u64 {
    8000
}

fn default_call_timeout_secs() -> u64 {
    120
}

fn default_task_timeout_secs() -> u64 {
    1800
}

fn default_prerequisite_excerpt_chars() -> usize {
    1200
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_correction_attempts: default_max_correction_attempts(),
            max_expansion_attempts: default_max_expansion_attempts(),
            max_generation_retries: default_max_generation_retries(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            call_timeout_secs: default_call_timeout_secs(),
            task_timeout_secs: default_task_timeout_secs(),
            prerequisite_excerpt_chars: default_prerequisite_excerpt_chars(),
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("workers must be at least 1".to_string());
        }
        if self.backoff_base_ms > self.backoff_max_ms {
            return Err(format!(
                "backoff_base_ms ({}) exceeds backoff_max_ms ({})",
                self.backoff_base_ms, self.backoff_max_ms
            ));
        }
        if self.call_timeout_secs == 0 {
            return Err("call_timeout_secs must be greater than zero".to_string());
        }
        Ok(())
    }

    pub fn limits(&self) -> GenerationLimits {
        GenerationLimits {
            max_correction_attempts: self.max_correction_attempts,
            max_expansion_attempts: self.max_expansion_attempts,
            retry: RetryPolicy::new(
                self.max_generation_retries,
                Duration::from_millis(self.backoff_base_ms),
                Duration::from_millis(self.backoff_max_ms),
            ),
            call_timeout: Duration::from_secs(self.call_timeout_secs),
            task_timeout: Duration::from_secs(self.task_timeout_secs),
        }
    }
}
