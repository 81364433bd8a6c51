//! Task outcomes, quality signal and run report.

use crate::artifact::FinalizedArtifact;
use crate::cache::CacheStats;
use crate::generation::state::{
    AttemptCounts, FailureReason, RetryEvent, Stage, TransitionRecord,
};
use crate::types::TaskId;
use crate::validation::{Severity, ValidationIssue};
use serde::{Deserialize, Serialize};

/// Confidence signal attached to every finalized artifact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub score: f64,
    pub warnings: usize,
    pub infos: usize,
    pub corrections: u32,
    pub expansions: u32,
}

impl QualityReport {
    pub fn compute(issues: &[ValidationIssue], attempts: &AttemptCounts) -> Self {
        let warnings = issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
            .count();
        let infos = issues.iter().filter(|i| i.severity == Severity::Info).count();
        let penalty = 0.05 * warnings as f64
            + 0.01 * infos as f64
            + 0.05 * attempts.corrections as f64
            + 0.03 * attempts.expansions as f64;
        Self {
            score: (1.0 - penalty).clamp(0.0, 1.0),
            warnings,
            infos,
            corrections: attempts.corrections,
            expansions: attempts.expansions,
        }
    }
}

/// Full record of a failed task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskFailure {
    pub task_id: TaskId,
    pub reason: FailureReason,
    /// Stage the task was in when it failed
    pub stage: Stage,
    pub attempts: AttemptCounts,
    pub issues: Vec<ValidationIssue>,
    pub history: Vec<TransitionRecord>,
    pub retry_events: Vec<RetryEvent>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
    Finalized(FinalizedArtifact),
    Failed(TaskFailure),
}

impl TaskOutcome {
    pub fn task_id(&self) -> &str {
        match self {
            TaskOutcome::Finalized(artifact) => &artifact.task_id,
            TaskOutcome::Failed(failure) => &failure.task_id,
        }
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self, TaskOutcome::Finalized(_))
    }

    pub fn artifact(&self) -> Option<&FinalizedArtifact> {
        match self {
            TaskOutcome::Finalized(artifact) => Some(artifact),
            TaskOutcome::Failed(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&TaskFailure> {
        match self {
            TaskOutcome::Finalized(_) => None,
            TaskOutcome::Failed(failure) => Some(failure),
        }
    }
}

/// Result of one orchestrator run, outcomes in queue order.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub outcomes: Vec<TaskOutcome>,
    pub cache: CacheStats,
    pub elapsed_ms: u64,
}

impl RunReport {
    pub fn finalized_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_finalized()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.finalized_count()
    }

    pub fn outcome(&self, task_id: &str) -> Option<&TaskOutcome> {
        self.outcomes.iter().find(|o| o.task_id() == task_id)
    }
}
