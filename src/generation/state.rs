//! Per-task generation state and its transition guard.
//!
//! Every task starts in `Drafting` and ends in `Finalized` or `Failed`.
//! Transitions go through [`GenerationState::advance`], which rejects
//! edges outside the table below and records the rest.
//!
//! ```text
//! Drafting    -> Validating
//! Validating  -> Assembling | Correcting | Expanding
//! Correcting  -> Validating
//! Expanding   -> Validating
//! Assembling  -> Finalized | Correcting
//! any non-terminal -> Failed
//! ```

use crate::schedule::SectionSpec;
use crate::types::{SectionId, TaskId};
use crate::validation::{IssueKind, ValidationIssue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Drafting,
    Validating,
    Correcting,
    Expanding,
    Assembling,
    Finalized,
    Failed,
}

impl Stage {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finalized | Self::Failed)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Drafting => "drafting",
            Self::Validating => "validating",
            Self::Correcting => "correcting",
            Self::Expanding => "expanding",
            Self::Assembling => "assembling",
            Self::Finalized => "finalized",
            Self::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

pub fn is_legal_transition(from: Stage, to: Stage) -> bool {
    use Stage::*;

    if to == Failed && !from.is_terminal() {
        return true;
    }

    matches!(
        (from, to),
        (Drafting, Validating)
            | (Validating, Assembling)
            | (Validating, Correcting)
            | (Validating, Expanding)
            | (Correcting, Validating)
            | (Expanding, Validating)
            // Whole-document rules can fail only after assembly.
            | (Assembling, Correcting)
            | (Assembling, Finalized)
    )
}

/// Why a stage was left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionEvent {
    SectionsDrafted,
    Clean,
    BlockingIssues,
    Undersized,
    CorrectionApplied,
    ExpansionApplied,
    HolisticFailure,
    Assembled,
    Failure(FailureReason),
}

/// Terminal failure cause. Exactly one per failed task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    GenerationExhausted,
    CorrectionExhausted,
    ExpansionExhausted,
    CyclicCorrectionLoop,
    Cancelled,
    TimedOut,
    /// The transition guard rejected an edge; indicates a runner bug.
    IllegalTransition,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GenerationExhausted => "generation retries exhausted",
            Self::CorrectionExhausted => "correction attempts exhausted",
            Self::ExpansionExhausted => "expansion attempts exhausted",
            Self::CyclicCorrectionLoop => "correction loop re-introduced cleared issues",
            Self::Cancelled => "cancelled",
            Self::TimedOut => "task timed out",
            Self::IllegalTransition => "illegal state transition",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: Stage,
    pub to: Stage,
    pub event: TransitionEvent,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct IllegalTransition {
    pub from: Stage,
    pub to: Stage,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Illegal stage transition: {} -> {}", self.from, self.to)
    }
}

impl std::error::Error for IllegalTransition {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptCounts {
    /// Sections drafted (cache hits included)
    pub drafts: u32,
    pub corrections: u32,
    pub expansions: u32,
    /// Model-call retries across all stages
    pub retries: u32,
}

/// One retried model-service call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryEvent {
    pub stage: Stage,
    pub section: SectionId,
    /// 1-based retry number for this call
    pub attempt: u32,
    pub error: String,
    pub delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionState {
    pub id: SectionId,
    pub brief: String,
    pub min_words: usize,
    pub text: String,
}

impl SectionState {
    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }

    /// Strictly below minimum; exactly at the minimum is fine.
    pub fn is_undersized(&self) -> bool {
        self.word_count() < self.min_words
    }
}

/// Mutable state of one in-flight task, owned by a single worker.
#[derive(Debug, Clone)]
pub struct GenerationState {
    pub task_id: TaskId,
    stage: Stage,
    /// Document order
    pub sections: Vec<SectionState>,
    pub attempts: AttemptCounts,
    /// Issues from the latest validation pass
    pub issues: Vec<ValidationIssue>,
    pub retry_events: Vec<RetryEvent>,
    pub model_calls: u32,
    pub cache_hits: u32,
    pub document: Option<String>,
    history: Vec<TransitionRecord>,
    loop_guard: LoopGuard,
    failure: Option<FailureReason>,
}

impl GenerationState {
    pub fn new(task_id: TaskId, sections: Vec<SectionSpec>) -> Self {
        let sections = sections
            .into_iter()
            .map(|s| SectionState {
                id: s.id,
                brief: s.brief,
                min_words: s.min_words.unwrap_or(0),
                text: String::new(),
            })
            .collect();
        Self {
            task_id,
            stage: Stage::Drafting,
            sections,
            attempts: AttemptCounts::default(),
            issues: Vec::new(),
            retry_events: Vec::new(),
            model_calls: 0,
            cache_hits: 0,
            document: None,
            history: Vec::new(),
            loop_guard: LoopGuard::default(),
            failure: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    pub fn failure(&self) -> Option<FailureReason> {
        self.failure
    }

    pub fn advance(&mut self, to: Stage, event: TransitionEvent) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.stage, to) {
            tracing::error!(
                task_id = %self.task_id,
                from = %self.stage,
                to = %to,
                "Rejected illegal stage transition"
            );
            return Err(IllegalTransition {
                from: self.stage,
                to,
            });
        }

        tracing::debug!(
            task_id = %self.task_id,
            from = %self.stage,
            to = %to,
            event = ?event,
            "Stage transition"
        );

        self.history.push(TransitionRecord {
            from: self.stage,
            to,
            event,
            at: Utc::now(),
        });
        self.stage = to;
        Ok(())
    }

    /// Move to `Failed` with `reason`. A no-op on terminal states.
    pub fn fail(&mut self, reason: FailureReason) {
        if self.stage.is_terminal() {
            return;
        }
        if self
            .advance(Stage::Failed, TransitionEvent::Failure(reason))
            .is_ok()
        {
            self.failure = Some(reason);
        }
    }

    pub fn undersized_sections(&self) -> impl Iterator<Item = &SectionState> {
        self.sections.iter().filter(|s| s.is_undersized())
    }

    /// Feed the Critical kinds of a pass that follows a correction.
    /// Returns the current re-introduction streak.
    pub fn observe_corrected_pass(&mut self, critical: BTreeSet<IssueKind>) -> u32 {
        self.loop_guard.observe(critical)
    }

    /// Feed the Critical kinds of a pass that did not follow a correction.
    pub fn observe_pass(&mut self, critical: BTreeSet<IssueKind>) {
        self.loop_guard.previous = critical;
    }

    pub fn cleared_kinds(&self) -> &BTreeSet<IssueKind> {
        &self.loop_guard.cleared
    }
}

/// Tracks Critical issue kinds across correction passes.
///
/// A kind present in one pass and absent in the next is cleared. A pass that
/// contains any cleared kind extends the streak; any other pass resets it.
#[derive(Debug, Clone, Default)]
struct LoopGuard {
    previous: BTreeSet<IssueKind>,
    cleared: BTreeSet<IssueKind>,
    streak: u32,
}

impl LoopGuard {
    fn observe(&mut self, current: BTreeSet<IssueKind>) -> u32 {
        let reintroduced = current.iter().any(|kind| self.cleared.contains(kind));
        for kind in self.previous.difference(&current) {
            self.cleared.insert(kind.clone());
        }
        self.streak = if reintroduced { self.streak + 1 } else { 0 };
        self.previous = current;
        self.streak
    }
}
