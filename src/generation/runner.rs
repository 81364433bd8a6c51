//! Drives one task through the generation state machine.

use crate::artifact::{FinalizedArtifact, SectionOutput};
use crate::cache::CacheHierarchy;
use crate::error::ServiceError;
use crate::generation::outcome::{QualityReport, TaskFailure, TaskOutcome};
use crate::generation::prompt::{self, GenerationParams, PrerequisiteExcerpt};
use crate::generation::retry::RetryPolicy;
use crate::generation::OrchestratorConfig;
use crate::generation::state::{
    FailureReason, GenerationState, IllegalTransition, RetryEvent, Stage, TransitionEvent,
};
use crate::provider::{CompletionRequest, ModelService};
use crate::schedule::TaskSpec;
use crate::types::short_hex;
use crate::validation::{ValidationIssue, ValidatorPipeline};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Consecutive re-introductions of cleared Critical kinds that end a task.
const LOOP_BREAK_STREAK: u32 = 2;

/// Stand-in deadline when the configured task timeout overflows `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationLimits {
    pub max_correction_attempts: u32,
    pub max_expansion_attempts: u32,
    pub retry: RetryPolicy,
    /// Bound on a single model call
    pub call_timeout: Duration,
    /// Bound on a task's wall-clock time across all stages
    pub task_timeout: Duration,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        OrchestratorConfig::default().limits()
    }
}

/// Services and limits shared by every task of a run.
pub struct GenerationContext {
    pub service: Arc<dyn ModelService>,
    pub cache: Arc<CacheHierarchy>,
    pub pipeline: Arc<ValidatorPipeline>,
    pub limits: GenerationLimits,
    pub params: GenerationParams,
}

impl GenerationContext {
    pub fn new(
        service: Arc<dyn ModelService>,
        cache: Arc<CacheHierarchy>,
        pipeline: Arc<ValidatorPipeline>,
    ) -> Self {
        Self {
            service,
            cache,
            pipeline,
            limits: GenerationLimits::default(),
            params: GenerationParams::default(),
        }
    }

    pub fn with_limits(mut self, limits: GenerationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

/// Why a stage stopped early.
enum Halt {
    Fail(FailureReason),
    Illegal(IllegalTransition),
}

impl From<IllegalTransition> for Halt {
    fn from(err: IllegalTransition) -> Self {
        Halt::Illegal(err)
    }
}

type Step = Result<(), Halt>;

pub struct TaskRunner {
    ctx: Arc<GenerationContext>,
    task: TaskSpec,
    prerequisites: Vec<PrerequisiteExcerpt>,
    cancel: CancellationToken,
    state: GenerationState,
    /// Non-blocking issues from whole-document validation
    document_issues: Vec<ValidationIssue>,
    started_at: DateTime<Utc>,
    started: Instant,
    deadline: Instant,
}

impl TaskRunner {
    pub fn new(
        ctx: Arc<GenerationContext>,
        task: TaskSpec,
        prerequisites: Vec<PrerequisiteExcerpt>,
        cancel: CancellationToken,
    ) -> Self {
        let started = Instant::now();
        let deadline = started
            .checked_add(ctx.limits.task_timeout)
            .unwrap_or_else(|| started + FAR_FUTURE);
        let state = GenerationState::new(task.id.clone(), task.resolved_sections());
        Self {
            ctx,
            task,
            prerequisites,
            cancel,
            state,
            document_issues: Vec::new(),
            started_at: Utc::now(),
            started,
            deadline,
        }
    }

    pub async fn run(mut self) -> TaskOutcome {
        info!(
            task_id = %self.task.id,
            sections = self.state.sections.len(),
            prerequisites = self.prerequisites.len(),
            "Task started"
        );

        while !self.state.stage().is_terminal() {
            let step = match self.check_boundary() {
                Err(halt) => Err(halt),
                Ok(()) => match self.state.stage() {
                    Stage::Drafting => self.draft().await,
                    Stage::Validating => self.validate(),
                    Stage::Correcting => self.correct().await,
                    Stage::Expanding => self.expand().await,
                    Stage::Assembling => self.assemble(),
                    Stage::Finalized | Stage::Failed => Ok(()),
                },
            };
            if let Err(halt) = step {
                let reason = match halt {
                    Halt::Fail(reason) => reason,
                    Halt::Illegal(err) => {
                        error!(task_id = %self.task.id, error = %err, "Generation state machine bug");
                        FailureReason::IllegalTransition
                    }
                };
                self.state.fail(reason);
            }
        }

        self.finish()
    }

    fn check_boundary(&self) -> Step {
        if self.cancel.is_cancelled() {
            return Err(Halt::Fail(FailureReason::Cancelled));
        }
        if Instant::now() >= self.deadline {
            return Err(Halt::Fail(FailureReason::TimedOut));
        }
        Ok(())
    }

    async fn draft(&mut self) -> Step {
        for index in 0..self.state.sections.len() {
            self.check_boundary()?;
            let request = prompt::draft_request(
                &self.task,
                &self.state.sections[index],
                &self.prerequisites,
                self.ctx.params,
            );
            let section_id = self.state.sections[index].id.clone();
            let text = self
                .complete_cached(Stage::Drafting, &section_id, &request)
                .await?;
            self.state.sections[index].text = text;
            self.state.attempts.drafts += 1;
        }
        self.state
            .advance(Stage::Validating, TransitionEvent::SectionsDrafted)?;
        Ok(())
    }

    fn validate(&mut self) -> Step {
        let report = self.ctx.pipeline.validate_sections(
            self.state
                .sections
                .iter()
                .map(|s| (s.id.as_str(), s.text.as_str())),
        );

        let after_correction = self
            .state
            .history()
            .last()
            .is_some_and(|record| record.from == Stage::Correcting);
        let critical = report.critical_kinds();
        if after_correction {
            let streak = self.state.observe_corrected_pass(critical);
            if streak >= LOOP_BREAK_STREAK {
                warn!(
                    task_id = %self.task.id,
                    streak,
                    "Correction re-introduced cleared critical issues"
                );
                self.state.issues = report.issues;
                return Err(Halt::Fail(FailureReason::CyclicCorrectionLoop));
            }
        } else {
            self.state.observe_pass(critical);
        }

        let blocking = report.blocking();
        debug!(
            task_id = %self.task.id,
            issues = report.len(),
            blocking,
            "Sections validated"
        );
        self.state.issues = report.issues;

        if blocking {
            if self.state.attempts.corrections >= self.ctx.limits.max_correction_attempts {
                return Err(Halt::Fail(FailureReason::CorrectionExhausted));
            }
            self.state
                .advance(Stage::Correcting, TransitionEvent::BlockingIssues)?;
        } else if self.state.undersized_sections().next().is_some() {
            self.state
                .advance(Stage::Expanding, TransitionEvent::Undersized)?;
        } else {
            self.state.advance(Stage::Assembling, TransitionEvent::Clean)?;
        }
        Ok(())
    }

    async fn correct(&mut self) -> Step {
        self.state.attempts.corrections += 1;
        let issues = self.state.issues.clone();
        let document_blocking: Vec<&ValidationIssue> = issues
            .iter()
            .filter(|i| i.severity.is_blocking() && i.section_id().is_none())
            .collect();

        for index in 0..self.state.sections.len() {
            self.check_boundary()?;
            let section_id = self.state.sections[index].id.clone();
            let section_issues: Vec<&ValidationIssue> = issues
                .iter()
                .filter(|i| i.section_id() == Some(section_id.as_str()))
                .collect();

            let fixed = self
                .ctx
                .pipeline
                .apply_fixes(&self.state.sections[index].text, section_issues.iter().copied());
            if fixed.applied > 0 {
                debug!(
                    task_id = %self.task.id,
                    section = %section_id,
                    fixes = fixed.applied,
                    "Applied auto-fixes"
                );
            }
            self.state.sections[index].text = fixed.text;

            let mut rewrite: Vec<&ValidationIssue> = section_issues
                .iter()
                .copied()
                .filter(|i| i.severity.is_blocking() && !i.auto_fixable)
                .collect();
            rewrite.extend(document_blocking.iter().copied());
            if rewrite.is_empty() {
                continue;
            }

            let request = prompt::correction_request(
                &self.task,
                &self.state.sections[index],
                &rewrite,
                self.ctx.params,
            );
            let text = self
                .complete_cached(Stage::Correcting, &section_id, &request)
                .await?;
            self.state.sections[index].text = text;
        }

        self.state
            .advance(Stage::Validating, TransitionEvent::CorrectionApplied)?;
        Ok(())
    }

    async fn expand(&mut self) -> Step {
        if self.state.attempts.expansions >= self.ctx.limits.max_expansion_attempts {
            return Err(Halt::Fail(FailureReason::ExpansionExhausted));
        }
        self.state.attempts.expansions += 1;

        let targets: Vec<usize> = self
            .state
            .sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.is_undersized())
            .map(|(index, _)| index)
            .collect();

        for index in targets {
            self.check_boundary()?;
            let section_id = self.state.sections[index].id.clone();
            let request =
                prompt::expansion_request(&self.task, &self.state.sections[index], self.ctx.params);
            let response = self
                .complete_cached(Stage::Expanding, &section_id, &request)
                .await?;
            let section = &mut self.state.sections[index];
            section.text = prompt::merge_expansion(&section.text, &response);
            debug!(
                task_id = %self.task.id,
                section = %section_id,
                words = section.word_count(),
                min_words = section.min_words,
                "Section expanded"
            );
        }

        self.state
            .advance(Stage::Validating, TransitionEvent::ExpansionApplied)?;
        Ok(())
    }

    fn assemble(&mut self) -> Step {
        let document = prompt::assemble(&self.task.title, &self.state.sections);
        let report = self.ctx.pipeline.validate_document(&document);

        if report.blocking() {
            debug!(
                task_id = %self.task.id,
                issues = report.len(),
                "Whole-document validation failed"
            );
            self.state.issues = report.issues;
            if self.state.attempts.corrections >= self.ctx.limits.max_correction_attempts {
                return Err(Halt::Fail(FailureReason::CorrectionExhausted));
            }
            self.state
                .advance(Stage::Correcting, TransitionEvent::HolisticFailure)?;
            return Ok(());
        }

        self.document_issues = report.issues;
        self.state.document = Some(document);
        self.state
            .advance(Stage::Finalized, TransitionEvent::Assembled)?;
        Ok(())
    }

    /// Cache first; on a miss, call the model and store the result.
    async fn complete_cached(
        &mut self,
        stage: Stage,
        section_id: &str,
        request: &CompletionRequest,
    ) -> Result<String, Halt> {
        let key = prompt::fingerprint(self.ctx.service.model_name(), request);
        match self.ctx.cache.lookup(&key) {
            Ok(Some(text)) => {
                self.state.cache_hits += 1;
                debug!(
                    task_id = %self.task.id,
                    section = %section_id,
                    stage = %stage,
                    fingerprint = %short_hex(&key),
                    "Cache hit"
                );
                return Ok(text);
            }
            Ok(None) => {}
            Err(err) => warn!(
                task_id = %self.task.id,
                fingerprint = %short_hex(&key),
                error = %err,
                "Cache lookup failed; treating as miss"
            ),
        }

        let text = self.call_with_retry(stage, section_id, request).await?;

        if self.cancel.is_cancelled() {
            return Err(Halt::Fail(FailureReason::Cancelled));
        }
        if let Err(err) = self.ctx.cache.insert(key, text.clone()) {
            warn!(
                task_id = %self.task.id,
                fingerprint = %short_hex(&key),
                error = %err,
                "Cache insert failed"
            );
        }
        Ok(text)
    }

    async fn call_with_retry(
        &mut self,
        stage: Stage,
        section_id: &str,
        request: &CompletionRequest,
    ) -> Result<String, Halt> {
        let policy = self.ctx.limits.retry;
        let mut retries = 0u32;
        loop {
            self.check_boundary()?;
            let remaining = self.deadline.saturating_duration_since(Instant::now());
            let wait = self.ctx.limits.call_timeout.min(remaining);

            self.state.model_calls += 1;
            let error = match tokio::time::timeout(wait, self.ctx.service.complete(request)).await
            {
                Ok(Ok(text)) if !text.trim().is_empty() => return Ok(text),
                Ok(Ok(_)) => ServiceError::Malformed("empty completion".to_string()),
                Ok(Err(err)) => err,
                Err(_) => ServiceError::Timeout(wait.as_millis()),
            };

            if Instant::now() >= self.deadline {
                return Err(Halt::Fail(FailureReason::TimedOut));
            }
            if !policy.allows_retry(retries) {
                warn!(
                    task_id = %self.task.id,
                    section = %section_id,
                    stage = %stage,
                    error = %error,
                    "Model call failed; retries exhausted"
                );
                return Err(Halt::Fail(FailureReason::GenerationExhausted));
            }

            retries += 1;
            self.state.attempts.retries += 1;
            let remaining = self.deadline.saturating_duration_since(Instant::now());
            let delay = policy.delay(retries).min(remaining);
            warn!(
                task_id = %self.task.id,
                section = %section_id,
                stage = %stage,
                attempt = retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Model call failed; retrying"
            );
            self.state.retry_events.push(RetryEvent {
                stage,
                section: section_id.to_string(),
                attempt: retries,
                error: error.to_string(),
                delay_ms: delay.as_millis() as u64,
            });

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancel.cancelled() => {
                    return Err(Halt::Fail(FailureReason::Cancelled));
                }
            }
        }
    }

    fn finish(self) -> TaskOutcome {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        let state = self.state;

        match (state.stage(), state.document.clone()) {
            (Stage::Finalized, Some(document)) => {
                let mut issues = state.issues.clone();
                issues.extend(self.document_issues);
                let quality = QualityReport::compute(&issues, &state.attempts);
                info!(
                    task_id = %self.task.id,
                    score = quality.score,
                    model_calls = state.model_calls,
                    cache_hits = state.cache_hits,
                    elapsed_ms,
                    "Task finalized"
                );
                let sections = state
                    .sections
                    .iter()
                    .map(|s| SectionOutput {
                        id: s.id.clone(),
                        text: s.text.clone(),
                        words: s.word_count(),
                    })
                    .collect();
                TaskOutcome::Finalized(FinalizedArtifact {
                    task_id: self.task.id,
                    title: self.task.title,
                    category: self.task.category,
                    document,
                    sections,
                    quality,
                    issues,
                    attempts: state.attempts,
                    history: state.history().to_vec(),
                    retry_events: state.retry_events,
                    model_calls: state.model_calls,
                    cache_hits: state.cache_hits,
                    started_at: self.started_at,
                    finished_at: Utc::now(),
                    elapsed_ms,
                })
            }
            _ => {
                let reason = state
                    .failure()
                    .unwrap_or(FailureReason::IllegalTransition);
                let stage = state
                    .history()
                    .last()
                    .map(|record| record.from)
                    .unwrap_or(Stage::Drafting);
                warn!(
                    task_id = %self.task.id,
                    reason = %reason,
                    stage = %stage,
                    elapsed_ms,
                    "Task failed"
                );
                TaskOutcome::Failed(TaskFailure {
                    task_id: self.task.id,
                    reason,
                    stage,
                    attempts: state.attempts,
                    issues: state.issues.clone(),
                    history: state.history().to_vec(),
                    retry_events: state.retry_events,
                    elapsed_ms,
                })
            }
        }
    }
}
