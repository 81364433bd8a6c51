//! Integration tests for the generation orchestrator
//!
//! Tests cover:
//! - Prerequisite ordering and excerpt passing
//! - Retry with backoff on slow model calls
//! - Correction, expansion and loop-breaker exhaustion
//! - Cancellation and task timeouts
//! - Cache reuse across runs

use super::test_utils::{
    context, document_of, fast_limits, is_correction, memory_cache, section_of, words,
    ScriptedService,
};
use folio::error::ServiceError;
use folio::generation::{
    FailureReason, GenerationContext, GenerationLimits, Orchestrator, Stage, TaskOutcome,
};
use folio::schedule::{build_queue, SectionSpec, TaskSpec};
use folio::validation::{
    IssueScope, Severity, ValidationConfig, ValidationIssue, Validator, ValidatorPipeline,
    ValidatorScope,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn failure(outcome: &TaskOutcome) -> &folio::generation::TaskFailure {
    outcome.failure().expect("task should have failed")
}

#[tokio::test]
async fn test_prerequisites_generate_first_and_feed_dependents() {
    let service = Arc::new(ScriptedService::constant("A clean paragraph of prose."));
    let queue = build_queue(&[
        TaskSpec::new("c", "guide").with_prerequisites(["b"]),
        TaskSpec::new("b", "guide").with_prerequisites(["a"]),
        TaskSpec::new("a", "guide"),
    ])
    .unwrap();

    let orchestrator = Orchestrator::new(context(service.clone(), memory_cache()));
    let report = orchestrator.run(&queue, &CancellationToken::new()).await;

    assert_eq!(report.finalized_count(), 3);
    let ids: Vec<&str> = report.outcomes.iter().map(|o| o.task_id()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);

    let calls = service.calls();
    let documents: Vec<&str> = calls.iter().map(document_of).collect();
    assert_eq!(documents, vec!["a", "b", "c"]);
    assert!(calls[1].prompt.contains("### a"));
    assert!(calls[2].prompt.contains("### b"));
    assert!(!calls[0].prompt.contains("Context from earlier documents"));
}

#[tokio::test]
async fn test_parallel_workers_respect_prerequisites() {
    let service = Arc::new(ScriptedService::constant("A clean paragraph of prose."));
    let queue = build_queue(&[
        TaskSpec::new("a", "guide"),
        TaskSpec::new("b", "guide").with_prerequisites(["a"]),
        TaskSpec::new("x", "reference"),
        TaskSpec::new("y", "reference"),
    ])
    .unwrap();

    let orchestrator = Orchestrator::new(context(service.clone(), memory_cache())).with_workers(3);
    let report = orchestrator.run(&queue, &CancellationToken::new()).await;

    assert_eq!(report.finalized_count(), 4);
    let documents: Vec<String> = service
        .calls()
        .iter()
        .map(|c| document_of(c).to_string())
        .collect();
    let a = documents.iter().position(|d| d == "a").unwrap();
    let b = documents.iter().position(|d| d == "b").unwrap();
    assert!(a < b);
    let ids: Vec<&str> = report.outcomes.iter().map(|o| o.task_id()).collect();
    assert_eq!(ids, queue.ids());
}

#[tokio::test]
async fn test_timed_out_calls_are_retried_with_backoff() {
    let service = Arc::new(
        ScriptedService::constant("Recovered text after slow calls.").with_delays(vec![
            Duration::from_millis(500),
            Duration::from_millis(500),
        ]),
    );
    let limits = GenerationLimits {
        call_timeout: Duration::from_millis(30),
        ..fast_limits()
    };
    let ctx = context(service.clone(), memory_cache()).with_limits(limits);
    let queue = build_queue(&[TaskSpec::new("slow", "guide")]).unwrap();

    let report = Orchestrator::new(ctx)
        .run(&queue, &CancellationToken::new())
        .await;

    let artifact = report.outcomes[0].artifact().expect("finalized");
    assert_eq!(artifact.retry_events.len(), 2);
    assert_eq!(artifact.attempts.retries, 2);
    assert_eq!(artifact.model_calls, 3);
    assert_eq!(artifact.retry_events[0].attempt, 1);
    assert_eq!(artifact.retry_events[1].attempt, 2);
    assert_eq!(artifact.retry_events[0].stage, Stage::Drafting);
    assert!(artifact.retry_events[0].error.contains("timed out"));
    assert_eq!(service.call_count(), 3);
}

#[tokio::test]
async fn test_persistent_errors_exhaust_generation_retries() {
    let service = Arc::new(ScriptedService::new(|_, _| {
        Err(ServiceError::Request("connection refused".to_string()))
    }));
    let queue = build_queue(&[TaskSpec::new("down", "guide")]).unwrap();

    let report = Orchestrator::new(context(service.clone(), memory_cache()))
        .run(&queue, &CancellationToken::new())
        .await;

    let failed = failure(&report.outcomes[0]);
    assert_eq!(failed.reason, FailureReason::GenerationExhausted);
    assert_eq!(failed.stage, Stage::Drafting);
    assert_eq!(failed.retry_events.len(), 3);
    assert_eq!(service.call_count(), 4);
}

#[tokio::test]
async fn test_exact_minimum_length_finalizes_without_expansion() {
    let service = Arc::new(ScriptedService::constant(&words(5)));
    let task = TaskSpec::new("exact", "guide")
        .with_section(SectionSpec::new("body", "Five words").with_min_words(5));
    let queue = build_queue(&[task]).unwrap();

    let report = Orchestrator::new(context(service.clone(), memory_cache()))
        .run(&queue, &CancellationToken::new())
        .await;

    let artifact = report.outcomes[0].artifact().expect("finalized");
    assert_eq!(artifact.attempts.expansions, 0);
    assert_eq!(artifact.attempts.corrections, 0);
    assert_eq!(artifact.sections[0].words, 5);
    let stages: Vec<Stage> = artifact.history.iter().map(|r| r.to).collect();
    assert_eq!(
        stages,
        vec![Stage::Validating, Stage::Assembling, Stage::Finalized]
    );
    assert_eq!(service.call_count(), 1);
}

#[tokio::test]
async fn test_undersized_section_is_expanded() {
    let service = Arc::new(ScriptedService::new(|request, _| {
        if request.prompt.contains("needs at least") {
            Ok("more detail here and there too".to_string())
        } else {
            Ok(words(4))
        }
    }));
    let task = TaskSpec::new("grow", "guide")
        .with_section(SectionSpec::new("body", "Ten words").with_min_words(10));
    let queue = build_queue(&[task]).unwrap();

    let report = Orchestrator::new(context(service, memory_cache()))
        .run(&queue, &CancellationToken::new())
        .await;

    let artifact = report.outcomes[0].artifact().expect("finalized");
    assert_eq!(artifact.attempts.expansions, 1);
    assert_eq!(artifact.sections[0].words, 10);
}

#[tokio::test]
async fn test_persistent_critical_issue_exhausts_corrections() {
    let service = Arc::new(ScriptedService::constant("TODO finish this section"));
    let queue = build_queue(&[TaskSpec::new("stuck", "guide")]).unwrap();

    let report = Orchestrator::new(context(service, memory_cache()))
        .run(&queue, &CancellationToken::new())
        .await;

    let failed = failure(&report.outcomes[0]);
    assert_eq!(failed.reason, FailureReason::CorrectionExhausted);
    assert_eq!(failed.stage, Stage::Validating);
    assert_eq!(failed.attempts.corrections, 3);
    assert!(failed
        .issues
        .iter()
        .any(|i| i.code == "placeholder" && i.severity == Severity::Critical));
}

#[tokio::test]
async fn test_auto_fixable_critical_issue_is_fixed_locally() {
    let service = Arc::new(ScriptedService::constant("As an AI, I think the answer is clear."));
    let config = ValidationConfig {
        forbidden_phrases: vec!["as an AI".to_string()],
        ..ValidationConfig::default()
    };
    let pipeline = Arc::new(ValidatorPipeline::from_config(&config).unwrap());
    let ctx = GenerationContext::new(service.clone(), memory_cache(), pipeline)
        .with_limits(fast_limits());
    let queue = build_queue(&[TaskSpec::new("phrase", "guide")]).unwrap();

    let report = Orchestrator::new(ctx)
        .run(&queue, &CancellationToken::new())
        .await;

    let artifact = report.outcomes[0].artifact().expect("finalized");
    assert_eq!(artifact.attempts.corrections, 1);
    assert!(!artifact.document.to_lowercase().contains("as an ai"));
    assert!(artifact.document.contains("I think the answer is clear."));
    assert_eq!(service.call_count(), 1);
}

#[tokio::test]
async fn test_warnings_finalize_without_correction() {
    let service = Arc::new(ScriptedService::constant("Fine text with trailing space   \nNext line"));
    let queue = build_queue(&[TaskSpec::new("tidy", "guide")]).unwrap();

    let report = Orchestrator::new(context(service.clone(), memory_cache()))
        .run(&queue, &CancellationToken::new())
        .await;

    // Trailing whitespace is a warning: the task finalizes with it recorded.
    let artifact = report.outcomes[0].artifact().expect("finalized");
    assert_eq!(artifact.attempts.corrections, 0);
    assert!(artifact.issues.iter().any(|i| i.code == "trailing_whitespace"));
    assert!(artifact.quality.score < 1.0);
    assert!(!service.calls().iter().any(is_correction));
}

/// Flags the markers ALPHA and BETA as distinct critical kinds.
struct MarkerValidator;

impl Validator for MarkerValidator {
    fn name(&self) -> &str {
        "marker"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn scope(&self) -> ValidatorScope {
        ValidatorScope::Section
    }

    fn validate(&self, text: &str, scope: &IssueScope) -> Vec<ValidationIssue> {
        ["ALPHA", "BETA"]
            .iter()
            .filter(|marker| text.contains(*marker))
            .map(|marker| {
                ValidationIssue::new(
                    "marker",
                    &marker.to_lowercase(),
                    Severity::Critical,
                    format!("contains {}", marker),
                )
                .at(scope, None)
            })
            .collect()
    }
}

#[tokio::test]
async fn test_reintroduced_critical_issues_trip_the_loop_breaker() {
    // Draft has ALPHA; each correction swaps to the other marker.
    let service = Arc::new(ScriptedService::new(|request, _| {
        if !is_correction(request) {
            return Ok("ALPHA text".to_string());
        }
        if request.prompt.contains("Current text:\nALPHA") {
            Ok("BETA text".to_string())
        } else {
            Ok("ALPHA text".to_string())
        }
    }));
    let pipeline = Arc::new(ValidatorPipeline::new().with_validator(MarkerValidator));
    let ctx = GenerationContext::new(service, memory_cache(), pipeline).with_limits(
        GenerationLimits {
            max_correction_attempts: 10,
            ..fast_limits()
        },
    );
    let queue = build_queue(&[TaskSpec::new("flip", "guide")]).unwrap();

    let report = Orchestrator::new(ctx)
        .run(&queue, &CancellationToken::new())
        .await;

    let failed = failure(&report.outcomes[0]);
    assert_eq!(failed.reason, FailureReason::CyclicCorrectionLoop);
    assert_eq!(failed.attempts.corrections, 3);
}

#[tokio::test]
async fn test_expansion_budget_is_bounded() {
    let service = Arc::new(ScriptedService::constant("still too short"));
    let task = TaskSpec::new("short", "guide")
        .with_section(SectionSpec::new("body", "Long").with_min_words(50));
    let queue = build_queue(&[task]).unwrap();

    let report = Orchestrator::new(context(service, memory_cache()))
        .run(&queue, &CancellationToken::new())
        .await;

    let failed = failure(&report.outcomes[0]);
    assert_eq!(failed.reason, FailureReason::ExpansionExhausted);
    assert_eq!(failed.stage, Stage::Expanding);
    assert_eq!(failed.attempts.expansions, 2);
}

#[tokio::test]
async fn test_cancellation_during_call_writes_nothing_to_cache() {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let service = Arc::new(ScriptedService::new(move |_, _| {
        token.cancel();
        Ok("Text that arrives after cancellation.".to_string())
    }));
    let cache = memory_cache();
    let queue = build_queue(&[TaskSpec::new("a", "guide"), TaskSpec::new("b", "guide")]).unwrap();

    let report = Orchestrator::new(context(service.clone(), cache.clone()))
        .run(&queue, &cancel)
        .await;

    assert_eq!(report.failed_count(), 2);
    for outcome in &report.outcomes {
        assert_eq!(failure(outcome).reason, FailureReason::Cancelled);
    }
    assert_eq!(service.call_count(), 1);
    assert_eq!(cache.stats().inserts, 0);
    let sizes = cache.sizes().unwrap();
    assert_eq!(sizes.l1 + sizes.l2 + sizes.l3, 0);
}

#[tokio::test]
async fn test_zero_task_timeout_fails_before_any_call() {
    let service = Arc::new(ScriptedService::constant("never requested"));
    let ctx = context(service.clone(), memory_cache()).with_limits(GenerationLimits {
        task_timeout: Duration::ZERO,
        ..fast_limits()
    });
    let queue = build_queue(&[TaskSpec::new("late", "guide")]).unwrap();

    let report = Orchestrator::new(ctx)
        .run(&queue, &CancellationToken::new())
        .await;

    let failed = failure(&report.outcomes[0]);
    assert_eq!(failed.reason, FailureReason::TimedOut);
    assert_eq!(failed.stage, Stage::Drafting);
    assert_eq!(service.call_count(), 0);
}

#[tokio::test]
async fn test_second_run_is_served_from_cache() {
    let cache = memory_cache();
    let queue = build_queue(&[TaskSpec::new("cached", "guide")]).unwrap();

    let first = Arc::new(ScriptedService::constant("Memoized paragraph."));
    Orchestrator::new(context(first.clone(), cache.clone()))
        .run(&queue, &CancellationToken::new())
        .await;
    assert_eq!(first.call_count(), 1);

    let second = Arc::new(ScriptedService::constant("A different answer."));
    let report = Orchestrator::new(context(second.clone(), cache))
        .run(&queue, &CancellationToken::new())
        .await;

    assert_eq!(second.call_count(), 0);
    let artifact = report.outcomes[0].artifact().expect("finalized");
    assert_eq!(artifact.cache_hits, 1);
    assert_eq!(artifact.model_calls, 0);
    assert!(artifact.document.contains("Memoized paragraph."));
}

#[tokio::test]
async fn test_failed_prerequisite_does_not_block_dependents() {
    let service = Arc::new(ScriptedService::new(|request, _| {
        if document_of(request) == "a" {
            Err(ServiceError::Request("boom".to_string()))
        } else {
            Ok(format!("Text for {}.", section_of(request)))
        }
    }));
    let queue = build_queue(&[
        TaskSpec::new("a", "guide"),
        TaskSpec::new("b", "guide").with_prerequisites(["a"]),
    ])
    .unwrap();

    let report = Orchestrator::new(context(service.clone(), memory_cache()))
        .run(&queue, &CancellationToken::new())
        .await;

    assert_eq!(
        failure(report.outcome("a").unwrap()).reason,
        FailureReason::GenerationExhausted
    );
    let artifact = report.outcome("b").unwrap().artifact().expect("finalized");
    assert!(artifact.document.contains("Text for body."));
    let b_request = service
        .calls()
        .into_iter()
        .find(|c| document_of(c) == "b")
        .unwrap();
    assert!(!b_request.prompt.contains("Context from earlier documents"));
}
