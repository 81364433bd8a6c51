//! Orchestrator: consumes a queue with a bounded pool of task workers.
//!
//! A task is dispatched only once every prerequisite has reached a terminal
//! state, so "A before B" holds for any worker count. With one worker the
//! queue is processed strictly in order. A failed task never stops the run.

use crate::artifact::ArtifactStore;
use crate::generation::outcome::{RunReport, TaskOutcome};
use crate::generation::prompt::PrerequisiteExcerpt;
use crate::generation::runner::{GenerationContext, TaskRunner};
use crate::generation::OrchestratorConfig;
use crate::schedule::{Queue, TaskSpec};
use crate::types::TaskId;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct Orchestrator {
    ctx: Arc<GenerationContext>,
    workers: usize,
    excerpt_chars: usize,
    artifacts: Option<ArtifactStore>,
}

impl Orchestrator {
    pub fn new(ctx: GenerationContext) -> Self {
        Self {
            ctx: Arc::new(ctx),
            workers: 1,
            excerpt_chars: OrchestratorConfig::default().prerequisite_excerpt_chars,
            artifacts: None,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_excerpt_chars(mut self, excerpt_chars: usize) -> Self {
        self.excerpt_chars = excerpt_chars;
        self
    }

    /// Persist every finalized artifact as it completes.
    pub fn with_artifact_store(mut self, artifacts: ArtifactStore) -> Self {
        self.artifacts = Some(artifacts);
        self
    }

    pub fn context(&self) -> &GenerationContext {
        &self.ctx
    }

    pub async fn run(&self, queue: &Queue, cancel: &CancellationToken) -> RunReport {
        let started = Instant::now();
        let entries = queue.entries();
        let queued: HashSet<&str> = entries.iter().map(|e| e.spec.id.as_str()).collect();

        let mut pending: VecDeque<usize> = (0..entries.len()).collect();
        let mut outcomes: Vec<Option<TaskOutcome>> = (0..entries.len()).map(|_| None).collect();
        // Terminal tasks; finalized ones keep their document for excerpts.
        let mut finished: HashMap<TaskId, Option<String>> = HashMap::new();
        let mut in_flight = FuturesUnordered::new();

        info!(
            task_count = entries.len(),
            workers = self.workers,
            "Generation run started"
        );

        loop {
            while in_flight.len() < self.workers {
                let ready = pending.iter().position(|&index| {
                    entries[index].spec.prerequisites.iter().all(|p| {
                        finished.contains_key(p) || !queued.contains(p.as_str())
                    })
                });
                let Some(index) = ready.and_then(|position| pending.remove(position)) else {
                    break;
                };

                let spec = entries[index].spec.clone();
                let excerpts = self.excerpts_for(&spec, &finished);
                let runner = TaskRunner::new(self.ctx.clone(), spec, excerpts, cancel.clone());
                in_flight.push(async move { (index, runner.run().await) });
            }

            let Some((index, outcome)) = in_flight.next().await else {
                break;
            };
            self.record(&outcome);
            finished.insert(
                outcome.task_id().to_string(),
                outcome.artifact().map(|a| a.document.clone()),
            );
            outcomes[index] = Some(outcome);
        }

        if !pending.is_empty() {
            error!(
                remaining = pending.len(),
                "Tasks left undispatched; queue is not topologically ordered"
            );
        }

        let report = RunReport {
            outcomes: outcomes.into_iter().flatten().collect(),
            cache: self.ctx.cache.stats(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            finalized = report.finalized_count(),
            failed = report.failed_count(),
            elapsed_ms = report.elapsed_ms,
            "Generation run finished"
        );
        report
    }

    fn excerpts_for(
        &self,
        spec: &TaskSpec,
        finished: &HashMap<TaskId, Option<String>>,
    ) -> Vec<PrerequisiteExcerpt> {
        let mut excerpts = Vec::new();
        for prerequisite in &spec.prerequisites {
            match finished.get(prerequisite) {
                Some(Some(document)) => excerpts.push(PrerequisiteExcerpt::new(
                    prerequisite.clone(),
                    document,
                    self.excerpt_chars,
                )),
                Some(None) => warn!(
                    task_id = %spec.id,
                    prerequisite = %prerequisite,
                    "Prerequisite failed; continuing without its excerpt"
                ),
                None => {}
            }
        }
        excerpts
    }

    fn record(&self, outcome: &TaskOutcome) {
        let Some(artifact) = outcome.artifact() else {
            return;
        };
        let Some(store) = &self.artifacts else {
            return;
        };
        if let Err(err) = store.put(artifact) {
            warn!(
                task_id = %artifact.task_id,
                error = %err,
                "Failed to persist artifact"
            );
        }
    }
}
