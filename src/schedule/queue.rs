//! Queue construction: Kahn's algorithm with a difficulty/affinity tie-break.
//!
//! Among the tasks whose prerequisites have all been emitted, the next task is the
//! one minimizing (difficulty band, affinity distance to the previous task, exact
//! difficulty, input order). Banding keeps near-equal difficulties from splitting
//! a run of same-category work.

use crate::error::BuildError;
use crate::schedule::difficulty::effective_difficulties;
use crate::schedule::graph::TaskGraph;
use crate::schedule::spec::TaskSpec;
use crate::types::TaskId;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, info};

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Width of a difficulty band; non-positive values order by exact difficulty only.
    #[serde(default = "default_difficulty_band")]
    pub difficulty_band: f64,
}

fn default_difficulty_band() -> f64 {
    0.1
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            difficulty_band: default_difficulty_band(),
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.difficulty_band.is_finite() {
            return Err(format!(
                "difficulty_band must be finite, got {}",
                self.difficulty_band
            ));
        }
        Ok(())
    }
}

/// One scheduled task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub spec: TaskSpec,
    /// Effective difficulty used for ordering.
    pub difficulty: f64,
}

/// Dependency-respecting, difficulty-ordered sequence of tasks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Queue {
    entries: Vec<QueueEntry>,
}

impl Queue {
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    pub fn ids(&self) -> Vec<TaskId> {
        self.entries.iter().map(|e| e.spec.id.clone()).collect()
    }

    pub fn position_of(&self, id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.spec.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<QueueEntry> {
        self.entries
    }
}

/// Builds a [`Queue`] from an unordered pool of task specs.
#[derive(Debug, Clone, Default)]
pub struct QueueBuilder {
    config: SchedulerConfig,
}

/// Build a queue with the default scheduler configuration.
pub fn build_queue(specs: &[TaskSpec]) -> Result<Queue, BuildError> {
    QueueBuilder::default().build(specs)
}

#[derive(Debug, Clone, Copy)]
struct SelectionKey {
    band: f64,
    affinity: u8,
    difficulty: f64,
    position: usize,
}

impl SelectionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.band
            .total_cmp(&other.band)
            .then(self.affinity.cmp(&other.affinity))
            .then(self.difficulty.total_cmp(&other.difficulty))
            .then(self.position.cmp(&other.position))
    }
}

impl QueueBuilder {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Build the queue. Fails without a partial result on unknown prerequisites or cycles.
    pub fn build(&self, specs: &[TaskSpec]) -> Result<Queue, BuildError> {
        let graph = TaskGraph::build(specs)?;
        let difficulties = effective_difficulties(&graph);

        let mut in_degree: Vec<usize> = (0..graph.len())
            .map(|node| graph.prerequisites_of(node).len())
            .collect();
        let mut ready: Vec<usize> = (0..graph.len()).filter(|&n| in_degree[n] == 0).collect();
        let mut order: Vec<usize> = Vec::with_capacity(graph.len());

        loop {
            let previous = order.last().copied();
            let Some((slot, _)) = ready
                .iter()
                .enumerate()
                .map(|(slot, &node)| (slot, self.key(&graph, &difficulties, previous, node)))
                .min_by(|(_, a), (_, b)| a.cmp(b))
            else {
                break;
            };
            let node = ready.swap_remove(slot);
            order.push(node);

            for &dependent in graph.dependents_of(node) {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.push(dependent);
                }
            }
        }

        // TaskGraph::build already rejected cycles, so every node was emitted.
        debug_assert_eq!(order.len(), graph.len());

        let entries: Vec<QueueEntry> = order
            .into_iter()
            .map(|node| QueueEntry {
                spec: graph.spec(node).clone(),
                difficulty: difficulties[node],
            })
            .collect();

        for (position, entry) in entries.iter().enumerate() {
            debug!(
                position,
                task_id = %entry.spec.id,
                category = %entry.spec.category,
                difficulty = entry.difficulty,
                "Queued task"
            );
        }
        info!(task_count = entries.len(), "Built generation queue");

        Ok(Queue { entries })
    }

    fn key(
        &self,
        graph: &TaskGraph,
        difficulties: &[f64],
        previous: Option<usize>,
        node: usize,
    ) -> SelectionKey {
        let difficulty = difficulties[node];
        let band = if self.config.difficulty_band > 0.0 && self.config.difficulty_band.is_finite()
        {
            (difficulty / self.config.difficulty_band + 1e-9).floor()
        } else {
            difficulty
        };
        SelectionKey {
            band,
            affinity: previous.map_or(0, |prev| affinity_distance(graph, prev, node)),
            difficulty,
            position: node,
        }
    }
}

/// 0 = same category, 1 = related through an edge or a shared prerequisite, 2 = unrelated.
fn affinity_distance(graph: &TaskGraph, previous: usize, candidate: usize) -> u8 {
    if graph.spec(previous).category == graph.spec(candidate).category {
        return 0;
    }
    let candidate_prereqs = graph.prerequisites_of(candidate);
    let related = candidate_prereqs.contains(&previous)
        || graph
            .prerequisites_of(previous)
            .iter()
            .any(|p| candidate_prereqs.contains(p));
    if related {
        1
    } else {
        2
    }
}
