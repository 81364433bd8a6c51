//! Effective difficulty for queue ordering.
//!
//! Explicit difficulties are taken as-is. Derived difficulty never drops below the
//! hardest prerequisite, so "easy first" never conflicts with "prerequisites first":
//!
//! ```text
//! own    = complexity, or target_words / (target_words + 2000)
//! spread = min(prerequisite_count, 5) / 5
//! base   = max effective difficulty of prerequisites (0 without any)
//! d      = base + (1 - base) * (0.8 * own + 0.2 * spread)
//! ```

use crate::schedule::graph::TaskGraph;
use crate::schedule::spec::TaskSpec;

const SIZE_HALF_POINT_WORDS: f64 = 2000.0;
const OWN_WEIGHT: f64 = 0.8;
const SPREAD_WEIGHT: f64 = 0.2;
const SPREAD_SATURATION: usize = 5;

/// The task's own declared complexity, falling back to its estimated size.
pub fn own_complexity(spec: &TaskSpec) -> f64 {
    match spec.complexity {
        Some(complexity) => complexity,
        None => {
            let words = spec.target_words as f64;
            words / (words + SIZE_HALF_POINT_WORDS)
        }
    }
}

/// Derive a difficulty from a task's own complexity and its prerequisites' difficulties.
pub fn derive(own: f64, prerequisite_difficulties: &[f64]) -> f64 {
    let base = prerequisite_difficulties
        .iter()
        .copied()
        .fold(0.0_f64, f64::max)
        .clamp(0.0, 1.0);
    let spread = prerequisite_difficulties.len().min(SPREAD_SATURATION) as f64
        / SPREAD_SATURATION as f64;
    let share = (OWN_WEIGHT * own.clamp(0.0, 1.0) + SPREAD_WEIGHT * spread).clamp(0.0, 1.0);
    (base + (1.0 - base) * share).clamp(base, 1.0)
}

/// Effective difficulty for every node, indexed like the graph arena.
pub fn effective_difficulties(graph: &TaskGraph) -> Vec<f64> {
    let mut difficulties = vec![0.0; graph.len()];
    for node in graph.topological_indices() {
        let spec = graph.spec(node);
        difficulties[node] = match spec.difficulty {
            Some(explicit) => explicit,
            None => {
                let prerequisites: Vec<f64> = graph
                    .prerequisites_of(node)
                    .iter()
                    .map(|&p| difficulties[p])
                    .collect();
                derive(own_complexity(spec), &prerequisites)
            }
        };
    }
    difficulties
}
