//! Task dependency graph.
//!
//! Nodes live in an arena indexed by position in the input; edges are adjacency
//! lists of indices. An edge A -> B means A must be generated before B.

use crate::error::BuildError;
use crate::schedule::spec::TaskSpec;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// Acyclic dependency graph over a task pool.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    nodes: Vec<TaskSpec>,
    index: HashMap<String, usize>,
    /// prerequisites[b] = indices of tasks that must precede b, in input order
    prerequisites: Vec<Vec<usize>>,
    /// dependents[a] = indices of tasks that wait on a, in input order
    dependents: Vec<Vec<usize>>,
}

impl TaskGraph {
    /// Build the graph, rejecting duplicate ids, dangling prerequisites and cycles.
    pub fn build(specs: &[TaskSpec]) -> Result<Self, BuildError> {
        let mut index = HashMap::with_capacity(specs.len());
        for (position, spec) in specs.iter().enumerate() {
            spec.check_fields()?;
            if index.insert(spec.id.clone(), position).is_some() {
                return Err(BuildError::DuplicateTask(spec.id.clone()));
            }
        }

        let mut prerequisites = vec![Vec::new(); specs.len()];
        let mut dependents = vec![Vec::new(); specs.len()];
        for (position, spec) in specs.iter().enumerate() {
            for prerequisite in &spec.prerequisites {
                let Some(&source) = index.get(prerequisite) else {
                    return Err(BuildError::UnknownPrerequisite {
                        task: spec.id.clone(),
                        prerequisite: prerequisite.clone(),
                    });
                };
                // repeated prerequisite ids collapse into one edge
                if !prerequisites[position].contains(&source) {
                    prerequisites[position].push(source);
                    dependents[source].push(position);
                }
            }
        }
        for list in prerequisites.iter_mut().chain(dependents.iter_mut()) {
            list.sort_unstable();
        }

        let graph = Self {
            nodes: specs.to_vec(),
            index,
            prerequisites,
            dependents,
        };
        if let Some(cycle) = graph.find_cycle() {
            return Err(BuildError::CyclicDependency { cycle });
        }
        Ok(graph)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn spec(&self, node: usize) -> &TaskSpec {
        &self.nodes[node]
    }

    pub fn specs(&self) -> &[TaskSpec] {
        &self.nodes
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn prerequisites_of(&self, node: usize) -> &[usize] {
        &self.prerequisites[node]
    }

    pub fn dependents_of(&self, node: usize) -> &[usize] {
        &self.dependents[node]
    }

    /// Node indices in a topological order (prerequisites first), stable by input order.
    pub fn topological_indices(&self) -> Vec<usize> {
        let mut in_degree: Vec<usize> = self.prerequisites.iter().map(Vec::len).collect();
        let mut ready: std::collections::BTreeSet<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, degree)| **degree == 0)
            .map(|(node, _)| node)
            .collect();
        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(node) = ready.pop_first() {
            order.push(node);
            for &dependent in &self.dependents[node] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    ready.insert(dependent);
                }
            }
        }
        order
    }

    /// White/gray/black depth-first search over prerequisite edges.
    /// Returns the ids along the first cycle found, closed by repeating the first id.
    fn find_cycle(&self) -> Option<Vec<String>> {
        let mut color = vec![Color::White; self.nodes.len()];
        // explicit stack of (node, next edge to visit) keeps deep chains off the call stack
        let mut stack: Vec<(usize, usize)> = Vec::new();

        for root in 0..self.nodes.len() {
            if color[root] != Color::White {
                continue;
            }
            color[root] = Color::Gray;
            stack.push((root, 0));

            while let Some(frame) = stack.last_mut() {
                let (node, next_edge) = *frame;
                if next_edge < self.dependents[node].len() {
                    frame.1 += 1;
                    let target = self.dependents[node][next_edge];
                    match color[target] {
                        Color::White => {
                            color[target] = Color::Gray;
                            stack.push((target, 0));
                        }
                        Color::Gray => {
                            let start = stack
                                .iter()
                                .position(|(on_path, _)| *on_path == target)
                                .unwrap_or(0);
                            let mut cycle: Vec<String> = stack[start..]
                                .iter()
                                .map(|(on_path, _)| self.nodes[*on_path].id.clone())
                                .collect();
                            cycle.push(self.nodes[target].id.clone());
                            return Some(cycle);
                        }
                        Color::Black => {}
                    }
                } else {
                    color[node] = Color::Black;
                    stack.pop();
                }
            }
        }
        None
    }
}
