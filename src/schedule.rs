//! Task scheduling: task specs, dependency graph, difficulty and queue construction.
//! The builder is one-shot; it runs to completion before any generation starts.

pub mod difficulty;
pub mod graph;
pub mod pool;
pub mod queue;
pub mod spec;

pub use graph::TaskGraph;
pub use pool::TaskPool;
pub use queue::{build_queue, Queue, QueueBuilder, QueueEntry, SchedulerConfig};
pub use spec::{SectionSpec, TaskSpec};
