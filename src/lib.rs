//! Folio: dependency-ordered, cached and validated document generation
//!
//! A pool of writing tasks is ordered into a queue that respects prerequisites
//! and ramps difficulty, then each task is driven through a bounded
//! draft/validate/correct/expand/assemble state machine against a model
//! service. Completions are memoized in a three-tier cache, and every
//! section passes a pluggable validator pipeline before it is finalized.

pub mod artifact;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod logging;
pub mod provider;
pub mod schedule;
pub mod store;
pub mod types;
pub mod validation;
