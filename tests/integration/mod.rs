//! Integration tests for Folio

mod config_loading;
mod orchestrator_flow;
mod scheduler_queue;
mod test_utils;
mod validation_pipeline;
