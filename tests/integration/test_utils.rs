//! Shared test utilities for integration tests
//!
//! A scripted model service, context builders and environment isolation for
//! configuration tests.

use async_trait::async_trait;
use folio::cache::CacheHierarchy;
use folio::error::ServiceError;
use folio::generation::{GenerationContext, GenerationLimits, RetryPolicy};
use folio::provider::{CompletionRequest, ModelService};
use folio::store::MemoryStore;
use folio::validation::{ValidationConfig, ValidatorPipeline};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

type Responder = dyn Fn(&CompletionRequest, usize) -> Result<String, ServiceError> + Send + Sync;

/// Model service that answers from a closure and records every request.
///
/// The closure receives the request and the zero-based call number. Delays
/// queued with [`ScriptedService::with_delays`] are slept before the first
/// calls, one per call.
pub struct ScriptedService {
    responder: Box<Responder>,
    delays: Mutex<VecDeque<Duration>>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedService {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest, usize) -> Result<String, ServiceError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delays: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `text`.
    pub fn constant(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_, _| Ok(text.clone()))
    }

    pub fn with_delays(self, delays: Vec<Duration>) -> Self {
        *self.delays.lock() = delays.into();
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<CompletionRequest> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ModelService for ScriptedService {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ServiceError> {
        let call = {
            let mut calls = self.calls.lock();
            calls.push(request.clone());
            calls.len() - 1
        };
        let delay = self.delays.lock().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        (self.responder)(request, call)
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Section named in a request prompt (`Section: <id>` line).
pub fn section_of(request: &CompletionRequest) -> &str {
    request
        .prompt
        .lines()
        .find_map(|line| line.strip_prefix("Section: "))
        .unwrap_or("")
}

/// Document title named in a request prompt (`Document: <title>` line).
pub fn document_of(request: &CompletionRequest) -> &str {
    request
        .prompt
        .lines()
        .find_map(|line| line.strip_prefix("Document: "))
        .unwrap_or("")
}

pub fn is_correction(request: &CompletionRequest) -> bool {
    request.prompt.contains("Problems to fix:")
}

/// Limits with millisecond backoff so retry paths run fast.
pub fn fast_limits() -> GenerationLimits {
    GenerationLimits {
        retry: RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(4)),
        call_timeout: Duration::from_secs(5),
        task_timeout: Duration::from_secs(30),
        ..GenerationLimits::default()
    }
}

pub fn memory_cache() -> Arc<CacheHierarchy> {
    Arc::new(CacheHierarchy::with_capacities(8, 16, Arc::new(MemoryStore::new())).unwrap())
}

pub fn default_pipeline() -> Arc<ValidatorPipeline> {
    Arc::new(ValidatorPipeline::from_config(&ValidationConfig::default()).unwrap())
}

pub fn context(service: Arc<ScriptedService>, cache: Arc<CacheHierarchy>) -> GenerationContext {
    GenerationContext::new(service, cache, default_pipeline()).with_limits(fast_limits())
}

/// Words of filler text, `count` long.
pub fn words(count: usize) -> String {
    vec!["word"; count].join(" ")
}

static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Run `f` with the given environment variables set, restoring them afterwards.
/// Serialized across tests because the environment is process-wide.
pub fn with_env<T>(vars: &[(&str, Option<&str>)], f: impl FnOnce() -> T) -> T {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let saved: Vec<(String, Option<String>)> = vars
        .iter()
        .map(|(key, _)| (key.to_string(), std::env::var(key).ok()))
        .collect();
    for (key, value) in vars {
        match value {
            Some(value) => std::env::set_var(key, value),
            None => std::env::remove_var(key),
        }
    }
    let result = f();
    for (key, value) in saved {
        match value {
            Some(value) => std::env::set_var(&key, value),
            None => std::env::remove_var(&key),
        }
    }
    result
}
