//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::artifact::ArtifactStore;
use crate::cache::CacheHierarchy;
use crate::cli::parse::{CacheCommands, Commands, OutputFormat};
use crate::cli::presentation::{
    format_cache_clear_result, format_plan_json, format_plan_text, format_run_json,
    format_run_text,
};
use crate::config::{ConfigLoader, FolioConfig};
use crate::error::{ApiError, StorageError};
use crate::generation::{GenerationContext, GenerationParams, Orchestrator, RunReport};
use crate::provider::ModelService;
use crate::schedule::{Queue, QueueBuilder, TaskPool};
use crate::store::persistence::{ARTIFACT_TREE, CACHE_TREE};
use crate::store::{MemoryStore, PersistentStore, SledStore};
use crate::validation::ValidatorPipeline;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Runtime context for CLI execution: workspace root and the loaded configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: FolioConfig,
}

impl RunContext {
    /// Load configuration for `workspace_root`, with `config_path` layered above
    /// the workspace files.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = ConfigLoader::load_with_override(&workspace_root, config_path.as_deref())?;
        Ok(Self::with_config(workspace_root, config))
    }

    pub fn with_config(workspace_root: PathBuf, config: FolioConfig) -> Self {
        Self {
            workspace_root,
            config,
        }
    }

    pub fn config(&self) -> &FolioConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Plan { tasks, format } => {
                let queue = self.build_queue(tasks)?;
                match format {
                    OutputFormat::Text => Ok(format_plan_text(&queue)),
                    OutputFormat::Json => format_plan_json(&queue),
                }
            }
            Commands::Run {
                tasks,
                workers,
                out,
                format,
            } => {
                self.validate_config()?;
                let queue = self.build_queue(tasks)?;
                let service = self.config.provider.create_client()?;
                let report = self.run_queue(&queue, service, *workers)?;
                let written = match out {
                    Some(dir) => write_documents(&report, dir)?,
                    None => Vec::new(),
                };
                match format {
                    OutputFormat::Text => Ok(format_run_text(&report, &written)),
                    OutputFormat::Json => format_run_json(&report, &written),
                }
            }
            Commands::Cache { command } => match command {
                CacheCommands::Clear => self.clear_cache(),
            },
        }
    }

    fn validate_config(&self) -> Result<(), ApiError> {
        self.config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            ApiError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })
    }

    fn build_queue(&self, tasks: &Path) -> Result<Queue, ApiError> {
        self.config
            .scheduler
            .validate()
            .map_err(ApiError::ConfigError)?;
        let pool = TaskPool::from_path(&self.resolve(tasks))?;
        Ok(QueueBuilder::new(self.config.scheduler.clone()).build(&pool.tasks)?)
    }

    /// Run the orchestrator over `queue` with the given model service.
    ///
    /// Ctrl-C cancels the run; tasks in flight finish as `cancelled`.
    pub fn run_queue(
        &self,
        queue: &Queue,
        service: Arc<dyn ModelService>,
        workers: Option<usize>,
    ) -> Result<RunReport, ApiError> {
        let l3 = self.open_l3()?;
        let cache = Arc::new(CacheHierarchy::new(&self.config.cache, l3)?);
        let pipeline = ValidatorPipeline::from_config(&self.config.validation)
            .map_err(|e| ApiError::ConfigError(format!("Invalid validation pattern: {}", e)))?;
        let artifacts = self.open_artifacts()?;

        let orchestrator_config = &self.config.orchestrator;
        let ctx = GenerationContext::new(service, cache, Arc::new(pipeline))
            .with_limits(orchestrator_config.limits())
            .with_params(GenerationParams {
                max_tokens: self.config.provider.max_tokens,
                temperature: self.config.provider.temperature,
            });
        let orchestrator = Orchestrator::new(ctx)
            .with_workers(workers.unwrap_or(orchestrator_config.workers))
            .with_excerpt_chars(orchestrator_config.prerequisite_excerpt_chars)
            .with_artifact_store(ArtifactStore::new(artifacts));

        let runtime = tokio::runtime::Runtime::new()
            .map_err(|e| ApiError::GenerationFailed(format!("Failed to start runtime: {}", e)))?;
        let cancel = CancellationToken::new();
        let report = runtime.block_on(async {
            let signal_token = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received; cancelling generation run");
                    signal_token.cancel();
                }
            });
            orchestrator.run(queue, &cancel).await
        });
        info!(
            finalized = report.finalized_count(),
            failed = report.failed_count(),
            "Run complete"
        );
        Ok(report)
    }

    fn clear_cache(&self) -> Result<String, ApiError> {
        if !self.config.cache.persist {
            return Ok(format_cache_clear_result(0, None));
        }
        let path = self.resolve(&self.config.cache.l3_path);
        let store = SledStore::open(&path, CACHE_TREE)?;
        let removed = store.len()?;
        store.clear()?;
        store.flush()?;
        info!(removed, path = %path.display(), "Cleared durable cache tier");
        Ok(format_cache_clear_result(removed, Some(&path)))
    }

    fn open_l3(&self) -> Result<Arc<dyn PersistentStore>, ApiError> {
        if !self.config.cache.persist {
            return Ok(Arc::new(MemoryStore::new()));
        }
        let path = self.resolve(&self.config.cache.l3_path);
        ensure_dir(&path)?;
        Ok(Arc::new(SledStore::open(&path, CACHE_TREE)?))
    }

    fn open_artifacts(&self) -> Result<Arc<dyn PersistentStore>, ApiError> {
        let path = self.config.storage.artifacts_dir(&self.workspace_root);
        ensure_dir(&path)?;
        Ok(Arc::new(SledStore::open(&path, ARTIFACT_TREE)?))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace_root.join(path)
        }
    }
}

fn ensure_dir(path: &Path) -> Result<(), ApiError> {
    std::fs::create_dir_all(path).map_err(|e| ApiError::StorageError(StorageError::IoError(e)))
}

/// Write each finalized document to `<dir>/<task>.md`.
fn write_documents(report: &RunReport, dir: &Path) -> Result<Vec<PathBuf>, ApiError> {
    ensure_dir(dir)?;
    let mut written = Vec::new();
    for artifact in report.outcomes.iter().filter_map(|o| o.artifact()) {
        let path = dir.join(format!("{}.md", artifact.task_id));
        std::fs::write(&path, &artifact.document)
            .map_err(|e| ApiError::StorageError(StorageError::IoError(e)))?;
        written.push(path);
    }
    Ok(written)
}
