//! Run presentation: per-task outcome table and cache counters.

use super::to_pretty_json;
use crate::error::ApiError;
use crate::generation::{RunReport, TaskOutcome};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde_json::json;
use std::path::PathBuf;

pub fn format_run_text(report: &RunReport, written: &[PathBuf]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Task", "Status", "Detail", "Quality", "Corr/Exp", "Retries"]);
    for outcome in &report.outcomes {
        match outcome {
            TaskOutcome::Finalized(artifact) => table.add_row(vec![
                artifact.task_id.clone(),
                "finalized".to_string(),
                format!("{} calls, {} cached", artifact.model_calls, artifact.cache_hits),
                format!("{:.2}", artifact.quality.score),
                format!(
                    "{}/{}",
                    artifact.attempts.corrections, artifact.attempts.expansions
                ),
                artifact.attempts.retries.to_string(),
            ]),
            TaskOutcome::Failed(failure) => table.add_row(vec![
                failure.task_id.clone(),
                "failed".to_string(),
                format!("{} (in {})", failure.reason, failure.stage),
                "-".to_string(),
                format!(
                    "{}/{}",
                    failure.attempts.corrections, failure.attempts.expansions
                ),
                failure.attempts.retries.to_string(),
            ]),
        };
    }

    let cache = &report.cache;
    let mut out = format!(
        "Run finished in {} ms: {} finalized, {} failed\n\n{}\n\nCache: l1 {}/{} l2 {}/{} l3 {}/{} (hits/misses), {} demotions",
        report.elapsed_ms,
        report.finalized_count(),
        report.failed_count(),
        table,
        cache.l1.hits,
        cache.l1.misses,
        cache.l2.hits,
        cache.l2.misses,
        cache.l3.hits,
        cache.l3.misses,
        cache.demotions,
    );
    if !written.is_empty() {
        out.push_str("\n\nWritten:");
        for path in written {
            out.push_str(&format!("\n  {}", path.display()));
        }
    }
    out
}

pub fn format_run_json(report: &RunReport, written: &[PathBuf]) -> Result<String, ApiError> {
    to_pretty_json(&json!({
        "finalized": report.finalized_count(),
        "failed": report.failed_count(),
        "report": report,
        "written": written,
    }))
}
