//! Validator pipeline: ordered, pluggable rule checks over section and
//! document text, with idempotent local auto-fixes.

pub mod issue;
pub mod pipeline;
pub mod rules;
pub mod validator;

pub use issue::{IssueKind, IssueLocation, IssueScope, Severity, ValidationIssue};
pub use pipeline::{FixOutcome, ValidationReport, ValidatorPipeline};
pub use validator::{Validator, ValidatorScope};

use serde::{Deserialize, Serialize};

/// Built-in validator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    #[serde(default = "default_placeholder_markers")]
    pub placeholder_markers: Vec<String>,

    #[serde(default)]
    pub forbidden_phrases: Vec<String>,

    /// 0 disables the citation density check
    #[serde(default)]
    pub min_citations_per_1000_words: f64,

    #[serde(default = "default_duplicate_paragraph_min_words")]
    pub duplicate_paragraph_min_words: usize,
}

fn default_placeholder_markers() -> Vec<String> {
    ["TODO", "TBD", "lorem ipsum", "[citation needed]"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_duplicate_paragraph_min_words() -> usize {
    8
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            placeholder_markers: default_placeholder_markers(),
            forbidden_phrases: Vec::new(),
            min_citations_per_1000_words: 0.0,
            duplicate_paragraph_min_words: default_duplicate_paragraph_min_words(),
        }
    }
}

impl ValidationConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.placeholder_markers.iter().any(|m| m.trim().is_empty()) {
            return Err("placeholder_markers cannot contain empty entries".to_string());
        }
        if self.forbidden_phrases.iter().any(|p| p.trim().is_empty()) {
            return Err("forbidden_phrases cannot contain empty entries".to_string());
        }
        let min = self.min_citations_per_1000_words;
        if !min.is_finite() || min < 0.0 {
            return Err(format!(
                "min_citations_per_1000_words must be a non-negative number, got {}",
                min
            ));
        }
        if self.duplicate_paragraph_min_words == 0 {
            return Err("duplicate_paragraph_min_words must be at least 1".to_string());
        }
        Ok(())
    }
}
