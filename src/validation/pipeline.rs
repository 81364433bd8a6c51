//! Ordered validator pipeline and its report

use crate::validation::issue::{IssueKind, IssueScope, Severity, ValidationIssue};
use crate::validation::rules::{
    BlankLineRun, CitationDensity, DuplicateParagraph, EmptySection, ForbiddenPhrase,
    Placeholder, TrailingWhitespace, UnbalancedFence,
};
use crate::validation::validator::{Validator, ValidatorScope};
use crate::validation::ValidationConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Combined issues of one validation pass, in validator priority order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    /// No Critical issue in the combined set.
    pub fn passed(&self) -> bool {
        !self.has_severity(Severity::Critical)
    }

    /// At least one Critical or Error issue.
    pub fn blocking(&self) -> bool {
        self.issues.iter().any(|i| i.severity.is_blocking())
    }

    pub fn has_severity(&self, severity: Severity) -> bool {
        self.issues.iter().any(|i| i.severity == severity)
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn critical_kinds(&self) -> BTreeSet<IssueKind> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Critical)
            .map(ValidationIssue::kind)
            .collect()
    }

    pub fn blocking_issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity.is_blocking())
    }

    pub fn for_section<'a>(
        &'a self,
        section_id: &'a str,
    ) -> impl Iterator<Item = &'a ValidationIssue> + 'a {
        self.issues
            .iter()
            .filter(move |i| i.section_id() == Some(section_id))
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn merge(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
    }
}

/// Text after a batch of auto-fixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixOutcome {
    pub text: String,
    /// Number of fixes whose output differed from their input.
    pub applied: usize,
}

/// Ordered collection of validators.
///
/// Every validator always runs; earlier issues never suppress later
/// validators. Fixes are applied in issue order and the caller re-validates.
#[derive(Default)]
pub struct ValidatorPipeline {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidatorPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pipeline with every built-in validator, configured from `config`.
    pub fn from_config(config: &ValidationConfig) -> Result<Self, regex::Error> {
        let mut pipeline = Self::new();
        pipeline.register(Box::new(EmptySection));
        pipeline.register(Box::new(Placeholder::new(&config.placeholder_markers)?));
        pipeline.register(Box::new(ForbiddenPhrase::new(&config.forbidden_phrases)?));
        pipeline.register(Box::new(UnbalancedFence));
        pipeline.register(Box::new(TrailingWhitespace));
        pipeline.register(Box::new(BlankLineRun));
        pipeline.register(Box::new(CitationDensity::new(
            config.min_citations_per_1000_words,
        )));
        pipeline.register(Box::new(DuplicateParagraph::new(
            config.duplicate_paragraph_min_words,
        )));
        Ok(pipeline)
    }

    /// Add a validator, keeping ascending priority order (stable for ties).
    pub fn register(&mut self, validator: Box<dyn Validator>) {
        let position = self
            .validators
            .partition_point(|v| v.priority() <= validator.priority());
        self.validators.insert(position, validator);
    }

    pub fn with_validator<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.register(Box::new(validator));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.validators.iter().map(|v| v.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Run section-scoped validators over every section, validator by validator.
    pub fn validate_sections<'a, I>(&self, sections: I) -> ValidationReport
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
        I::IntoIter: Clone,
    {
        let sections = sections.into_iter();
        let mut issues = Vec::new();
        for validator in self.of_scope(ValidatorScope::Section) {
            for (id, text) in sections.clone() {
                issues.extend(validator.validate(text, &IssueScope::section(id)));
            }
        }
        debug!(issue_count = issues.len(), "Section validation complete");
        ValidationReport::new(issues)
    }

    pub fn validate_section(&self, section_id: &str, text: &str) -> ValidationReport {
        self.validate_sections([(section_id, text)])
    }

    /// Run document-scoped validators over assembled text.
    pub fn validate_document(&self, text: &str) -> ValidationReport {
        let issues: Vec<ValidationIssue> = self
            .of_scope(ValidatorScope::Document)
            .flat_map(|v| v.validate(text, &IssueScope::Document))
            .collect();
        debug!(issue_count = issues.len(), "Document validation complete");
        ValidationReport::new(issues)
    }

    /// Apply every auto-fixable issue to `text`, in order.
    ///
    /// Issues from validators not in this pipeline, or whose validator
    /// declines the fix, are skipped.
    pub fn apply_fixes<'a, I>(&self, text: &str, issues: I) -> FixOutcome
    where
        I: IntoIterator<Item = &'a ValidationIssue>,
    {
        let mut current = text.to_string();
        let mut applied = 0;
        for issue in issues.into_iter().filter(|i| i.auto_fixable) {
            let Some(validator) = self.validators.iter().find(|v| v.name() == issue.validator)
            else {
                continue;
            };
            if let Some(fixed) = validator.fix(&current, issue) {
                if fixed != current {
                    applied += 1;
                    current = fixed;
                }
            }
        }
        FixOutcome {
            text: current,
            applied,
        }
    }

    fn of_scope(&self, scope: ValidatorScope) -> impl Iterator<Item = &dyn Validator> + '_ {
        self.validators
            .iter()
            .filter(move |v| v.scope() == scope)
            .map(|v| v.as_ref())
    }
}
