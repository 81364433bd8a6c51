//! Validation issue types

use crate::types::SectionId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Issue severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Critical and Error issues hold a task back from assembly.
    pub fn is_blocking(self) -> bool {
        self >= Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        };
        write!(f, "{}", label)
    }
}

/// What part of the document an issue refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "section", rename_all = "snake_case")]
pub enum IssueScope {
    Section(SectionId),
    Document,
}

impl IssueScope {
    pub fn section(id: impl Into<SectionId>) -> Self {
        IssueScope::Section(id.into())
    }

    pub fn section_id(&self) -> Option<&str> {
        match self {
            IssueScope::Section(id) => Some(id),
            IssueScope::Document => None,
        }
    }
}

impl fmt::Display for IssueScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueScope::Section(id) => write!(f, "section '{}'", id),
            IssueScope::Document => write!(f, "document"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueLocation {
    pub scope: IssueScope,
    /// Byte range of the first offending match, when there is one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<(usize, usize)>,
}

/// Identity of an issue kind across validation passes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IssueKind {
    pub validator: String,
    pub code: String,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.validator, self.code)
    }
}

/// A single finding. Created fresh on every pass and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub validator: String,
    pub code: String,
    pub severity: Severity,
    pub message: String,
    pub location: Option<IssueLocation>,
    pub auto_fixable: bool,
}

impl ValidationIssue {
    pub fn new(
        validator: &str,
        code: &str,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            validator: validator.to_string(),
            code: code.to_string(),
            severity,
            message: message.into(),
            location: None,
            auto_fixable: false,
        }
    }

    pub fn at(mut self, scope: &IssueScope, span: Option<(usize, usize)>) -> Self {
        self.location = Some(IssueLocation {
            scope: scope.clone(),
            span,
        });
        self
    }

    pub fn fixable(mut self) -> Self {
        self.auto_fixable = true;
        self
    }

    pub fn kind(&self) -> IssueKind {
        IssueKind {
            validator: self.validator.clone(),
            code: self.code.clone(),
        }
    }

    pub fn scope(&self) -> Option<&IssueScope> {
        self.location.as_ref().map(|l| &l.scope)
    }

    /// Section the issue is attached to, if section-scoped.
    pub fn section_id(&self) -> Option<&str> {
        self.scope().and_then(IssueScope::section_id)
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope() {
            Some(scope) => write!(
                f,
                "[{}] {}/{} in {}: {}",
                self.severity, self.validator, self.code, scope, self.message
            ),
            None => write!(
                f,
                "[{}] {}/{}: {}",
                self.severity, self.validator, self.code, self.message
            ),
        }
    }
}
