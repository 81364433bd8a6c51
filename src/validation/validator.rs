//! Validator trait

use crate::validation::issue::{IssueScope, ValidationIssue};

/// Whether a validator runs per section or on the assembled document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorScope {
    Section,
    Document,
}

/// A single rule check over a text artifact.
///
/// A validator that reports an issue with `auto_fixable = true` must return
/// `Some` from [`Validator::fix`] for it. Fixes must be idempotent and must
/// only touch the text the issue refers to.
pub trait Validator: Send + Sync {
    fn name(&self) -> &str;

    /// Lower runs first.
    fn priority(&self) -> i32;

    fn scope(&self) -> ValidatorScope;

    fn validate(&self, text: &str, scope: &IssueScope) -> Vec<ValidationIssue>;

    fn fix(&self, _text: &str, _issue: &ValidationIssue) -> Option<String> {
        None
    }
}
