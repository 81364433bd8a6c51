//! Built-in text hygiene validators

use crate::validation::issue::{IssueScope, Severity, ValidationIssue};
use crate::validation::validator::{Validator, ValidatorScope};
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Case-insensitive pattern for a literal phrase, anchored on word
/// boundaries where the phrase starts or ends with a word character.
fn phrase_pattern(phrase: &str) -> Result<Regex, regex::Error> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let mut pattern = String::from("(?i)");
    if phrase.chars().next().is_some_and(is_word) {
        pattern.push_str(r"\b");
    }
    pattern.push_str(&regex::escape(phrase));
    if phrase.chars().last().is_some_and(is_word) {
        pattern.push_str(r"\b");
    }
    Regex::new(&pattern)
}

fn compile_phrases(phrases: &[String]) -> Result<Vec<(String, Regex)>, regex::Error> {
    phrases
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(|p| Ok((p.to_string(), phrase_pattern(p)?)))
        .collect()
}

/// Section is empty or whitespace only.
pub struct EmptySection;

impl Validator for EmptySection {
    fn name(&self) -> &str {
        "empty_section"
    }

    fn priority(&self) -> i32 {
        10
    }

    fn scope(&self) -> ValidatorScope {
        ValidatorScope::Section
    }

    fn validate(&self, text: &str, scope: &IssueScope) -> Vec<ValidationIssue> {
        if !text.trim().is_empty() {
            return Vec::new();
        }
        vec![
            ValidationIssue::new(self.name(), "empty", Severity::Critical, "Section has no content")
                .at(scope, None),
        ]
    }
}

/// Section still contains placeholder markers.
pub struct Placeholder {
    markers: Vec<(String, Regex)>,
}

impl Placeholder {
    pub fn new(markers: &[String]) -> Result<Self, regex::Error> {
        Ok(Self {
            markers: compile_phrases(markers)?,
        })
    }
}

impl Validator for Placeholder {
    fn name(&self) -> &str {
        "placeholder"
    }

    fn priority(&self) -> i32 {
        20
    }

    fn scope(&self) -> ValidatorScope {
        ValidatorScope::Section
    }

    fn validate(&self, text: &str, scope: &IssueScope) -> Vec<ValidationIssue> {
        self.markers
            .iter()
            .filter_map(|(marker, re)| {
                let m = re.find(text)?;
                Some(
                    ValidationIssue::new(
                        self.name(),
                        "placeholder",
                        Severity::Critical,
                        format!("Placeholder marker '{}' left in text", marker),
                    )
                    .at(scope, Some((m.start(), m.end()))),
                )
            })
            .collect()
    }
}

/// Section contains a configured forbidden phrase. Fix removes every occurrence.
pub struct ForbiddenPhrase {
    phrases: Vec<(String, Regex)>,
}

impl ForbiddenPhrase {
    pub fn new(phrases: &[String]) -> Result<Self, regex::Error> {
        Ok(Self {
            phrases: compile_phrases(phrases)?,
        })
    }

    fn pattern_for(&self, message: &str) -> Option<&Regex> {
        self.phrases
            .iter()
            .find(|(phrase, _)| message_names(message, phrase))
            .map(|(_, re)| re)
    }
}

fn message_names(message: &str, phrase: &str) -> bool {
    message
        .strip_prefix("Forbidden phrase '")
        .and_then(|rest| rest.strip_suffix("' present"))
        .is_some_and(|quoted| quoted == phrase)
}

impl Validator for ForbiddenPhrase {
    fn name(&self) -> &str {
        "forbidden_phrase"
    }

    fn priority(&self) -> i32 {
        30
    }

    fn scope(&self) -> ValidatorScope {
        ValidatorScope::Section
    }

    fn validate(&self, text: &str, scope: &IssueScope) -> Vec<ValidationIssue> {
        self.phrases
            .iter()
            .filter_map(|(phrase, re)| {
                let m = re.find(text)?;
                Some(
                    ValidationIssue::new(
                        self.name(),
                        "forbidden_phrase",
                        Severity::Critical,
                        format!("Forbidden phrase '{}' present", phrase),
                    )
                    .at(scope, Some((m.start(), m.end())))
                    .fixable(),
                )
            })
            .collect()
    }

    fn fix(&self, text: &str, issue: &ValidationIssue) -> Option<String> {
        let re = self.pattern_for(&issue.message)?;
        // Removal can splice a new occurrence together, so run to a fixpoint.
        let mut current = text.to_string();
        while re.is_match(&current) {
            current = re.replace_all(&current, "").into_owned();
        }
        Some(current)
    }
}

fn fence_count(text: &str) -> usize {
    text.lines()
        .filter(|line| line.trim_start().starts_with("```"))
        .count()
}

/// Odd number of code fence lines.
pub struct UnbalancedFence;

impl Validator for UnbalancedFence {
    fn name(&self) -> &str {
        "unbalanced_fence"
    }

    fn priority(&self) -> i32 {
        40
    }

    fn scope(&self) -> ValidatorScope {
        ValidatorScope::Section
    }

    fn validate(&self, text: &str, scope: &IssueScope) -> Vec<ValidationIssue> {
        let count = fence_count(text);
        if count % 2 == 0 {
            return Vec::new();
        }
        vec![ValidationIssue::new(
            self.name(),
            "unclosed_fence",
            Severity::Error,
            format!("{} code fence lines; last fence is never closed", count),
        )
        .at(scope, None)
        .fixable()]
    }

    fn fix(&self, text: &str, _issue: &ValidationIssue) -> Option<String> {
        let mut fixed = text.to_string();
        if fence_count(text) % 2 == 1 {
            if !fixed.ends_with('\n') {
                fixed.push('\n');
            }
            fixed.push_str("```");
        }
        Some(fixed)
    }
}

/// Lines ending in spaces or tabs.
pub struct TrailingWhitespace;

fn has_trailing_whitespace(line: &str) -> bool {
    line.ends_with(' ') || line.ends_with('\t')
}

impl Validator for TrailingWhitespace {
    fn name(&self) -> &str {
        "trailing_whitespace"
    }

    fn priority(&self) -> i32 {
        50
    }

    fn scope(&self) -> ValidatorScope {
        ValidatorScope::Section
    }

    fn validate(&self, text: &str, scope: &IssueScope) -> Vec<ValidationIssue> {
        let count = text.split('\n').filter(|l| has_trailing_whitespace(l)).count();
        if count == 0 {
            return Vec::new();
        }
        vec![ValidationIssue::new(
            self.name(),
            "trailing_whitespace",
            Severity::Warning,
            format!("{} line(s) end in whitespace", count),
        )
        .at(scope, None)
        .fixable()]
    }

    fn fix(&self, text: &str, _issue: &ValidationIssue) -> Option<String> {
        let lines: Vec<&str> = text
            .split('\n')
            .map(|line| line.trim_end_matches([' ', '\t']))
            .collect();
        Some(lines.join("\n"))
    }
}

fn blank_run_regex() -> &'static Regex {
    static BLANK_RUN: OnceLock<Regex> = OnceLock::new();
    BLANK_RUN.get_or_init(|| Regex::new(r"\n{3,}").expect("blank run pattern is valid"))
}

/// Three or more consecutive newlines.
pub struct BlankLineRun;

impl Validator for BlankLineRun {
    fn name(&self) -> &str {
        "blank_line_run"
    }

    fn priority(&self) -> i32 {
        60
    }

    fn scope(&self) -> ValidatorScope {
        ValidatorScope::Section
    }

    fn validate(&self, text: &str, scope: &IssueScope) -> Vec<ValidationIssue> {
        match blank_run_regex().find(text) {
            Some(m) => vec![ValidationIssue::new(
                self.name(),
                "blank_line_run",
                Severity::Info,
                "Run of more than one blank line",
            )
            .at(scope, Some((m.start(), m.end())))
            .fixable()],
            None => Vec::new(),
        }
    }

    fn fix(&self, text: &str, _issue: &ValidationIssue) -> Option<String> {
        Some(blank_run_regex().replace_all(text, "\n\n").into_owned())
    }
}

fn citation_regex() -> &'static Regex {
    static CITATION: OnceLock<Regex> = OnceLock::new();
    CITATION.get_or_init(|| {
        Regex::new(r"\[\d+\]|\([A-Z][A-Za-z'\-]+(?: et al\.)?, \d{4}\)")
            .expect("citation pattern is valid")
    })
}

/// Count of `[n]` and `(Name, YYYY)` citations.
pub fn count_citations(text: &str) -> usize {
    citation_regex().find_iter(text).count()
}

/// Citations per thousand words over the whole document.
pub struct CitationDensity {
    min_per_thousand: f64,
}

impl CitationDensity {
    pub fn new(min_per_thousand: f64) -> Self {
        Self { min_per_thousand }
    }
}

impl Validator for CitationDensity {
    fn name(&self) -> &str {
        "citation_density"
    }

    fn priority(&self) -> i32 {
        70
    }

    fn scope(&self) -> ValidatorScope {
        ValidatorScope::Document
    }

    fn validate(&self, text: &str, scope: &IssueScope) -> Vec<ValidationIssue> {
        if self.min_per_thousand <= 0.0 {
            return Vec::new();
        }
        let words = text.split_whitespace().count();
        if words == 0 {
            return Vec::new();
        }
        let density = count_citations(text) as f64 * 1000.0 / words as f64;
        if density >= self.min_per_thousand {
            return Vec::new();
        }
        vec![ValidationIssue::new(
            self.name(),
            "low_citation_density",
            Severity::Error,
            format!(
                "{:.2} citations per 1000 words, minimum is {:.2}",
                density, self.min_per_thousand
            ),
        )
        .at(scope, None)]
    }
}

/// Long paragraphs repeated verbatim (whitespace and case normalized).
pub struct DuplicateParagraph {
    min_words: usize,
}

impl DuplicateParagraph {
    pub fn new(min_words: usize) -> Self {
        Self { min_words }
    }
}

impl Default for DuplicateParagraph {
    fn default() -> Self {
        Self::new(8)
    }
}

impl Validator for DuplicateParagraph {
    fn name(&self) -> &str {
        "duplicate_paragraph"
    }

    fn priority(&self) -> i32 {
        80
    }

    fn scope(&self) -> ValidatorScope {
        ValidatorScope::Document
    }

    fn validate(&self, text: &str, scope: &IssueScope) -> Vec<ValidationIssue> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut order = Vec::new();
        let normalized = text.replace("\r\n", "\n");
        for paragraph in normalized.split("\n\n") {
            let words: Vec<&str> = paragraph.split_whitespace().collect();
            if words.len() < self.min_words {
                continue;
            }
            let key = words.join(" ").to_lowercase();
            let count = seen.entry(key.clone()).or_insert(0);
            *count += 1;
            if *count == 2 {
                order.push(key);
            }
        }

        order
            .into_iter()
            .map(|key| {
                let preview: String = key.chars().take(60).collect();
                ValidationIssue::new(
                    self.name(),
                    "duplicate_paragraph",
                    Severity::Warning,
                    format!("Paragraph repeated {} times: \"{}\"", seen[&key], preview),
                )
                .at(scope, None)
            })
            .collect()
    }
}
