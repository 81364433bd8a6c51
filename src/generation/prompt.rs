//! Prompt scaffolding for drafting, correction and expansion.
//!
//! Prompts are minimal on purpose; what matters to the pipeline is that the
//! same inputs always produce the same request and therefore the same
//! cache fingerprint.

use crate::cache::FingerprintBuilder;
use crate::generation::state::SectionState;
use crate::provider::CompletionRequest;
use crate::schedule::TaskSpec;
use crate::types::{Fingerprint, TaskId};
use crate::validation::ValidationIssue;
use std::fmt::Write;

const DRAFT_SYSTEM: &str =
    "You write one section of a longer document. Respond with the section text only.";
const CORRECTION_SYSTEM: &str =
    "You revise a section of a longer document. Respond with the full revised section text only.";
const EXPANSION_SYSTEM: &str = "You extend a section of a longer document. Keep the existing \
     text unchanged and add new material. Respond with the full extended section text only.";

/// Sampling parameters shared by every request of a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.7,
        }
    }
}

/// Finalized text of a prerequisite, trimmed to an excerpt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrerequisiteExcerpt {
    pub task_id: TaskId,
    pub text: String,
}

impl PrerequisiteExcerpt {
    pub fn new(task_id: TaskId, document: &str, max_chars: usize) -> Self {
        Self {
            task_id,
            text: document.chars().take(max_chars).collect(),
        }
    }
}

pub fn fingerprint(model: &str, request: &CompletionRequest) -> Fingerprint {
    FingerprintBuilder::new("completion")
        .text("model", model)
        .text("system", &request.system)
        .text("prompt", &request.prompt)
        .field("max_tokens", &request.max_tokens.to_le_bytes())
        .field("temperature", &request.temperature.to_bits().to_le_bytes())
        .finish()
}

fn header(task: &TaskSpec, section: &SectionState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Document: {}", task.title);
    let _ = writeln!(out, "Category: {}", task.category);
    let _ = writeln!(out, "Section: {}", section.id);
    if !section.brief.is_empty() {
        let _ = writeln!(out, "Brief: {}", section.brief);
    }
    if section.min_words > 0 {
        let _ = writeln!(out, "Length: at least {} words", section.min_words);
    }
    out
}

pub fn draft_request(
    task: &TaskSpec,
    section: &SectionState,
    prerequisites: &[PrerequisiteExcerpt],
    params: GenerationParams,
) -> CompletionRequest {
    let mut prompt = header(task, section);
    if !prerequisites.is_empty() {
        prompt.push_str("\nContext from earlier documents:\n");
        for excerpt in prerequisites {
            let _ = write!(prompt, "\n### {}\n{}\n", excerpt.task_id, excerpt.text);
        }
    }
    request(DRAFT_SYSTEM, prompt, params)
}

pub fn correction_request(
    task: &TaskSpec,
    section: &SectionState,
    issues: &[&ValidationIssue],
    params: GenerationParams,
) -> CompletionRequest {
    let mut prompt = header(task, section);
    prompt.push_str("\nProblems to fix:\n");
    for issue in issues {
        let _ = writeln!(prompt, "- {}", issue);
    }
    let _ = write!(prompt, "\nCurrent text:\n{}\n", section.text);
    request(CORRECTION_SYSTEM, prompt, params)
}

pub fn expansion_request(
    task: &TaskSpec,
    section: &SectionState,
    params: GenerationParams,
) -> CompletionRequest {
    let mut prompt = header(task, section);
    let _ = writeln!(
        prompt,
        "\nThe section has {} words and needs at least {}.",
        section.word_count(),
        section.min_words
    );
    let _ = write!(prompt, "\nCurrent text:\n{}\n", section.text);
    request(EXPANSION_SYSTEM, prompt, params)
}

/// Combine an expansion response with the text it extends.
///
/// A response that keeps the existing text is taken whole; anything else is
/// appended so the existing text always survives.
pub fn merge_expansion(existing: &str, response: &str) -> String {
    let kept = existing.trim();
    if kept.is_empty() || response.contains(kept) {
        return response.to_string();
    }
    format!("{}\n\n{}", existing.trim_end(), response.trim())
}

/// `# title`, then `## id` and the text of each section, blank-line separated.
pub fn assemble(title: &str, sections: &[SectionState]) -> String {
    let mut document = format!("# {}\n", title);
    for section in sections {
        let _ = write!(document, "\n## {}\n\n{}\n", section.id, section.text.trim_end());
    }
    document
}

fn request(system: &str, prompt: String, params: GenerationParams) -> CompletionRequest {
    CompletionRequest {
        system: system.to_string(),
        prompt,
        max_tokens: params.max_tokens,
        temperature: params.temperature,
    }
}
