use crate::error::BuildError;
use crate::types::{SectionId, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Section identifier used when a task declares no sections.
pub const DEFAULT_SECTION_ID: &str = "body";

/// One section of a task's document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    pub id: SectionId,
    #[serde(default)]
    pub brief: String,
    /// Minimum size in words; falls back to an even share of the task's target.
    #[serde(default)]
    pub min_words: Option<usize>,
}

/// Immutable description of one unit of generation work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub id: TaskId,
    #[serde(default)]
    pub title: String,
    pub category: String,
    /// Explicit difficulty override (0.0-1.0). Derived from prerequisites when absent.
    #[serde(default)]
    pub difficulty: Option<f64>,
    /// The task's own declared complexity (0.0-1.0), used only when difficulty is derived.
    #[serde(default)]
    pub complexity: Option<f64>,
    #[serde(default)]
    pub prerequisites: Vec<TaskId>,
    /// Estimated output size in words.
    #[serde(default)]
    pub target_words: usize,
    #[serde(default)]
    pub sections: Vec<SectionSpec>,
}

impl TaskSpec {
    pub fn new(id: impl Into<TaskId>, category: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            title: id.clone(),
            id,
            category: category.into(),
            difficulty: None,
            complexity: None,
            prerequisites: Vec::new(),
            target_words: 0,
            sections: Vec::new(),
        }
    }

    pub fn with_difficulty(mut self, difficulty: f64) -> Self {
        self.difficulty = Some(difficulty);
        self
    }

    pub fn with_complexity(mut self, complexity: f64) -> Self {
        self.complexity = Some(complexity);
        self
    }

    pub fn with_prerequisites<I, S>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskId>,
    {
        self.prerequisites = prerequisites.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_target_words(mut self, target_words: usize) -> Self {
        self.target_words = target_words;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_section(mut self, section: SectionSpec) -> Self {
        self.sections.push(section);
        self
    }

    /// Sections in document order. A task with no declared sections has a single body section.
    pub fn resolved_sections(&self) -> Vec<SectionSpec> {
        if self.sections.is_empty() {
            return vec![SectionSpec {
                id: DEFAULT_SECTION_ID.to_string(),
                brief: self.title.clone(),
                min_words: Some(self.target_words),
            }];
        }
        let share = self.target_words / self.sections.len();
        self.sections
            .iter()
            .map(|section| SectionSpec {
                id: section.id.clone(),
                brief: section.brief.clone(),
                min_words: Some(section.min_words.unwrap_or(share)),
            })
            .collect()
    }

    pub(crate) fn check_fields(&self) -> Result<(), BuildError> {
        if self.id.trim().is_empty() {
            return Err(BuildError::EmptyTaskId);
        }
        for (field, value) in [("difficulty", self.difficulty), ("complexity", self.complexity)] {
            if let Some(value) = value {
                if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                    return Err(BuildError::InvalidDifficulty {
                        task: self.id.clone(),
                        field,
                        value,
                    });
                }
            }
        }
        let mut seen = HashSet::new();
        for section in &self.sections {
            if section.id.trim().is_empty() {
                return Err(BuildError::EmptySectionId {
                    task: self.id.clone(),
                });
            }
            if !seen.insert(section.id.as_str()) {
                return Err(BuildError::DuplicateSection {
                    task: self.id.clone(),
                    section: section.id.clone(),
                });
            }
        }
        Ok(())
    }
}

impl SectionSpec {
    pub fn new(id: impl Into<SectionId>, brief: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            brief: brief.into(),
            min_words: None,
        }
    }

    pub fn with_min_words(mut self, min_words: usize) -> Self {
        self.min_words = Some(min_words);
        self
    }
}
