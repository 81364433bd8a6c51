//! Plan presentation: the built queue as a table or JSON.

use super::to_pretty_json;
use crate::error::ApiError;
use crate::schedule::Queue;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde_json::json;

pub fn format_plan_text(queue: &Queue) -> String {
    if queue.is_empty() {
        return "No tasks to schedule.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["#", "Task", "Category", "Difficulty", "Sections", "Prerequisites"]);
    for (position, entry) in queue.entries().iter().enumerate() {
        let prerequisites = if entry.spec.prerequisites.is_empty() {
            "-".to_string()
        } else {
            entry.spec.prerequisites.join(", ")
        };
        table.add_row(vec![
            (position + 1).to_string(),
            entry.spec.id.clone(),
            entry.spec.category.clone(),
            format!("{:.2}", entry.difficulty),
            entry.spec.resolved_sections().len().to_string(),
            prerequisites,
        ]);
    }
    format!("Generation queue ({} tasks)\n\n{}", queue.len(), table)
}

pub fn format_plan_json(queue: &Queue) -> Result<String, ApiError> {
    let entries: Vec<_> = queue
        .entries()
        .iter()
        .enumerate()
        .map(|(position, entry)| {
            json!({
                "position": position,
                "task_id": entry.spec.id,
                "category": entry.spec.category,
                "difficulty": entry.difficulty,
                "prerequisites": entry.spec.prerequisites,
            })
        })
        .collect();
    to_pretty_json(&json!({ "tasks": entries, "total": queue.len() }))
}
