//! Cache command presentation.

use std::path::Path;

pub fn format_cache_clear_result(removed: usize, path: Option<&Path>) -> String {
    match path {
        Some(path) => format!(
            "Cleared {} cached completion(s) from {}",
            removed,
            path.display()
        ),
        None => "Cache persistence is disabled; nothing to clear.".to_string(),
    }
}
