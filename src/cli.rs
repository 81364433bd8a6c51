//! CLI domain: parse, route, output and presentation only.
//! No domain orchestration; a single route table dispatches to domain services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{CacheCommands, Cli, Commands, OutputFormat};
pub use presentation::{
    format_cache_clear_result, format_plan_json, format_plan_text, format_run_json,
    format_run_text,
};
pub use route::RunContext;
