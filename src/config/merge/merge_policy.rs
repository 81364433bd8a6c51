//! Merge rules: defaults, override order, environment overrides.

use config::builder::DefaultState;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("cache.l3_path", ".folio/cache")?
        .set_default("storage.artifacts_path", ".folio/artifacts")
}

/// `FOLIO__SECTION__KEY` overrides; list keys take comma-separated values.
pub fn environment_source() -> Environment {
    Environment::with_prefix("FOLIO")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("validation.placeholder_markers")
        .with_list_parse_key("validation.forbidden_phrases")
}
