//! Integration tests for layered configuration loading

use super::test_utils::with_env;
use folio::config::{ConfigLoader, ProviderType, ValidationError};
use std::path::Path;
use tempfile::TempDir;

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// Workspace with a global file, a base workspace file and a production overlay.
fn layered_workspace() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    write(
        &temp_dir.path().join("xdg/folio/config.toml"),
        r#"
[provider]
provider_type = "openai"
model = "global-model"

[cache]
l1_capacity = 10
l2_capacity = 20
"#,
    );
    write(
        &temp_dir.path().join("workspace/config/config.toml"),
        r#"
[provider]
model = "workspace-model"

[cache]
l1_capacity = 11
"#,
    );
    write(
        &temp_dir.path().join("workspace/config/production.toml"),
        r#"
[orchestrator]
workers = 4
"#,
    );
    temp_dir
}

fn xdg(temp_dir: &TempDir) -> String {
    temp_dir.path().join("xdg").to_string_lossy().to_string()
}

#[test]
fn test_workspace_file_overrides_global_file() {
    let temp_dir = layered_workspace();
    let xdg_home = xdg(&temp_dir);
    let config = with_env(
        &[
            ("XDG_CONFIG_HOME", Some(xdg_home.as_str())),
            ("FOLIO_ENV", None),
            ("FOLIO__CACHE__L1_CAPACITY", None),
        ],
        || ConfigLoader::load(&temp_dir.path().join("workspace")).unwrap(),
    );

    assert_eq!(config.provider.provider_type, ProviderType::OpenAI);
    assert_eq!(config.provider.model, "workspace-model");
    assert_eq!(config.cache.l1_capacity, 11);
    assert_eq!(config.cache.l2_capacity, 20);
    assert_eq!(config.orchestrator.workers, 1);
}

#[test]
fn test_env_specific_file_and_variables_override_files() {
    let temp_dir = layered_workspace();
    let xdg_home = xdg(&temp_dir);
    let config = with_env(
        &[
            ("XDG_CONFIG_HOME", Some(xdg_home.as_str())),
            ("FOLIO_ENV", Some("production")),
            ("FOLIO__CACHE__L1_CAPACITY", Some("7")),
            ("FOLIO__VALIDATION__FORBIDDEN_PHRASES", Some("as an AI,in conclusion")),
        ],
        || ConfigLoader::load(&temp_dir.path().join("workspace")).unwrap(),
    );

    assert_eq!(config.orchestrator.workers, 4);
    assert_eq!(config.cache.l1_capacity, 7);
    assert_eq!(
        config.validation.forbidden_phrases,
        vec!["as an AI".to_string(), "in conclusion".to_string()]
    );
    assert_eq!(config.provider.model, "workspace-model");
}

#[test]
fn test_explicit_file_sits_between_workspace_and_env() {
    let temp_dir = layered_workspace();
    let explicit = temp_dir.path().join("explicit.toml");
    write(&explicit, "[provider]\nmodel = \"explicit-model\"\n\n[cache]\nl1_capacity = 99\n");
    let xdg_home = xdg(&temp_dir);
    let config = with_env(
        &[
            ("XDG_CONFIG_HOME", Some(xdg_home.as_str())),
            ("FOLIO_ENV", None),
            ("FOLIO__CACHE__L1_CAPACITY", Some("3")),
        ],
        || {
            ConfigLoader::load_with_override(&temp_dir.path().join("workspace"), Some(&explicit))
                .unwrap()
        },
    );

    assert_eq!(config.provider.model, "explicit-model");
    assert_eq!(config.cache.l1_capacity, 3);
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = with_env(&[("XDG_CONFIG_HOME", Some("/nonexistent-folio-xdg"))], || {
        ConfigLoader::load_with_override(temp_dir.path(), Some(&temp_dir.path().join("nope.toml")))
    });
    assert!(result.is_err());
}

#[test]
fn test_loaded_config_is_validated_as_a_whole() {
    let temp_dir = TempDir::new().unwrap();
    write(
        &temp_dir.path().join("config/config.toml"),
        r#"
[provider]
provider_type = "local_custom"
model = "m"

[scheduler]
difficulty_band = 0.2

[validation]
min_citations_per_1000_words = -2.0
"#,
    );
    let config = with_env(
        &[
            ("XDG_CONFIG_HOME", Some("/nonexistent-folio-xdg")),
            ("FOLIO_ENV", None),
        ],
        || ConfigLoader::load(temp_dir.path()).unwrap(),
    );

    assert_eq!(config.scheduler.difficulty_band, 0.2);
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 2);
    assert!(matches!(errors[0], ValidationError::Provider(_)));
    assert!(matches!(errors[1], ValidationError::Validation(_)));
}
