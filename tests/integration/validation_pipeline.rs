//! Integration tests for the validator pipeline

use folio::validation::{Severity, ValidationConfig, ValidatorPipeline};

fn pipeline(config: ValidationConfig) -> ValidatorPipeline {
    ValidatorPipeline::from_config(&config).unwrap()
}

#[test]
fn test_issues_are_reported_in_priority_order_across_sections() {
    let pipeline = pipeline(ValidationConfig::default());
    let sections = [
        ("intro", "Intro text  \nwith TODO left in"),
        ("body", ""),
        ("outro", "```rust\nfn main() {}"),
    ];
    let report = pipeline.validate_sections(sections);

    let codes: Vec<&str> = report.issues.iter().map(|i| i.code.as_str()).collect();
    assert_eq!(
        codes,
        vec!["empty", "placeholder", "unclosed_fence", "trailing_whitespace"]
    );
    assert!(!report.passed());
    assert!(report.blocking());
    assert_eq!(report.for_section("intro").count(), 2);
    assert_eq!(report.count(Severity::Critical), 2);
}

#[test]
fn test_fixes_are_idempotent_and_clear_their_issues() {
    let config = ValidationConfig {
        forbidden_phrases: vec!["needless to say".to_string()],
        ..ValidationConfig::default()
    };
    let pipeline = pipeline(config);
    let text = "Needless to say, it works.  \n\n\n\n```\ncode";
    let report = pipeline.validate_section("s", text);
    assert!(report.issues.iter().all(|i| i.auto_fixable));

    let fixed = pipeline.apply_fixes(text, &report.issues);
    assert_eq!(fixed.applied, 4);
    assert!(pipeline.validate_section("s", &fixed.text).is_empty());

    let again = pipeline.apply_fixes(&fixed.text, &report.issues);
    assert_eq!(again.applied, 0);
    assert_eq!(again.text, fixed.text);
}

#[test]
fn test_document_checks_run_only_on_assembled_text() {
    let config = ValidationConfig {
        min_citations_per_1000_words: 5.0,
        ..ValidationConfig::default()
    };
    let pipeline = pipeline(config);
    let paragraph = "This paragraph is long enough to count as a real duplicate here.";
    let document = format!("# Doc\n\n{}\n\n{}\n", paragraph, paragraph);

    assert!(pipeline.validate_section("s", &document).is_empty());

    let report = pipeline.validate_document(&document);
    let codes: Vec<&str> = report.issues.iter().map(|i| i.code.as_str()).collect();
    assert_eq!(codes, vec!["low_citation_density", "duplicate_paragraph"]);
    assert!(report.blocking());
    assert!(report.passed());
    assert!(report.issues.iter().all(|i| i.section_id().is_none()));
}

#[test]
fn test_custom_markers_replace_defaults() {
    let config = ValidationConfig {
        placeholder_markers: vec!["FIXME".to_string()],
        ..ValidationConfig::default()
    };
    let pipeline = pipeline(config);
    assert!(pipeline.validate_section("s", "TODO is fine here").is_empty());
    let report = pipeline.validate_section("s", "fixme later");
    assert_eq!(report.critical_kinds().len(), 1);
}
