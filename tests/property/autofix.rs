//! Property-based tests for whitespace auto-fixes

use folio::validation::rules::{BlankLineRun, ForbiddenPhrase, TrailingWhitespace, UnbalancedFence};
use folio::validation::{
    IssueScope, Severity, ValidationConfig, Validator, ValidatorPipeline,
};
use proptest::prelude::*;

fn pipeline() -> ValidatorPipeline {
    ValidatorPipeline::new()
        .with_validator(TrailingWhitespace)
        .with_validator(BlankLineRun)
}

fn words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Validate and fix until nothing changes; returns the text and the round count.
fn fix_to_fixpoint(pipeline: &ValidatorPipeline, text: &str) -> (String, usize) {
    let mut current = text.to_string();
    for round in 0..4 {
        let report = pipeline.validate_section("body", &current);
        let outcome = pipeline.apply_fixes(&current, &report.issues);
        if outcome.applied == 0 {
            return (current, round);
        }
        current = outcome.text;
    }
    (current, 4)
}

#[test]
fn test_fixes_converge_and_keep_words() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let line = "[a-z]{0,6}( [a-z]{1,6}){0,3}[ \t]{0,2}";

    runner
        .run(&prop::collection::vec(line, 1..12), |lines| {
            let pipeline = pipeline();
            let text = lines.join("\n");
            let (fixed, rounds) = fix_to_fixpoint(&pipeline, &text);

            prop_assert!(rounds < 4);
            prop_assert_eq!(words(&fixed), words(&text));
            prop_assert!(!fixed.contains("\n\n\n"));
            prop_assert!(fixed
                .split('\n')
                .all(|l| !l.ends_with(' ') && !l.ends_with('\t')));
            prop_assert!(pipeline.validate_section("body", &fixed).is_empty());
            Ok(())
        })
        .unwrap();
}

/// Sections assembled from a small vocabulary that trips every section rule.
fn noisy_section() -> impl Strategy<Value = String> {
    let token = prop::sample::select(vec![
        "alpha", "beta", "delve", "TODO", "```", "gamma", "as an AI", "",
    ]);
    let separator = prop::sample::select(vec![" ", "\n", "  \n", "\n\n\n", "\t"]);
    prop::collection::vec((token, separator), 0..16).prop_map(|parts| {
        parts
            .into_iter()
            .map(|(token, separator)| format!("{}{}", token, separator))
            .collect()
    })
}

fn noisy_config() -> ValidationConfig {
    ValidationConfig {
        forbidden_phrases: vec!["delve".to_string(), "as an AI".to_string()],
        ..ValidationConfig::default()
    }
}

#[test]
fn test_each_fix_is_idempotent() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let config = noisy_config();
    let validators: Vec<Box<dyn Validator>> = vec![
        Box::new(ForbiddenPhrase::new(&config.forbidden_phrases).unwrap()),
        Box::new(UnbalancedFence),
        Box::new(TrailingWhitespace),
        Box::new(BlankLineRun),
    ];
    let scope = IssueScope::section("body");

    runner
        .run(&noisy_section(), |text| {
            for validator in &validators {
                for issue in validator.validate(&text, &scope) {
                    prop_assert!(issue.auto_fixable);
                    let once = validator.fix(&text, &issue).unwrap();
                    let twice = validator.fix(&once, &issue).unwrap();
                    prop_assert_eq!(once, twice);
                }
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn test_fixing_never_adds_critical_issues() {
    let mut runner = proptest::test_runner::TestRunner::default();
    let pipeline = ValidatorPipeline::from_config(&noisy_config()).unwrap();

    runner
        .run(&noisy_section(), |text| {
            let before = pipeline.validate_section("body", &text);
            let fixed = pipeline.apply_fixes(&text, &before.issues);
            let after = pipeline.validate_section("body", &fixed.text);
            prop_assert!(after.count(Severity::Critical) <= before.count(Severity::Critical));
            Ok(())
        })
        .unwrap();
}
