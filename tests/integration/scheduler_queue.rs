//! Integration tests for task pool loading and queue construction

use folio::error::{ApiError, BuildError};
use folio::schedule::{build_queue, QueueBuilder, SchedulerConfig, TaskPool, TaskSpec};
use tempfile::TempDir;

const CURRICULUM: &str = r#"
[[task]]
id = "ownership"
category = "concepts"
complexity = 0.4
prerequisites = ["variables"]

[[task]]
id = "variables"
category = "concepts"
complexity = 0.1

[[task]]
id = "borrowing"
category = "concepts"
complexity = 0.5
prerequisites = ["ownership"]

[[task]]
id = "cargo"
category = "tooling"
difficulty = 0.05

[[task]]
id = "lifetimes"
category = "concepts"
prerequisites = ["borrowing", "ownership"]
target_words = 3000

[[task.sections]]
id = "motivation"
brief = "Why lifetimes exist"

[[task.sections]]
id = "elision"
brief = "Elision rules"
min_words = 400
"#;

fn position(ids: &[String], id: &str) -> usize {
    ids.iter().position(|x| x == id).unwrap()
}

#[test]
fn test_toml_pool_builds_prerequisite_ordered_queue() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("curriculum.toml");
    std::fs::write(&path, CURRICULUM).unwrap();

    let pool = TaskPool::from_path(&path).unwrap();
    assert_eq!(pool.len(), 5);
    let queue = build_queue(&pool.tasks).unwrap();
    let ids = queue.ids();

    assert_eq!(ids.len(), 5);
    assert!(position(&ids, "variables") < position(&ids, "ownership"));
    assert!(position(&ids, "ownership") < position(&ids, "borrowing"));
    assert!(position(&ids, "borrowing") < position(&ids, "lifetimes"));
    // Easiest independent task leads.
    assert_eq!(ids[0], "cargo");

    let lifetimes = &queue.entries()[position(&ids, "lifetimes")];
    let sections = lifetimes.spec.resolved_sections();
    assert_eq!(sections[0].min_words, Some(1500));
    assert_eq!(sections[1].min_words, Some(400));
}

#[test]
fn test_derived_difficulty_never_below_prerequisites() {
    let pool = TaskPool::from_toml_str(CURRICULUM).unwrap();
    let queue = build_queue(&pool.tasks).unwrap();
    for entry in queue.entries() {
        for prerequisite in &entry.spec.prerequisites {
            let prior = &queue.entries()[queue.position_of(prerequisite).unwrap()];
            assert!(
                entry.difficulty >= prior.difficulty,
                "{} ({}) easier than prerequisite {} ({})",
                entry.spec.id,
                entry.difficulty,
                prior.spec.id,
                prior.difficulty
            );
        }
    }
}

#[test]
fn test_json_pool_is_accepted() {
    let pool = TaskPool::from_json_str(
        r#"[{"id": "a", "category": "x"}, {"id": "b", "category": "x", "prerequisites": ["a"]}]"#,
    )
    .unwrap();
    assert_eq!(build_queue(&pool.tasks).unwrap().ids(), vec!["a", "b"]);
}

#[test]
fn test_malformed_pool_is_a_task_pool_error() {
    let err = TaskPool::from_toml_str("[[task]]\nid = 3\n").unwrap_err();
    assert!(matches!(err, ApiError::TaskPool(_)));
}

#[test]
fn test_cycle_fails_the_whole_build() {
    let specs = vec![
        TaskSpec::new("free", "x"),
        TaskSpec::new("a", "x").with_prerequisites(["c"]),
        TaskSpec::new("b", "x").with_prerequisites(["a"]),
        TaskSpec::new("c", "x").with_prerequisites(["b"]),
    ];
    match build_queue(&specs) {
        Err(BuildError::CyclicDependency { cycle }) => {
            assert_eq!(cycle.first(), cycle.last());
            assert_eq!(cycle.len(), 4);
            assert!(!cycle.contains(&"free".to_string()));
        }
        other => panic!("expected a cycle error, got {:?}", other),
    }
}

#[test]
fn test_unknown_prerequisite_names_both_tasks() {
    let specs = vec![TaskSpec::new("a", "x").with_prerequisites(["ghost"])];
    let err = build_queue(&specs).unwrap_err();
    assert_eq!(
        err,
        BuildError::UnknownPrerequisite {
            task: "a".to_string(),
            prerequisite: "ghost".to_string(),
        }
    );
    assert!(err.to_string().contains("ghost"));
}

#[test]
fn test_non_positive_band_orders_by_exact_difficulty() {
    let specs = vec![
        TaskSpec::new("p2", "prose").with_difficulty(0.32),
        TaskSpec::new("t1", "table").with_difficulty(0.31),
        TaskSpec::new("p1", "prose").with_difficulty(0.30),
    ];
    let queue = QueueBuilder::new(SchedulerConfig {
        difficulty_band: 0.0,
    })
    .build(&specs)
    .unwrap();
    assert_eq!(queue.ids(), vec!["p1", "t1", "p2"]);
}

#[test]
fn test_repeated_section_id_fails_the_build() {
    let pool = TaskPool::from_toml_str(
        r#"
[[task]]
id = "intro"
category = "guide"

[[task.sections]]
id = "body"
brief = "first"

[[task.sections]]
id = "body"
brief = "second"
"#,
    )
    .unwrap();
    let err = build_queue(&pool.tasks).unwrap_err();
    assert_eq!(
        err,
        BuildError::DuplicateSection {
            task: "intro".to_string(),
            section: "body".to_string(),
        }
    );
    assert!(err.to_string().contains("more than once"));
}
