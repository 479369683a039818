//! End-to-end grading scenarios driven through `Grader::validate`.
//!
//! A scripted runtime stands in for the interpreter so these run without node;
//! `tests/node_runtime.rs` covers the real runtime.

use std::sync::Arc;

use grader::core::rules::{LessonRuleSet, RuleTable, builtin_table};
use grader::core::types::ExecutionTrace;
use grader::io::achievements::LedgerStore;
use grader::submit::Grader;
use grader::test_support::{ScriptedRuntime, faulted, printed};

fn grader_with(trace: ExecutionTrace) -> Grader {
    Grader::new(
        Arc::new(ScriptedRuntime::always(trace)),
        builtin_table(),
        Arc::new(LedgerStore::in_memory()),
    )
}

/// Hello world on the first lesson passes its only check and earns the badge.
#[test]
fn hello_world_unlocks_first_badge() {
    let result = grader_with(printed(&["Hello World"]))
        .validate(r#"console.log("Hello World")"#, "course-001")
        .expect("validate");

    assert!(result.overall_valid);
    assert_eq!((result.passed_count, result.total_count), (1, 1));
    assert_eq!(result.output_text, "Hello World");
    assert_eq!(result.achievement_name.as_deref(), Some("First Line of Code"));
    assert_eq!(result.achievement_id.as_deref(), Some("ach-001"));
}

/// A declaration with no output passes the first check and fails the second.
#[test]
fn declaration_without_output_gets_hint() {
    let result = grader_with(printed(&[]))
        .validate("let x = 5", "course-002")
        .expect("validate");

    assert!(!result.overall_valid);
    assert_eq!((result.passed_count, result.total_count), (1, 2));
    let names: Vec<&str> = result.checks.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Declares a variable", "Produces output"]);
    assert_eq!(result.checks[0].hint, None);
    assert!(result.checks[1].hint.is_some());
    assert_eq!(result.achievement_name, None);
    assert_eq!(result.achievement_id, None);
}

/// A thrown error invalidates the submission whatever the checks say.
#[test]
fn thrown_error_is_never_valid() {
    for lesson in builtin_table().lessons() {
        let result = grader_with(faulted(&[], "boom"))
            .validate(r#"throw new Error("boom")"#, &lesson.id)
            .expect("validate");
        assert!(!result.overall_valid, "lesson {}", lesson.id);
        assert!(result.error_text.contains("boom"));
        assert_eq!(result.achievement_name, None);
    }
}

/// Unknown lessons fall back to "did it run".
#[test]
fn unknown_lesson_checks_execution_only() {
    let result = grader_with(printed(&["ok"]))
        .validate("console.log('ok')", "course-404")
        .expect("validate");
    assert!(result.overall_valid);
    assert!(result.checks.is_empty());
    assert_eq!(result.lesson_name, None);
    assert_eq!(result.achievement_name, None);

    let failed = grader_with(faulted(&[], "Unexpected token"))
        .validate("console.log(", "course-404")
        .expect("validate");
    assert!(!failed.overall_valid);
    assert_eq!(failed.error_text, "Unexpected token");
}

/// A lesson configured with zero checks behaves like an unknown one.
#[test]
fn zero_check_lesson_tracks_harness_success() {
    let rules = RuleTable::new(vec![LessonRuleSet {
        id: "free".to_string(),
        name: "Free play".to_string(),
        checks: Vec::new(),
        achievement: Some("First Line of Code".to_string()),
    }])
    .expect("rules");

    for (trace, expected) in [(printed(&[]), true), (faulted(&[], "x"), false)] {
        let grader = Grader::new(
            Arc::new(ScriptedRuntime::always(trace)),
            rules.clone(),
            Arc::new(LedgerStore::in_memory()),
        );
        let result = grader.validate("1", "free").expect("validate");
        assert_eq!(result.overall_valid, expected);
        assert_eq!(result.achievement_name.is_some(), expected);
    }
}

/// Same input, same report: nothing carries over between validations.
#[test]
fn validation_is_repeatable() {
    let grader = grader_with(printed(&["Hi", "there"]));
    let code = "const greet = () => 'Hi'; console.log(greet()); console.log('there')";
    let first = grader.validate(code, "course-008").expect("first");
    let second = grader.validate(code, "course-008").expect("second");
    assert_eq!(first, second);
}

/// Pass counts never exceed the number of checks, and validity means all passed.
#[test]
fn pass_count_is_bounded_by_checks() {
    let sources = [
        "let a = [1, 2]",
        "function f() { for (;;) {} }",
        "if (x) { console.log(\"a\") } else { while (y) {} }",
    ];
    let traces = [printed(&[]), printed(&["hello"]), faulted(&["hello"], "late")];

    for lesson in builtin_table().lessons() {
        for source in sources {
            for trace in &traces {
                let result = grader_with(trace.clone())
                    .validate(source, &lesson.id)
                    .expect("validate");
                assert!(result.passed_count <= result.total_count);
                assert_eq!(
                    result.overall_valid,
                    trace.succeeded && result.passed_count == result.total_count
                );
            }
        }
    }
}

/// Attempts are graded independently: a fixed resubmission earns the badge.
#[test]
fn resubmission_after_fault_is_graded_fresh() {
    let runtime = Arc::new(ScriptedRuntime::new(vec![
        faulted(&["Hello"], "greet is not defined"),
        printed(&["Hello World"]),
    ]));
    let grader = Grader::new(
        runtime.clone(),
        builtin_table(),
        Arc::new(LedgerStore::in_memory()),
    );

    let first = grader
        .validate("console.log('Hello'); greet()", "course-001")
        .expect("first attempt");
    assert!(!first.overall_valid);
    assert_eq!(first.error_text, "greet is not defined");
    assert_eq!(first.achievement_id, None);

    let second = grader
        .validate("console.log('Hello World')", "course-001")
        .expect("second attempt");
    assert!(second.overall_valid);
    assert_eq!(second.achievement_id.as_deref(), Some("ach-001"));

    // The queue is spent; further runs are contained faults.
    let third = grader.run("console.log(1)").expect("run");
    assert!(!third.succeeded);
    assert_eq!(runtime.calls(), 3);
}
