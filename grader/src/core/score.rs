//! Scoring of one execution trace against one lesson's rule set.

use crate::core::rules::LessonRuleSet;
use crate::core::types::{CheckOutcome, ExecutionTrace, Scorecard};

/// Evaluate every check of `rules` in order against `source` and the trace output.
///
/// - Missing rules degrade to zero checks: validity is harness success alone.
/// - `overall_valid` requires harness success and every check passing.
/// - The achievement name is only carried on a fully valid result.
pub fn score(rules: Option<&LessonRuleSet>, source: &str, trace: &ExecutionTrace) -> Scorecard {
    let output = trace.output_text();

    let checks: Vec<CheckOutcome> = rules
        .map(|rules| rules.checks.as_slice())
        .unwrap_or_default()
        .iter()
        .map(|definition| {
            let passed = definition.rule.evaluate(source, &output);
            CheckOutcome {
                name: definition.name.clone(),
                passed,
                hint: (!passed).then(|| definition.hint.clone()),
            }
        })
        .collect();

    let passed_count = checks.iter().filter(|check| check.passed).count();
    let total_count = checks.len();
    let overall_valid = trace.succeeded && passed_count == total_count;
    let achievement_name = if overall_valid {
        rules.and_then(|rules| rules.achievement.clone())
    } else {
        None
    };

    Scorecard {
        lesson_name: rules.map(|rules| rules.name.clone()),
        checks,
        passed_count,
        total_count,
        overall_valid,
        achievement_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::builtin_table;

    fn ok(lines: &[&str]) -> ExecutionTrace {
        ExecutionTrace::completed(lines.iter().map(|l| l.to_string()).collect(), Vec::new())
    }

    #[test]
    fn hello_world_passes_first_lesson() {
        let table = builtin_table();
        let card = score(
            table.get("course-001"),
            r#"console.log("Hello World")"#,
            &ok(&["Hello World"]),
        );
        assert!(card.overall_valid);
        assert_eq!((card.passed_count, card.total_count), (1, 1));
        assert_eq!(card.achievement_name.as_deref(), Some("First Line of Code"));
        assert_eq!(card.checks[0].hint, None);
    }

    #[test]
    fn declaration_without_output_fails_second_check() {
        let table = builtin_table();
        let card = score(table.get("course-002"), "let x = 5", &ok(&[]));
        assert!(!card.overall_valid);
        assert_eq!((card.passed_count, card.total_count), (1, 2));
        assert!(card.checks[0].passed);
        assert!(!card.checks[1].passed);
        assert_eq!(
            card.checks[1].hint.as_deref(),
            Some("Print the result of your calculation with console.log()")
        );
        assert_eq!(card.achievement_name, None);
    }

    #[test]
    fn fault_invalidates_even_when_checks_pass() {
        let table = builtin_table();
        let trace = ExecutionTrace::faulted(vec!["hello".to_string()], "boom");
        let card = score(table.get("course-001"), "console.log('hello'); throw 1", &trace);
        assert_eq!(card.passed_count, 1);
        assert!(!card.overall_valid);
        assert_eq!(card.achievement_name, None);
    }

    #[test]
    fn missing_rules_reduce_to_harness_success() {
        let card = score(None, "console.log(1)", &ok(&["1"]));
        assert!(card.overall_valid);
        assert!(card.checks.is_empty());
        assert_eq!(card.lesson_name, None);
        assert_eq!(card.achievement_name, None);

        let failed = score(None, "x(", &ExecutionTrace::faulted(Vec::new(), "syntax"));
        assert!(!failed.overall_valid);
    }
}
