//! Rule table: lesson id -> ordered checks plus the achievement they gate.
//!
//! The table is built once at startup and only read afterwards.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::core::check::Check;

/// A named check with the hint shown when it fails.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckDefinition {
    pub name: String,
    pub hint: String,
    pub rule: Check,
}

/// Rules for one lesson. `checks` order is the report order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonRuleSet {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub checks: Vec<CheckDefinition>,
    #[serde(default)]
    pub achievement: Option<String>,
}

/// On-disk shape of a rules file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleTableDoc {
    #[serde(default)]
    pub lessons: Vec<LessonRuleSet>,
}

/// Immutable lookup from lesson id to its rule set.
#[derive(Debug, Clone)]
pub struct RuleTable {
    lessons: Vec<LessonRuleSet>,
    index: HashMap<String, usize>,
}

impl RuleTable {
    /// Build a table, rejecting it if any invariant is violated.
    pub fn new(lessons: Vec<LessonRuleSet>) -> Result<Self, Vec<String>> {
        let errors = validate_rule_sets(&lessons);
        if !errors.is_empty() {
            return Err(errors);
        }
        let index = lessons
            .iter()
            .enumerate()
            .map(|(pos, lesson)| (lesson.id.clone(), pos))
            .collect();
        Ok(Self { lessons, index })
    }

    pub fn get(&self, lesson_id: &str) -> Option<&LessonRuleSet> {
        self.index.get(lesson_id).map(|&pos| &self.lessons[pos])
    }

    /// Lessons in declaration order.
    pub fn lessons(&self) -> &[LessonRuleSet] {
        &self.lessons
    }

    pub fn len(&self) -> usize {
        self.lessons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lessons.is_empty()
    }
}

/// Check table invariants:
/// - lesson ids and names are non-empty
/// - lesson ids are unique
/// - check names are non-empty and unique within a lesson
pub fn validate_rule_sets(lessons: &[LessonRuleSet]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for (pos, lesson) in lessons.iter().enumerate() {
        if lesson.id.trim().is_empty() {
            errors.push(format!("lessons[{pos}]: id must be non-empty"));
        } else if !seen.insert(lesson.id.as_str()) {
            errors.push(format!("duplicate lesson id '{}'", lesson.id));
        }
        if lesson.name.trim().is_empty() {
            errors.push(format!("{}: name must be non-empty", lesson.id));
        }
        if matches!(&lesson.achievement, Some(name) if name.trim().is_empty()) {
            errors.push(format!("{}: achievement must be non-empty when set", lesson.id));
        }

        let mut check_names = HashSet::new();
        for (check_pos, check) in lesson.checks.iter().enumerate() {
            if check.name.trim().is_empty() {
                errors.push(format!(
                    "{}: checks[{check_pos}] name must be non-empty",
                    lesson.id
                ));
            } else if !check_names.insert(check.name.as_str()) {
                errors.push(format!(
                    "{}: duplicate check name '{}'",
                    lesson.id, check.name
                ));
            }
        }
    }

    errors
}

/// The eight beginner lessons shipped with the platform.
pub fn builtin_rule_sets() -> Vec<LessonRuleSet> {
    vec![
        lesson(
            "course-001",
            "Hello, JavaScript",
            "First Line of Code",
            vec![definition(
                "Prints hello",
                "Use console.log(\"Hello World\") to print some text",
                Check::OutputContains {
                    needle: "hello".to_string(),
                    case_insensitive: true,
                },
            )],
        ),
        lesson(
            "course-002",
            "Working with Numbers",
            "Little Calculator",
            vec![
                definition(
                    "Declares a variable",
                    "Declare a variable with let name = value",
                    any_in_source(&["let ", "const ", "var "]),
                ),
                definition(
                    "Produces output",
                    "Print the result of your calculation with console.log()",
                    Check::OutputNotEmpty,
                ),
            ],
        ),
        lesson(
            "course-003",
            "Making Decisions",
            "Logic Master",
            vec![definition(
                "Uses an if statement",
                "Write a condition with if (condition) { }",
                Check::All {
                    checks: vec![
                        Check::SourceContains {
                            needle: "if".to_string(),
                        },
                        any_in_source(&["{", "else"]),
                    ],
                },
            )],
        ),
        lesson(
            "course-004",
            "The Power of Repetition",
            "Loop Knight",
            vec![definition(
                "Uses a loop",
                "Repeat code with a for or while loop",
                any_in_source(&["for", "while"]),
            )],
        ),
        lesson(
            "course-005",
            "The Magic of Functions",
            "Function Master",
            vec![definition(
                "Defines a function",
                "Define a function with function name() { } or an arrow function",
                any_in_source(&["function ", "=>"]),
            )],
        ),
        lesson(
            "course-006",
            "Lists and Collections",
            "Data Samurai",
            vec![definition(
                "Creates an array",
                "Create an array with [item1, item2]",
                Check::All {
                    checks: vec![
                        Check::SourceContains {
                            needle: "[".to_string(),
                        },
                        Check::SourceContains {
                            needle: "]".to_string(),
                        },
                    ],
                },
            )],
        ),
        lesson(
            "course-007",
            "String Tricks",
            "String Wizard",
            vec![definition(
                "Uses a string",
                "Create a string and print it",
                Check::All {
                    checks: vec![any_in_source(&["\"", "'", "`"]), Check::OutputNotEmpty],
                },
            )],
        ),
        lesson(
            "course-008",
            "Capstone Project",
            "All-round Developer",
            vec![
                definition(
                    "Uses a function",
                    "Create at least one function",
                    any_in_source(&["function ", "=>"]),
                ),
                definition(
                    "Has output",
                    "Make sure your code prints something",
                    Check::OutputNotEmpty,
                ),
            ],
        ),
    ]
}

/// Built-in table. The built-in rule sets always satisfy the table invariants.
pub fn builtin_table() -> RuleTable {
    let lessons = builtin_rule_sets();
    let index = lessons
        .iter()
        .enumerate()
        .map(|(pos, lesson)| (lesson.id.clone(), pos))
        .collect();
    RuleTable { lessons, index }
}

fn lesson(id: &str, name: &str, achievement: &str, checks: Vec<CheckDefinition>) -> LessonRuleSet {
    LessonRuleSet {
        id: id.to_string(),
        name: name.to_string(),
        checks,
        achievement: Some(achievement.to_string()),
    }
}

fn definition(name: &str, hint: &str, rule: Check) -> CheckDefinition {
    CheckDefinition {
        name: name.to_string(),
        hint: hint.to_string(),
        rule,
    }
}

fn any_in_source(needles: &[&str]) -> Check {
    Check::SourceContainsAny {
        needles: needles.iter().map(|needle| needle.to_string()).collect(),
    }
}
