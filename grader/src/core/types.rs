//! Shared deterministic types for grading.
//!
//! Traces and results are produced fresh per request and never mutated after
//! they are handed back to the caller.

use serde::{Deserialize, Serialize};

/// Captured result of running one piece of source text once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    /// True iff the script ran to completion without a fault.
    pub succeeded: bool,
    /// Lines written through `console.log`/`info`/`warn`, in emission order.
    pub output_lines: Vec<String>,
    /// Lines written through `console.error`, in emission order.
    pub error_lines: Vec<String>,
    /// Message of the fault that stopped the script, if any.
    pub error_message: Option<String>,
}

impl ExecutionTrace {
    /// Trace of a script that completed normally.
    pub fn completed(output_lines: Vec<String>, error_lines: Vec<String>) -> Self {
        Self {
            succeeded: true,
            output_lines,
            error_lines,
            error_message: None,
        }
    }

    /// Trace of a script that faulted after emitting `output_lines`.
    pub fn faulted(output_lines: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            output_lines,
            error_lines: Vec::new(),
            error_message: Some(message.into()),
        }
    }

    /// Output lines joined by newline.
    pub fn output_text(&self) -> String {
        self.output_lines.join("\n")
    }

    /// Fault message on failure, otherwise the error channel joined by newline.
    pub fn error_text(&self) -> String {
        match &self.error_message {
            Some(message) => message.clone(),
            None => self.error_lines.join("\n"),
        }
    }
}

/// Outcome of one check within a lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub name: String,
    pub passed: bool,
    /// Hint shown to the learner; only present when the check failed.
    pub hint: Option<String>,
}

/// Scored report of one trace against one lesson's checks (no achievement lookup).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scorecard {
    pub lesson_name: Option<String>,
    pub checks: Vec<CheckOutcome>,
    pub passed_count: usize,
    pub total_count: usize,
    pub overall_valid: bool,
    /// Achievement earned by this submission. Only set when `overall_valid`.
    pub achievement_name: Option<String>,
}

/// Full validation report returned to callers of `submit::validate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub overall_valid: bool,
    pub output_text: String,
    pub error_text: String,
    pub lesson_name: Option<String>,
    pub checks: Vec<CheckOutcome>,
    pub passed_count: usize,
    pub total_count: usize,
    pub achievement_id: Option<String>,
    pub achievement_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_text_prefers_fault_message() {
        let trace = ExecutionTrace::faulted(vec!["before".to_string()], "boom");
        assert_eq!(trace.error_text(), "boom");
        assert_eq!(trace.output_text(), "before");
    }

    #[test]
    fn error_text_joins_error_channel_on_success() {
        let trace = ExecutionTrace::completed(
            vec!["a".to_string(), "b".to_string()],
            vec!["e1".to_string(), "e2".to_string()],
        );
        assert_eq!(trace.output_text(), "a\nb");
        assert_eq!(trace.error_text(), "e1\ne2");
    }
}
