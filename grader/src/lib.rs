//! Execution and rule-based grading of beginner JavaScript submissions.
//!
//! A submission is run once in an isolated script runtime, its console output is
//! captured into an [`ExecutionTrace`](core::types::ExecutionTrace), and the trace
//! plus the raw source are scored against the lesson's ordered checks. The crate
//! keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (check vocabulary, rule table, scoring).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (child processes, config, and the achievement,
//!   progress, and share ledgers).
//!
//! [`submit`] coordinates the two to implement the Run and Validate operations.

pub mod core;
pub mod io;
pub mod logging;
pub mod submit;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
