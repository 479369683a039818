//! Deterministic, pure grading logic.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod check;
pub mod rules;
pub mod score;
pub mod types;
