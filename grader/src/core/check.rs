//! Check vocabulary: pure predicates over source text and captured output.
//!
//! Checks are data, not closures, so a rule table can be loaded from TOML and
//! reviewed without reading code. Evaluation never executes the source again.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A single pass/fail predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Check {
    /// Captured output contains `needle`.
    OutputContains {
        needle: String,
        #[serde(default)]
        case_insensitive: bool,
    },
    /// Captured output is not empty.
    OutputNotEmpty,
    /// Captured output matches a regular expression.
    OutputMatches { pattern: Pattern },
    /// Source text contains `needle`.
    SourceContains { needle: String },
    /// Source text contains at least one of `needles`.
    SourceContainsAny { needles: Vec<String> },
    /// Source text matches a regular expression.
    SourceMatches { pattern: Pattern },
    /// Every nested check passes. Empty is vacuously true.
    All { checks: Vec<Check> },
    /// At least one nested check passes. Empty is false.
    Any { checks: Vec<Check> },
}

impl Check {
    /// Evaluate against raw source text and the captured output text.
    pub fn evaluate(&self, source: &str, output: &str) -> bool {
        match self {
            Check::OutputContains {
                needle,
                case_insensitive: true,
            } => output.to_lowercase().contains(&needle.to_lowercase()),
            Check::OutputContains { needle, .. } => output.contains(needle.as_str()),
            Check::OutputNotEmpty => !output.is_empty(),
            Check::OutputMatches { pattern } => pattern.is_match(output),
            Check::SourceContains { needle } => source.contains(needle.as_str()),
            Check::SourceContainsAny { needles } => {
                needles.iter().any(|needle| source.contains(needle.as_str()))
            }
            Check::SourceMatches { pattern } => pattern.is_match(source),
            Check::All { checks } => checks.iter().all(|check| check.evaluate(source, output)),
            Check::Any { checks } => checks.iter().any(|check| check.evaluate(source, output)),
        }
    }
}

/// Compiled regular expression that (de)serializes as its source string.
///
/// Compilation happens at construction, so an invalid pattern fails when the
/// rule table is loaded rather than while a submission is being scored.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    fn is_match(&self, haystack: &str) -> bool {
        self.0.is_match(haystack)
    }
}

impl TryFrom<String> for Pattern {
    type Error = regex::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Pattern> for String {
    fn from(value: Pattern) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.as_str()).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for Pattern {}
