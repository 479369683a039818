//! Run and Validate: the two operations exposed to the request layer.
//!
//! Only caller-contract violations surface as errors. Script faults, unknown
//! lessons, and achievement lookup misses are folded into the returned report.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::core::rules::RuleTable;
use crate::core::score::score;
use crate::core::types::{ExecutionTrace, ValidationResult};
use crate::io::achievements::{AchievementStore, LedgerStore};
use crate::io::config::GraderConfig;
use crate::io::runtime::{NodeRuntime, ScriptRuntime};

/// Request rejected before any execution was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
}

/// Scores submissions with a runtime, a rule table, and an achievement store.
///
/// Holds no per-request state; one instance serves concurrent requests.
#[derive(Clone)]
pub struct Grader {
    runtime: Arc<dyn ScriptRuntime>,
    rules: Arc<RuleTable>,
    achievements: Arc<dyn AchievementStore>,
}

impl Grader {
    pub fn new(
        runtime: Arc<dyn ScriptRuntime>,
        rules: RuleTable,
        achievements: Arc<dyn AchievementStore>,
    ) -> Self {
        Self {
            runtime,
            rules: Arc::new(rules),
            achievements,
        }
    }

    /// Wire a grader from config: node runtime, rule table, and unlock ledger.
    ///
    /// Relative paths in `cfg` are resolved against `base_dir`.
    pub fn from_config(cfg: &GraderConfig, base_dir: &Path) -> Result<Self> {
        let runtime = Arc::new(NodeRuntime::new(cfg.runtime.clone()));
        Self::from_config_with_runtime(cfg, base_dir, runtime)
    }

    /// Like [`Grader::from_config`] with a caller-supplied runtime.
    pub fn from_config_with_runtime(
        cfg: &GraderConfig,
        base_dir: &Path,
        runtime: Arc<dyn ScriptRuntime>,
    ) -> Result<Self> {
        let rules = cfg.load_rule_table(base_dir).context("load rule table")?;
        let catalog = cfg
            .load_catalog(base_dir)
            .context("load achievement catalog")?;
        for lesson in rules.lessons() {
            let missing = lesson
                .achievement
                .as_deref()
                .filter(|name| !catalog.iter().any(|a| a.name == *name));
            if let Some(name) = missing {
                warn!(lesson = %lesson.id, achievement = name, "lesson achievement not in catalog");
            }
        }
        let achievements: Arc<dyn AchievementStore> = match &cfg.achievements.ledger_path {
            Some(path) => Arc::new(LedgerStore::open(&base_dir.join(path), catalog)?),
            None => Arc::new(LedgerStore::with_catalog(catalog)),
        };
        Ok(Self::new(runtime, rules, achievements))
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn achievements(&self) -> &dyn AchievementStore {
        self.achievements.as_ref()
    }

    /// Execute `code` without scoring it.
    pub fn run(&self, code: &str) -> Result<ExecutionTrace, SubmissionError> {
        require("code", code)?;
        Ok(self.runtime.execute(code))
    }

    /// Execute `code` once and score it against the rules for `lesson_id`.
    #[instrument(skip(self, code), fields(code_bytes = code.len()))]
    pub fn validate(
        &self,
        code: &str,
        lesson_id: &str,
    ) -> Result<ValidationResult, SubmissionError> {
        require("code", code)?;
        require("lessonId", lesson_id)?;

        let rules = self.rules.get(lesson_id);
        if rules.is_none() {
            debug!("no rules for lesson, checking execution only");
        }

        let trace = self.runtime.execute(code);
        let card = score(rules, code, &trace);

        let achievement = card
            .achievement_name
            .as_deref()
            .and_then(|name| match self.achievements.find_by_name(name) {
                Ok(Some(achievement)) => Some(achievement),
                Ok(None) => {
                    warn!(achievement = name, "achievement not in catalog");
                    None
                }
                Err(err) => {
                    warn!(achievement = name, err = %err, "achievement lookup failed");
                    None
                }
            });

        debug!(
            valid = card.overall_valid,
            passed = card.passed_count,
            total = card.total_count,
            "submission scored"
        );

        Ok(ValidationResult {
            overall_valid: card.overall_valid,
            output_text: trace.output_text(),
            error_text: trace.error_text(),
            lesson_name: card.lesson_name,
            checks: card.checks,
            passed_count: card.passed_count,
            total_count: card.total_count,
            achievement_id: achievement.as_ref().map(|a| a.id.clone()),
            achievement_name: achievement.map(|a| a.name),
        })
    }
}

fn require(field: &'static str, value: &str) -> Result<(), SubmissionError> {
    if value.is_empty() {
        return Err(SubmissionError::MissingField(field));
    }
    Ok(())
}
