//! Per-user lesson progress.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::io::json_store::JsonStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    /// Attempted at least once without a valid submission.
    InProgress,
    Completed,
}

/// One user's progress on one lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgress {
    pub user_id: String,
    #[serde(rename = "courseId")]
    pub lesson_id: String,
    pub status: ProgressStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl LessonProgress {
    /// Progress of a lesson the user has never touched.
    pub fn not_started(user_id: &str, lesson_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            lesson_id: lesson_id.to_string(),
            status: ProgressStatus::NotStarted,
            completed_at: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ProgressDoc {
    entries: Vec<LessonProgress>,
}

/// Lesson progress for all users, optionally persisted as JSON.
///
/// Completion is sticky: once a lesson is completed, later failed attempts
/// leave it completed.
#[derive(Debug)]
pub struct ProgressLedger {
    store: JsonStore<ProgressDoc>,
}

impl ProgressLedger {
    pub fn in_memory() -> Self {
        Self {
            store: JsonStore::in_memory(),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            store: JsonStore::open(path).context("open progress ledger")?,
        })
    }

    /// Progress for one lesson; `not_started` when nothing is recorded.
    pub fn get(&self, user_id: &str, lesson_id: &str) -> Result<LessonProgress> {
        self.store.read(|doc| {
            doc.entries
                .iter()
                .find(|p| p.user_id == user_id && p.lesson_id == lesson_id)
                .cloned()
                .unwrap_or_else(|| LessonProgress::not_started(user_id, lesson_id))
        })
    }

    /// All recorded progress for `user_id`, in first-attempt order.
    pub fn list_for(&self, user_id: &str) -> Result<Vec<LessonProgress>> {
        self.store.read(|doc| {
            doc.entries
                .iter()
                .filter(|p| p.user_id == user_id)
                .cloned()
                .collect()
        })
    }

    /// Record a graded attempt: valid completes the lesson, invalid marks it in progress.
    pub fn record_attempt(
        &self,
        user_id: &str,
        lesson_id: &str,
        valid: bool,
    ) -> Result<LessonProgress> {
        let target = if valid {
            ProgressStatus::Completed
        } else {
            ProgressStatus::InProgress
        };
        self.advance(user_id, lesson_id, target)
    }

    /// Mark a lesson completed for `user_id`.
    pub fn mark_completed(&self, user_id: &str, lesson_id: &str) -> Result<LessonProgress> {
        self.advance(user_id, lesson_id, ProgressStatus::Completed)
    }

    fn advance(
        &self,
        user_id: &str,
        lesson_id: &str,
        target: ProgressStatus,
    ) -> Result<LessonProgress> {
        let now = Utc::now();
        let progress = self.store.update(|doc| {
            let index = match doc
                .entries
                .iter()
                .position(|p| p.user_id == user_id && p.lesson_id == lesson_id)
            {
                Some(index) => index,
                None => {
                    doc.entries
                        .push(LessonProgress::not_started(user_id, lesson_id));
                    doc.entries.len() - 1
                }
            };
            let entry = &mut doc.entries[index];
            if entry.status != ProgressStatus::Completed && entry.status != target {
                entry.status = target;
                entry.updated_at = Some(now);
                if target == ProgressStatus::Completed {
                    entry.completed_at = Some(now);
                }
            }
            entry.clone()
        })?;
        if progress.completed_at == Some(now) {
            info!(user_id, lesson_id, "lesson completed");
        }
        Ok(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untouched_lesson_is_not_started() {
        let ledger = ProgressLedger::in_memory();
        let progress = ledger.get("u1", "course-001").expect("get");
        assert_eq!(progress.status, ProgressStatus::NotStarted);
        assert!(ledger.list_for("u1").expect("list").is_empty());

        let value = serde_json::to_value(&progress).expect("json");
        assert_eq!(value["status"], "not_started");
        assert_eq!(value["courseId"], "course-001");
        assert_eq!(value["userId"], "u1");
    }

    #[test]
    fn attempts_advance_and_completion_sticks() {
        let ledger = ProgressLedger::in_memory();

        let failed = ledger
            .record_attempt("u1", "course-002", false)
            .expect("attempt");
        assert_eq!(failed.status, ProgressStatus::InProgress);
        assert_eq!(failed.completed_at, None);

        let passed = ledger
            .record_attempt("u1", "course-002", true)
            .expect("attempt");
        assert_eq!(passed.status, ProgressStatus::Completed);
        let completed_at = passed.completed_at.expect("completion time");

        let later = ledger
            .record_attempt("u1", "course-002", false)
            .expect("attempt");
        assert_eq!(later.status, ProgressStatus::Completed);
        assert_eq!(later.completed_at, Some(completed_at));

        assert_eq!(
            ledger.get("u2", "course-002").expect("get").status,
            ProgressStatus::NotStarted
        );
    }

    #[test]
    fn progress_survives_reopen() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("progress.json");

        let ledger = ProgressLedger::open(&path).expect("open");
        ledger.mark_completed("u1", "course-003").expect("complete");
        ledger.record_attempt("u1", "course-004", false).expect("attempt");
        drop(ledger);

        let reopened = ProgressLedger::open(&path).expect("reopen");
        let statuses: Vec<(String, ProgressStatus)> = reopened
            .list_for("u1")
            .expect("list")
            .into_iter()
            .map(|p| (p.lesson_id, p.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("course-003".to_string(), ProgressStatus::Completed),
                ("course-004".to_string(), ProgressStatus::InProgress),
            ]
        );
    }
}
