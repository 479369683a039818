//! Read-only snapshots of learner code, addressed by an unguessable token.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::io::json_store::JsonStore;
use crate::io::random_token;

const TOKEN_LEN: usize = 32;
const ID_LEN: usize = 12;
pub const DEFAULT_TITLE: &str = "My project";

/// A published snapshot. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedProject {
    pub id: String,
    pub share_token: String,
    pub user_id: String,
    #[serde(rename = "courseId")]
    pub lesson_id: String,
    pub title: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ShareDoc {
    projects: Vec<SharedProject>,
}

/// Shared snapshots, optionally persisted as JSON.
#[derive(Debug)]
pub struct ShareLedger {
    store: JsonStore<ShareDoc>,
}

impl ShareLedger {
    pub fn in_memory() -> Self {
        Self {
            store: JsonStore::in_memory(),
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            store: JsonStore::open(path).context("open share store")?,
        })
    }

    /// Snapshot `code` under a fresh token. A blank title falls back to the default.
    pub fn create(
        &self,
        user_id: &str,
        lesson_id: &str,
        code: &str,
        title: Option<&str>,
    ) -> Result<SharedProject> {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_TITLE);
        let project = SharedProject {
            id: random_token(ID_LEN),
            share_token: random_token(TOKEN_LEN),
            user_id: user_id.to_string(),
            lesson_id: lesson_id.to_string(),
            title: title.to_string(),
            code: code.to_string(),
            created_at: Utc::now(),
        };
        self.store
            .update(|doc| doc.projects.push(project.clone()))?;
        info!(user_id, lesson_id, id = %project.id, "project shared");
        Ok(project)
    }

    pub fn get(&self, share_token: &str) -> Result<Option<SharedProject>> {
        self.store.read(|doc| {
            doc.projects
                .iter()
                .find(|p| p.share_token == share_token)
                .cloned()
        })
    }

    /// Projects shared by `user_id`, newest first.
    pub fn list_for(&self, user_id: &str) -> Result<Vec<SharedProject>> {
        let mut projects = self.store.read(|doc| {
            doc.projects
                .iter()
                .filter(|p| p.user_id == user_id)
                .cloned()
                .collect::<Vec<_>>()
        })?;
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }
}
