//! Achievement catalog and per-user unlock ledger.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::io::json_store::JsonStore;

/// A badge a learner can unlock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default, alias = "badge_color")]
    pub badge_color: String,
}

/// An achievement as unlocked by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlockedAchievement {
    #[serde(flatten)]
    pub achievement: Achievement,
    pub unlocked_at: DateTime<Utc>,
}

/// Result of an unlock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    Unlocked { unlocked_at: DateTime<Utc> },
    /// The user already holds it; the original unlock time is kept.
    AlreadyUnlocked { unlocked_at: DateTime<Utc> },
    /// No achievement with that id exists.
    NotFound,
}

/// Lookup and unlock persistence for achievements.
pub trait AchievementStore: Send + Sync {
    /// All achievements in catalog order.
    fn list(&self) -> Vec<Achievement>;

    fn find_by_name(&self, name: &str) -> Result<Option<Achievement>>;

    fn find_by_id(&self, id: &str) -> Result<Option<Achievement>>;

    /// Record that `user_id` unlocked `achievement_id`. Idempotent.
    fn unlock(&self, user_id: &str, achievement_id: &str) -> Result<UnlockOutcome>;

    /// Achievements unlocked by `user_id`, most recent first.
    fn unlocked_by(&self, user_id: &str) -> Result<Vec<UnlockedAchievement>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct UnlockRecord {
    user_id: String,
    achievement_id: String,
    unlocked_at: DateTime<Utc>,
}

/// Persisted unlocks (`ledger.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Ledger {
    unlocks: Vec<UnlockRecord>,
}

/// Catalog file: `[[achievements]]` entries.
#[derive(Debug, Default, Deserialize)]
struct CatalogDoc {
    #[serde(default)]
    achievements: Vec<Achievement>,
}

/// Catalog plus an unlock ledger, optionally persisted as JSON.
#[derive(Debug)]
pub struct LedgerStore {
    catalog: Vec<Achievement>,
    ledger: JsonStore<Ledger>,
}

impl LedgerStore {
    /// In-memory store over the built-in catalog.
    pub fn in_memory() -> Self {
        Self::with_catalog(builtin_catalog())
    }

    /// In-memory store over `catalog`.
    pub fn with_catalog(catalog: Vec<Achievement>) -> Self {
        Self {
            catalog,
            ledger: JsonStore::in_memory(),
        }
    }

    /// Store over `catalog` persisting unlocks at `path`.
    ///
    /// An existing ledger file is loaded; a missing one starts empty.
    pub fn open(path: &Path, catalog: Vec<Achievement>) -> Result<Self> {
        let ledger = JsonStore::open(path).context("open achievement ledger")?;
        Ok(Self { catalog, ledger })
    }
}

impl AchievementStore for LedgerStore {
    fn list(&self) -> Vec<Achievement> {
        self.catalog.clone()
    }

    fn find_by_name(&self, name: &str) -> Result<Option<Achievement>> {
        Ok(self.catalog.iter().find(|a| a.name == name).cloned())
    }

    fn find_by_id(&self, id: &str) -> Result<Option<Achievement>> {
        Ok(self.catalog.iter().find(|a| a.id == id).cloned())
    }

    fn unlock(&self, user_id: &str, achievement_id: &str) -> Result<UnlockOutcome> {
        if self.find_by_id(achievement_id)?.is_none() {
            return Ok(UnlockOutcome::NotFound);
        }

        let unlocked_at = Utc::now();
        let outcome = self.ledger.update(|ledger| {
            if let Some(existing) = ledger
                .unlocks
                .iter()
                .find(|r| r.user_id == user_id && r.achievement_id == achievement_id)
            {
                return UnlockOutcome::AlreadyUnlocked {
                    unlocked_at: existing.unlocked_at,
                };
            }
            ledger.unlocks.push(UnlockRecord {
                user_id: user_id.to_string(),
                achievement_id: achievement_id.to_string(),
                unlocked_at,
            });
            UnlockOutcome::Unlocked { unlocked_at }
        })?;
        if matches!(outcome, UnlockOutcome::Unlocked { .. }) {
            info!(user_id, achievement_id, "achievement unlocked");
        }
        Ok(outcome)
    }

    fn unlocked_by(&self, user_id: &str) -> Result<Vec<UnlockedAchievement>> {
        let mut unlocked = self.ledger.read(|ledger| {
            ledger
                .unlocks
                .iter()
                .filter(|r| r.user_id == user_id)
                .filter_map(|r| {
                    self.catalog
                        .iter()
                        .find(|a| a.id == r.achievement_id)
                        .map(|achievement| UnlockedAchievement {
                            achievement: achievement.clone(),
                            unlocked_at: r.unlocked_at,
                        })
                })
                .collect::<Vec<_>>()
        })?;
        unlocked.sort_by(|a, b| b.unlocked_at.cmp(&a.unlocked_at));
        Ok(unlocked)
    }
}

/// Load a catalog file (`[[achievements]]` entries) and check it.
///
/// Ids and names must be non-empty and unique.
pub fn load_catalog(path: &Path) -> Result<Vec<Achievement>> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let doc: CatalogDoc =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    validate_catalog(&doc.achievements).map_err(|errors| {
        anyhow!(
            "invalid achievements in {}:\n- {}",
            path.display(),
            errors.join("\n- ")
        )
    })?;
    Ok(doc.achievements)
}

fn validate_catalog(catalog: &[Achievement]) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    let mut ids = HashSet::new();
    let mut names = HashSet::new();
    for achievement in catalog {
        if achievement.id.trim().is_empty() {
            errors.push("achievement id must be non-empty".to_string());
        } else if !ids.insert(achievement.id.as_str()) {
            errors.push(format!("duplicate achievement id '{}'", achievement.id));
        }
        if achievement.name.trim().is_empty() {
            errors.push(format!("achievement '{}' has an empty name", achievement.id));
        } else if !names.insert(achievement.name.as_str()) {
            errors.push(format!("duplicate achievement name '{}'", achievement.name));
        }
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// One badge per built-in lesson; names match the lessons' `achievement` fields.
pub fn builtin_catalog() -> Vec<Achievement> {
    [
        ("ach-001", "First Line of Code", 1, "🎯", "blue"),
        ("ach-002", "Little Calculator", 2, "🔢", "purple"),
        ("ach-003", "Logic Master", 3, "🧠", "green"),
        ("ach-004", "Loop Knight", 4, "🔄", "yellow"),
        ("ach-005", "Function Master", 5, "⚡", "red"),
        ("ach-006", "Data Samurai", 6, "⚔️", "orange"),
        ("ach-007", "String Wizard", 7, "✨", "pink"),
        ("ach-008", "All-round Developer", 8, "👑", "gold"),
    ]
    .into_iter()
    .map(|(id, name, lesson, icon, color)| Achievement {
        id: id.to_string(),
        name: name.to_string(),
        description: format!("Complete lesson {lesson}"),
        icon: icon.to_string(),
        badge_color: color.to_string(),
    })
    .collect()
}
