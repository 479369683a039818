//! Grader configuration stored in `grader.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::rules::{RuleTable, RuleTableDoc, builtin_table};
use crate::io::achievements::{Achievement, builtin_catalog, load_catalog};
use crate::io::progress::ProgressLedger;
use crate::io::shares::ShareLedger;

/// Grader configuration (TOML).
///
/// Every section is optional. Missing fields default to values suitable for a
/// single-host classroom deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GraderConfig {
    pub runtime: RuntimeConfig,
    pub rules: RulesConfig,
    pub achievements: AchievementsConfig,
    pub progress: ProgressConfig,
    pub shares: SharesConfig,
}

/// Limits and interpreter for the script runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Interpreter command and leading arguments (e.g. `["node"]`).
    pub command: Vec<String>,

    /// Wall-clock budget per submission in milliseconds.
    pub timeout_ms: u64,

    /// V8 old-space heap cap passed as `--max-old-space-size`.
    pub heap_limit_mb: u32,

    /// Captured console output budget per submission.
    pub output_limit_bytes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command: vec!["node".to_string()],
            timeout_ms: 5_000,
            heap_limit_mb: 64,
            output_limit_bytes: 64 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RulesConfig {
    /// TOML rules file replacing the built-in lessons.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AchievementsConfig {
    /// JSON file persisting unlocks. Unlocks live in memory only when unset.
    pub ledger_path: Option<PathBuf>,

    /// TOML catalog (`[[achievements]]` entries) replacing the built-in badges.
    pub catalog_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProgressConfig {
    /// JSON file persisting lesson progress. In memory only when unset.
    pub ledger_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SharesConfig {
    /// JSON file persisting shared snapshots. In memory only when unset.
    pub store_path: Option<PathBuf>,
}

impl GraderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.runtime.command.is_empty() || self.runtime.command[0].trim().is_empty() {
            return Err(anyhow!("runtime.command must be a non-empty array"));
        }
        if self.runtime.timeout_ms == 0 {
            return Err(anyhow!("runtime.timeout_ms must be > 0"));
        }
        if self.runtime.heap_limit_mb == 0 {
            return Err(anyhow!("runtime.heap_limit_mb must be > 0"));
        }
        if self.runtime.output_limit_bytes == 0 {
            return Err(anyhow!("runtime.output_limit_bytes must be > 0"));
        }
        Ok(())
    }

    /// Rule table named by `rules.path`, or the built-in lessons.
    ///
    /// A relative path is resolved against `base_dir` (the config file's directory).
    pub fn load_rule_table(&self, base_dir: &Path) -> Result<RuleTable> {
        match &self.rules.path {
            Some(path) => load_rule_table(&base_dir.join(path)),
            None => Ok(builtin_table()),
        }
    }

    /// Catalog named by `achievements.catalog_path`, or the built-in badges.
    pub fn load_catalog(&self, base_dir: &Path) -> Result<Vec<Achievement>> {
        match &self.achievements.catalog_path {
            Some(path) => load_catalog(&base_dir.join(path)),
            None => Ok(builtin_catalog()),
        }
    }

    pub fn open_progress(&self, base_dir: &Path) -> Result<ProgressLedger> {
        match &self.progress.ledger_path {
            Some(path) => ProgressLedger::open(&base_dir.join(path)),
            None => Ok(ProgressLedger::in_memory()),
        }
    }

    pub fn open_shares(&self, base_dir: &Path) -> Result<ShareLedger> {
        match &self.shares.store_path {
            Some(path) => ShareLedger::open(&base_dir.join(path)),
            None => Ok(ShareLedger::in_memory()),
        }
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `GraderConfig::default()`.
pub fn load_config(path: &Path) -> Result<GraderConfig> {
    if !path.exists() {
        let cfg = GraderConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: GraderConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Load a rules file (`[[lessons]]` entries) and check table invariants.
pub fn load_rule_table(path: &Path) -> Result<RuleTable> {
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let doc: RuleTableDoc =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    RuleTable::new(doc.lessons).map_err(|errors| {
        anyhow!(
            "invalid rules in {}:\n- {}",
            path.display(),
            errors.join("\n- ")
        )
    })
}

/// Write via a sibling temp file and rename, creating parent directories.
pub(crate) fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
